//! Modem lifecycle worker.
//!
//! ```text
//!   Init ──OK──▶ Configuring ──OK──▶ Ready
//!    │                │                │ queue_message
//!    │ TIMEOUT        │ TIMEOUT        ▼
//!    └──────────────▶ Stopped ◀──── Sending
//!                       │  ▲    OK / TIMEOUT
//!                       └──┘ queue_message
//! ```
//!
//! The worker owns the driver and calls it with the state lock released, so
//! [`ModemHandle::queue_message`] never waits on a slow AT exchange.  The
//! queue operation is the only transition made from outside the loop; the
//! loop commits its own transition only if the state is still the one it
//! started the tick with.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::app::ports::{EventPublisher, ModemDriver, OutboundQueue};
use crate::drivers::ticker::PeriodicTicker;
use crate::error::QueueError;
use crate::events::{EventKind, MessageBuffer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModemState {
    Init,
    Configuring,
    /// Registered on the network; idle until a message is queued.
    Ready,
    /// Idle after a failure or a completed send.
    Stopped,
    Sending,
}

/// Driver process a state runs on its tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModemProcess {
    Start,
    Configure,
    SendSms,
}

impl ModemState {
    pub fn process(self) -> Option<ModemProcess> {
        match self {
            Self::Init => Some(ModemProcess::Start),
            Self::Configuring => Some(ModemProcess::Configure),
            Self::Sending => Some(ModemProcess::SendSms),
            Self::Ready | Self::Stopped => None,
        }
    }

    /// Next state and the event to publish once this state's process
    /// finished with `ok`.
    pub fn complete(self, ok: bool) -> (Self, Option<EventKind>) {
        match (self, ok) {
            (Self::Init, true) => (Self::Configuring, None),
            (Self::Init, false) => (Self::Stopped, Some(EventKind::ModemNotDetected)),
            (Self::Configuring, true) => (Self::Ready, Some(EventKind::ModemInitOk)),
            (Self::Configuring, false) => (Self::Stopped, Some(EventKind::ModemConfigureFail)),
            (Self::Sending, true) => (Self::Stopped, Some(EventKind::ModemSendOk)),
            (Self::Sending, false) => (Self::Stopped, Some(EventKind::ModemSendFail)),
            (idle, _) => (idle, None),
        }
    }
}

#[derive(Debug)]
struct ModemShared {
    state: ModemState,
    pending: Option<MessageBuffer>,
}

pub struct Modem<D> {
    driver: D,
    shared: Arc<Mutex<ModemShared>>,
}

impl<D: ModemDriver> Modem<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            shared: Arc::new(Mutex::new(ModemShared {
                state: ModemState::Init,
                pending: None,
            })),
        }
    }

    pub fn handle(&self) -> ModemHandle {
        ModemHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn state(&self) -> ModemState {
        self.shared.lock().state
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn tick(&mut self, events: &mut impl EventPublisher) {
        let (state, pending) = {
            let mut shared = self.shared.lock();
            let pending = match shared.state {
                ModemState::Sending => shared.pending.take(),
                _ => None,
            };
            (shared.state, pending)
        };

        let Some(process) = state.process() else {
            return;
        };

        let result = match process {
            ModemProcess::Start => self.driver.start_process(),
            ModemProcess::Configure => self.driver.configure_process(),
            ModemProcess::SendSms => {
                if let Some(message) = pending {
                    self.driver.set_message(message.as_str());
                }
                self.driver.send_sms()
            }
        };
        if let Err(e) = result {
            warn!("modem: {:?} failed: {}", process, e);
        }

        let (next, event) = state.complete(result.is_ok());
        {
            let mut shared = self.shared.lock();
            if shared.state == state {
                shared.state = next;
                if next != state {
                    info!("modem: {:?} -> {:?}", state, next);
                }
            } else {
                debug!(
                    "modem: state moved to {:?} during {:?}, keeping it",
                    shared.state, process
                );
            }
        }

        if let Some(kind) = event {
            events.publish(kind.into());
        }
    }

    /// Worker loop: quiescent `startup_delay`, then one tick per `period`.
    pub fn run(
        mut self,
        mut events: impl EventPublisher,
        startup_delay: Duration,
        period: Duration,
    ) -> ! {
        std::thread::sleep(startup_delay);
        let mut ticker = PeriodicTicker::new(period);
        loop {
            self.tick(&mut events);
            ticker.wait();
        }
    }
}

/// Cross-thread access to the modem state.
#[derive(Debug, Clone)]
pub struct ModemHandle {
    shared: Arc<Mutex<ModemShared>>,
}

impl ModemHandle {
    /// Hand `message` to the modem and force the `Sending` state.
    ///
    /// Accepted from every state except `Sending`; a rejected call changes
    /// nothing.
    pub fn queue_message(&self, message: &MessageBuffer) -> Result<(), QueueError> {
        let mut shared = self.shared.lock();
        if shared.state == ModemState::Sending {
            return Err(QueueError::Busy);
        }
        debug!("modem: queued {:?} from {:?}", message.as_str(), shared.state);
        shared.pending = Some(*message);
        shared.state = ModemState::Sending;
        Ok(())
    }

    pub fn state(&self) -> ModemState {
        self.shared.lock().state
    }
}

impl OutboundQueue for ModemHandle {
    fn queue_message(&self, message: &MessageBuffer) -> Result<(), QueueError> {
        ModemHandle::queue_message(self, message)
    }
}
