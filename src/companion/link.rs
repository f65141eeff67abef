//! Companion link worker: drives [`CompanionState`] over a [`SerialLink`].
//!
//! One call to [`CompanionLink::tick`] performs at most one write or one
//! read.  The `channel_busy` flag is the only state shared with other
//! threads; the modem path clears it through a [`CompanionHandle`] once the
//! relayed message has been sent.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, info, warn};

use super::protocol::{CompanionState, LinkAction, LinkOutcome};
use crate::app::ports::{ChannelRelease, EventPublisher, SerialLink};
use crate::drivers::ticker::PeriodicTicker;
use crate::events::{EventKind, MessageBuffer, SystemEvent};

/// Scratch space for one poll.  Larger than the message slot so an
/// oversize response is recognised as such instead of truncated.
const RX_SCRATCH_LEN: usize = 128;

/// Upper bound on extra reads spent flushing the tail of an oversize frame.
const MAX_DRAIN_READS: usize = 32;

pub struct CompanionLink<S> {
    serial: S,
    state: CompanionState,
    channel_busy: Arc<AtomicBool>,
    slot: MessageBuffer,
    rx: [u8; RX_SCRATCH_LEN],
}

impl<S: SerialLink> CompanionLink<S> {
    pub fn new(serial: S, retry_budget: u8) -> Self {
        Self {
            serial,
            state: CompanionState::new(retry_budget),
            channel_busy: Arc::new(AtomicBool::new(false)),
            slot: MessageBuffer::new(),
            rx: [0; RX_SCRATCH_LEN],
        }
    }

    /// Handle for clearing the busy flag from another thread.
    pub fn handle(&self) -> CompanionHandle {
        CompanionHandle {
            channel_busy: Arc::clone(&self.channel_busy),
        }
    }

    pub fn state(&self) -> CompanionState {
        self.state
    }

    /// Last message received (valid until the next reception).
    pub fn slot(&self) -> &MessageBuffer {
        &self.slot
    }

    pub fn serial(&self) -> &S {
        &self.serial
    }

    pub fn tick(&mut self, events: &mut impl EventPublisher) {
        let busy = self.channel_busy.load(Ordering::Acquire);

        let received = match self.state.action(busy) {
            LinkAction::Send(command) => {
                debug!("companion: tx 0x{:02X}", command);
                if let Err(e) = self.serial.write(&[command]) {
                    warn!("companion: {}", e);
                }
                0
            }
            LinkAction::Poll => self.poll(),
            LinkAction::Nothing => return,
        };

        let response = &self.rx[..received];
        if received > 0 {
            debug!("companion: rx {} bytes", received);
        }

        let (next, outcome) = self.state.advance(response);
        self.state = next;

        match outcome {
            None => {}
            Some(LinkOutcome::Detected) => {
                info!("companion: detected");
                events.publish(EventKind::CompanionOk.into());
            }
            Some(LinkOutcome::NotDetected) => {
                warn!("companion: no answer to SCAN, giving up");
                events.publish(EventKind::CompanionNotDetected.into());
            }
            Some(LinkOutcome::Message) => {
                self.slot.store(&response[1..]);
                self.channel_busy.store(true, Ordering::Release);
                info!("companion: message {:?}", self.slot.as_str());
                events.publish(SystemEvent::message_ready(self.slot));
            }
        }
    }

    /// Read one response.  A read that fills the scratch buffer means the
    /// frame is oversize: whatever is still buffered belongs to it and is
    /// flushed here, so the tail never shows up as the next response.
    fn poll(&mut self) -> usize {
        let received = match self.serial.read_available(&mut self.rx) {
            Ok(n) => n,
            Err(e) => {
                warn!("companion: {}", e);
                return 0;
            }
        };
        if received == RX_SCRATCH_LEN {
            let mut sink = [0u8; RX_SCRATCH_LEN];
            let mut discarded = 0usize;
            for _ in 0..MAX_DRAIN_READS {
                match self.serial.read_available(&mut sink) {
                    Ok(0) => break,
                    Ok(n) => discarded += n,
                    Err(e) => {
                        warn!("companion: {}", e);
                        break;
                    }
                }
            }
            warn!(
                "companion: oversize frame ({}+ bytes) dropped",
                received + discarded
            );
        }
        received
    }

    /// Worker loop.
    pub fn run(mut self, mut events: impl EventPublisher, period: Duration) -> ! {
        let mut ticker = PeriodicTicker::new(period);
        loop {
            self.tick(&mut events);
            ticker.wait();
        }
    }
}

/// Shared view of the link's busy flag.
#[derive(Debug, Clone)]
pub struct CompanionHandle {
    channel_busy: Arc<AtomicBool>,
}

impl CompanionHandle {
    /// Allow the companion to deliver the next message.
    pub fn free_channel(&self) {
        self.channel_busy.store(false, Ordering::Release);
    }

    pub fn is_busy(&self) -> bool {
        self.channel_busy.load(Ordering::Acquire)
    }
}

impl ChannelRelease for CompanionHandle {
    fn free_channel(&self) {
        CompanionHandle::free_channel(self);
    }
}
