//! Mock hardware for integration tests.
//!
//! Every mock shares its state through an `Arc` so a test keeps a view of
//! the device while the worker thread owns it.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};

use embedded_hal::digital::{ErrorType, OutputPin, PinState};
use parking_lot::Mutex;

use gsm_gateway::app::ports::{ModemDriver, SerialLink};
use gsm_gateway::companion::{BUSY_COMMAND, SCAN_COMMAND};
use gsm_gateway::config::GatewayConfig;
use gsm_gateway::error::{LinkError, ModemError};
use gsm_gateway::events::EventChannel;

/// Status byte the companion puts in front of a pending message.
pub const STATUS_DATA: u8 = 0xE2;

// ── Output pin ────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockPin {
    writes: Arc<Mutex<Vec<PinState>>>,
}

#[allow(dead_code)]
impl MockPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> Vec<PinState> {
        self.writes.lock().clone()
    }

    pub fn level(&self) -> Option<PinState> {
        self.writes.lock().last().copied()
    }
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.writes.lock().push(PinState::Low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.writes.lock().push(PinState::High);
        Ok(())
    }
}

// ── Companion MCU ─────────────────────────────────────────────

#[derive(Default)]
pub struct CompanionSim {
    pub present: bool,
    pub outbox: VecDeque<Vec<u8>>,
    pub commands: Vec<u8>,
    reply: Option<Vec<u8>>,
}

/// Serial end of a simulated companion: answers each command byte on the
/// next read.
#[derive(Clone, Default)]
pub struct MockCompanion {
    sim: Arc<Mutex<CompanionSim>>,
}

#[allow(dead_code)]
impl MockCompanion {
    pub fn present() -> Self {
        let mock = Self::default();
        mock.sim.lock().present = true;
        mock
    }

    pub fn absent() -> Self {
        Self::default()
    }

    pub fn offer(&self, text: &str) {
        self.sim.lock().outbox.push_back(text.as_bytes().to_vec());
    }

    pub fn commands(&self) -> Vec<u8> {
        self.sim.lock().commands.clone()
    }

    pub fn outbox_len(&self) -> usize {
        self.sim.lock().outbox.len()
    }
}

impl SerialLink for MockCompanion {
    fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        let mut sim = self.sim.lock();
        for &command in bytes {
            sim.commands.push(command);
            if !sim.present {
                continue;
            }
            let reply = match command {
                SCAN_COMMAND => match sim.outbox.pop_front() {
                    Some(text) => {
                        let mut frame = vec![STATUS_DATA];
                        frame.extend_from_slice(&text);
                        frame
                    }
                    None => vec![SCAN_COMMAND],
                },
                BUSY_COMMAND if sim.outbox.is_empty() => vec![SCAN_COMMAND],
                BUSY_COMMAND => vec![STATUS_DATA],
                _ => continue,
            };
            sim.reply = Some(reply);
        }
        Ok(())
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        let Some(reply) = self.sim.lock().reply.take() else {
            return Ok(0);
        };
        let n = reply.len().min(buf.len());
        buf[..n].copy_from_slice(&reply[..n]);
        Ok(n)
    }
}

// ── Modem driver ──────────────────────────────────────────────

pub struct ModemSim {
    pub start: Result<(), ModemError>,
    pub configure: Result<(), ModemError>,
    pub send: Result<(), ModemError>,
    pub send_delay: Duration,
    pub message: String,
    pub sent: Vec<String>,
}

impl Default for ModemSim {
    fn default() -> Self {
        Self {
            start: Ok(()),
            configure: Ok(()),
            send: Ok(()),
            send_delay: Duration::ZERO,
            message: String::new(),
            sent: Vec::new(),
        }
    }
}

#[derive(Clone, Default)]
pub struct MockModem {
    sim: Arc<Mutex<ModemSim>>,
}

#[allow(dead_code)]
impl MockModem {
    pub fn healthy() -> Self {
        Self::default()
    }

    pub fn configure(&self, f: impl FnOnce(&mut ModemSim)) {
        f(&mut self.sim.lock());
    }

    pub fn sent(&self) -> Vec<String> {
        self.sim.lock().sent.clone()
    }
}

impl ModemDriver for MockModem {
    fn start_process(&mut self) -> Result<(), ModemError> {
        self.sim.lock().start
    }

    fn configure_process(&mut self) -> Result<(), ModemError> {
        self.sim.lock().configure
    }

    fn set_message(&mut self, text: &str) {
        self.sim.lock().message = text.to_owned();
    }

    fn send_sms(&mut self) -> Result<(), ModemError> {
        let delay = self.sim.lock().send_delay;
        std::thread::sleep(delay);
        let mut sim = self.sim.lock();
        let result = sim.send;
        if result.is_ok() {
            let message = sim.message.clone();
            sim.sent.push(message);
        }
        result
    }
}

// ── Harness helpers ───────────────────────────────────────────

/// Event channels must outlive the worker threads.
pub fn leak_channel() -> &'static EventChannel {
    Box::leak(Box::new(EventChannel::new()))
}

/// Millisecond ticks so a full bring-up finishes well inside a second.  The
/// modem keeps a short startup delay so, as on the board, the boot pattern
/// is on before its first event.
pub fn fast_config() -> GatewayConfig {
    GatewayConfig {
        companion_tick_ms: 5,
        modem_tick_ms: 5,
        modem_startup_delay_ms: 50,
        indicator_tick_ms: 5,
        indicator_lock_timeout_ms: 1,
        ..GatewayConfig::default()
    }
}

/// Poll `cond` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    cond()
}
