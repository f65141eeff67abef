//! Plain-text AT driver for a SIM800-class GSM modem.
//!
//! Every exchange is "write one command line, accumulate the reply until the
//! expected token shows up".  A literal `ERROR` in the reply ends the wait
//! early with [`ModemError::Timeout`], which the lifecycle treats the same
//! as silence.
//!
//! | Process     | Exchange                                                  |
//! |-------------|-----------------------------------------------------------|
//! | start       | `AT` → `OK`, up to [`START_ATTEMPTS`] tries               |
//! | configure   | `ATE0` → `OK`, `AT+CMGF=1` → `OK`, poll `AT+CREG?`        |
//! | send        | `AT+CMGS="<number>"` → `>`, text + Ctrl-Z → `+CMGS`       |

use std::time::{Duration, Instant};

use heapless::{String, Vec};
use log::{debug, info, warn};

use crate::app::ports::{ModemDriver, SerialLink};
use crate::config::{GatewayConfig, RECIPIENT_CAPACITY};
use crate::error::ModemError;
use crate::events::MESSAGE_CAPACITY;

pub const START_ATTEMPTS: u32 = 3;

/// Terminates the SMS body.
const CTRL_Z: u8 = 0x1A;

const REPLY_CAPACITY: usize = 128;
/// Bytes kept from the tail when the reply buffer overflows, enough to hold
/// any token split across the overflow point.
const REPLY_TAIL_KEEP: usize = 16;

/// Reads of stale output allowed before a command goes out regardless.
const DRAIN_LIMIT_READS: usize = 16;

/// Wait budgets for each kind of exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtTimeouts {
    /// Per command reply.
    pub response: Duration,
    /// Whole network-registration poll.
    pub registration: Duration,
    /// From Ctrl-Z to `+CMGS`.
    pub send: Duration,
    /// Sleep between receive polls.
    pub poll_interval: Duration,
}

impl AtTimeouts {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            response: Duration::from_millis(u64::from(config.modem_response_timeout_ms)),
            registration: Duration::from_millis(u64::from(config.modem_registration_timeout_ms)),
            send: Duration::from_millis(u64::from(config.modem_send_timeout_ms)),
            poll_interval: Duration::from_millis(10),
        }
    }
}

pub struct GsmModem<S> {
    serial: S,
    timeouts: AtTimeouts,
    recipient: String<RECIPIENT_CAPACITY>,
    message: String<{ MESSAGE_CAPACITY - 1 }>,
    reply: Vec<u8, REPLY_CAPACITY>,
}

impl<S: SerialLink> GsmModem<S> {
    pub fn new(serial: S, recipient: String<RECIPIENT_CAPACITY>, timeouts: AtTimeouts) -> Self {
        Self {
            serial,
            timeouts,
            recipient,
            message: String::new(),
            reply: Vec::new(),
        }
    }

    pub fn serial(&self) -> &S {
        &self.serial
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    fn write_line(&mut self, parts: &[&[u8]]) -> Result<(), ModemError> {
        self.drain_stale()?;
        for part in parts {
            self.serial.write(part)?;
        }
        self.serial.write(b"\r")?;
        Ok(())
    }

    /// Drop unsolicited output left over from earlier exchanges.  Bounded, so
    /// a modem that never stops talking cannot hold the command back.
    fn drain_stale(&mut self) -> Result<(), ModemError> {
        let mut chunk = [0u8; 32];
        for _ in 0..DRAIN_LIMIT_READS {
            if self.serial.read_available(&mut chunk)? == 0 {
                return Ok(());
            }
        }
        debug!("modem: line still busy after draining, sending anyway");
        Ok(())
    }

    fn absorb(&mut self, bytes: &[u8]) {
        for &b in bytes {
            if self.reply.is_full() {
                let keep_from = self.reply.len() - REPLY_TAIL_KEEP;
                self.reply.copy_within(keep_from.., 0);
                self.reply.truncate(REPLY_TAIL_KEEP);
            }
            // Capacity was just ensured.
            let _ = self.reply.push(b);
        }
    }

    /// Accumulate the reply until `token` appears or `timeout` elapses.
    fn expect(&mut self, token: &[u8], timeout: Duration) -> Result<(), ModemError> {
        self.reply.clear();
        let deadline = Instant::now() + timeout;
        let mut chunk = [0u8; 32];
        loop {
            let n = self.serial.read_available(&mut chunk)?;
            self.absorb(&chunk[..n]);

            if contains(&self.reply, token) {
                return Ok(());
            }
            if contains(&self.reply, b"ERROR") {
                debug!("modem: ERROR while waiting for {:?}", printable(token));
                return Err(ModemError::Timeout);
            }
            if Instant::now() >= deadline {
                debug!("modem: timed out waiting for {:?}", printable(token));
                return Err(ModemError::Timeout);
            }
            std::thread::sleep(self.timeouts.poll_interval);
        }
    }

    fn command(&mut self, line: &[u8], token: &[u8]) -> Result<(), ModemError> {
        debug!("modem: > {}", printable(line));
        self.write_line(&[line])?;
        self.expect(token, self.timeouts.response)
    }

    fn wait_for_registration(&mut self) -> Result<(), ModemError> {
        let deadline = Instant::now() + self.timeouts.registration;
        loop {
            self.command(b"AT+CREG?", b"OK")?;
            if is_registered(&self.reply) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                warn!("modem: not registered on the network");
                return Err(ModemError::Timeout);
            }
            std::thread::sleep(self.timeouts.response);
        }
    }
}

impl<S: SerialLink> ModemDriver for GsmModem<S> {
    fn start_process(&mut self) -> Result<(), ModemError> {
        for attempt in 1..=START_ATTEMPTS {
            match self.command(b"AT", b"OK") {
                Ok(()) => {
                    info!("modem: answered AT (attempt {})", attempt);
                    return Ok(());
                }
                Err(ModemError::Timeout) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(ModemError::Timeout)
    }

    fn configure_process(&mut self) -> Result<(), ModemError> {
        self.command(b"ATE0", b"OK")?;
        self.command(b"AT+CMGF=1", b"OK")?;
        self.wait_for_registration()?;
        info!("modem: registered on the network");
        Ok(())
    }

    fn set_message(&mut self, text: &str) {
        self.message.clear();
        for c in text.chars() {
            if self.message.push(c).is_err() {
                break;
            }
        }
    }

    fn send_sms(&mut self) -> Result<(), ModemError> {
        let recipient = self.recipient.clone();
        debug!("modem: > AT+CMGS=\"{}\"", recipient);
        self.write_line(&[
            b"AT+CMGS=\"".as_slice(),
            recipient.as_bytes(),
            b"\"".as_slice(),
        ])?;
        self.expect(b">", self.timeouts.response)?;

        let message = self.message.clone();
        self.serial.write(message.as_bytes())?;
        self.serial.write(&[CTRL_Z])?;
        self.expect(b"+CMGS", self.timeouts.send)?;
        info!("modem: SMS delivered to {}", recipient);
        Ok(())
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

/// `+CREG: <n>,<stat>` with stat 1 (home) or 5 (roaming).
fn is_registered(reply: &[u8]) -> bool {
    let Some(start) = reply.windows(6).position(|w| w == b"+CREG:") else {
        return false;
    };
    let rest = &reply[start..];
    let Some(comma) = rest.iter().position(|&b| b == b',') else {
        return false;
    };
    matches!(rest.get(comma + 1), Some(&b'1') | Some(&b'5'))
}

fn printable(bytes: &[u8]) -> &str {
    core::str::from_utf8(bytes).unwrap_or("<binary>")
}
