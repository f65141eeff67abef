//! Companion MCU polling protocol: command bytes and the per-tick state machine.
//!
//! The gateway is the master of a half-duplex link; the companion only ever
//! answers the last command byte.
//!
//! ```text
//!   Master (gateway)            Slave (companion MCU)
//!
//!   SCAN 0xE0  ───────▶                           ready to receive, channel free
//!              ◀───────  0xE0                     present, nothing to send
//!   SCAN 0xE0  ───────▶
//!              ◀───────  status + text payload    outbound message
//!   BUSY 0xE1  ───────▶                           previous message still in flight
//!              ◀───────  0xE0 / 0xE2              status only (no data / data pending)
//! ```
//!
//! Payloads are raw text after a leading status byte.  There is no
//! delimiter and no CRC: both MCUs sit on the same board.
//!
//! [`CompanionState::action`] says what I/O the current state performs this
//! tick; [`CompanionState::advance`] is the pure transition given what was
//! read.

use crate::events::MESSAGE_CAPACITY;

/// "Ready to receive, channel free."
pub const SCAN_COMMAND: u8 = 0xE0;
/// "Channel occupied, do not send new data."
pub const BUSY_COMMAND: u8 = 0xE1;

/// Responses at least this long are discarded (they cannot fit the message
/// slot together with its NUL terminator).
pub const RESPONSE_CAPACITY: usize = MESSAGE_CAPACITY;

/// Link state.  The retry budget and flow direction live inside the
/// variants that use them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanionState {
    /// Nothing sent yet.
    Init { retry_budget: u8 },
    /// First SCAN sent; waiting for the bare SCAN echo.
    AwaitingAck { retries_left: u8 },
    /// Companion detected.  Alternates one outbound tick (command byte) with
    /// one inbound tick (read response).
    Idle { outbound: bool },
    /// Companion never answered.  Terminal: no further I/O.
    Error,
}

/// I/O the current state needs this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAction {
    /// Write one command byte.
    Send(u8),
    /// Read whatever the companion sent.
    Poll,
    /// No I/O.
    Nothing,
}

/// Observable result of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// First SCAN acknowledged.
    Detected,
    /// Retry budget exhausted.
    NotDetected,
    /// A payload arrived; the text is `response[1..]`.
    Message,
}

impl CompanionState {
    pub const fn new(retry_budget: u8) -> Self {
        Self::Init { retry_budget }
    }

    pub fn action(self, channel_busy: bool) -> LinkAction {
        match self {
            Self::Init { .. } => LinkAction::Send(SCAN_COMMAND),
            Self::AwaitingAck { .. } | Self::Idle { outbound: false } => LinkAction::Poll,
            Self::Idle { outbound: true } => {
                if channel_busy {
                    LinkAction::Send(BUSY_COMMAND)
                } else {
                    LinkAction::Send(SCAN_COMMAND)
                }
            }
            Self::Error => LinkAction::Nothing,
        }
    }

    /// Transition after this tick's I/O.  `response` is what a
    /// [`LinkAction::Poll`] read (empty for the other actions).
    pub fn advance(self, response: &[u8]) -> (Self, Option<LinkOutcome>) {
        match self {
            Self::Init { retry_budget } => (
                Self::AwaitingAck {
                    retries_left: retry_budget,
                },
                None,
            ),

            Self::AwaitingAck { retries_left } => {
                if response == [SCAN_COMMAND] {
                    return (Self::Idle { outbound: true }, Some(LinkOutcome::Detected));
                }
                match retries_left.saturating_sub(1) {
                    0 => (Self::Error, Some(LinkOutcome::NotDetected)),
                    left => (Self::AwaitingAck { retries_left: left }, None),
                }
            }

            Self::Idle { outbound: true } => (Self::Idle { outbound: false }, None),

            Self::Idle { outbound: false } => {
                let outcome = is_payload(response).then_some(LinkOutcome::Message);
                (Self::Idle { outbound: true }, outcome)
            }

            Self::Error => (Self::Error, None),
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Error
    }
}

/// A status byte followed by at least one text byte, short enough for the slot.
fn is_payload(response: &[u8]) -> bool {
    response.len() > 1 && response.len() < RESPONSE_CAPACITY
}
