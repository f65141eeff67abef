//! Error types for the gateway firmware.
//!
//! Every variant is `Copy` so errors travel through the worker loops and the
//! dispatcher without allocation.  None of them is fatal: the loops log the
//! error and degrade (no data, idle state, indicator latch) instead of
//! restarting the device.

use core::fmt;

// ---------------------------------------------------------------------------
// Serial transport
// ---------------------------------------------------------------------------

/// A byte-transport operation failed at the driver level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// The UART driver rejected a write.
    WriteFailed,
    /// The UART driver rejected a read.
    ReadFailed,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WriteFailed => write!(f, "serial write failed"),
            Self::ReadFailed => write!(f, "serial read failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Modem driver
// ---------------------------------------------------------------------------

/// Outcome of a failed modem driver process.
///
/// The lifecycle state machine treats every variant as the TIMEOUT branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModemError {
    /// The modem did not produce the expected response in time (or answered
    /// `ERROR`).
    Timeout,
    /// The serial link to the modem failed.
    Link(LinkError),
}

impl fmt::Display for ModemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "modem timeout"),
            Self::Link(e) => write!(f, "modem link: {e}"),
        }
    }
}

impl From<LinkError> for ModemError {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

// ---------------------------------------------------------------------------
// Outbound queue
// ---------------------------------------------------------------------------

/// Rejection from [`queue_message`](crate::modem::ModemHandle::queue_message).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// A send is already in progress; nothing was changed.
    Busy,
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => write!(f, "modem busy sending"),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The JSON document could not be parsed into a config.
    Parse,
    /// A field failed range validation.  The message names the field.
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse => write!(f, "config parse failed"),
            Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}
