//! Half-duplex polling link to the companion microcontroller.

pub mod link;
pub mod protocol;

pub use link::{CompanionHandle, CompanionLink};
pub use protocol::{BUSY_COMMAND, CompanionState, SCAN_COMMAND};
