//! GSM modem: lifecycle worker and the AT-command driver it runs.

pub mod at_driver;
pub mod lifecycle;

pub use at_driver::{AtTimeouts, GsmModem};
pub use lifecycle::{Modem, ModemHandle, ModemState};
