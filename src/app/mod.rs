//! Application core: the event dispatcher and the port traits it drives.
//!
//! The dispatcher correlates outcome events from the two device workers,
//! drives the indicators and forwards outbound messages.  All interaction
//! with the rest of the system happens through the traits in [`ports`],
//! keeping this layer testable without threads or hardware.

pub mod dispatcher;
pub mod ports;
