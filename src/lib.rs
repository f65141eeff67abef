//! GSM alert gateway firmware library.
//!
//! Exposes the control fabric (dispatcher, device workers, indicator engine)
//! for host testing.  All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod companion;
pub mod config;
pub mod drivers;
pub mod error;
pub mod events;
pub mod gateway;
pub mod indicators;
pub mod modem;
pub mod pins;

mod esp_link_shims;
