//! Port traits: the boundary between the control fabric and the outside world.
//!
//! ```text
//!   UART / GPIO / modem ──▶ Port trait ──▶ workers + dispatcher
//! ```
//!
//! Driven adapters (serial transports, the modem driver, event channel)
//! implement these traits and the workers consume them via generics, so the
//! state machines never touch hardware directly.  The last three traits are
//! the operations the dispatcher calls on the other subsystems; the worker
//! handles in [`gateway`](crate::gateway) implement them.

use crate::error::{LinkError, ModemError, QueueError};
use crate::events::{MessageBuffer, SystemEvent};
use crate::indicators::{IndicatorChannel, IndicatorMode};

// ───────────────────────────────────────────────────────────────
// Event publisher (worker → dispatcher)
// ───────────────────────────────────────────────────────────────

/// Where device workers publish their outcome events.
pub trait EventPublisher {
    fn publish(&mut self, event: SystemEvent);
}

// ───────────────────────────────────────────────────────────────
// Serial byte transport
// ───────────────────────────────────────────────────────────────

/// Byte-oriented serial transport (UART).
pub trait SerialLink {
    /// Queue `bytes` for transmission.
    fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError>;

    /// Copy whatever the receiver has buffered into `buf` without waiting.
    /// Returns the number of bytes copied (0 when nothing arrived).
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, LinkError>;
}

// ───────────────────────────────────────────────────────────────
// Modem driver
// ───────────────────────────────────────────────────────────────

/// Blocking modem driver.  Each process resolves to `Ok` or a timeout-class
/// error under the driver's own timeout policy.
pub trait ModemDriver {
    /// Detect the modem.
    fn start_process(&mut self) -> Result<(), ModemError>;

    /// Configure the modem and wait for network registration.
    fn configure_process(&mut self) -> Result<(), ModemError>;

    /// Set the text for the next [`send_sms`](Self::send_sms).
    fn set_message(&mut self, text: &str);

    /// Send the text set by [`set_message`](Self::set_message).
    fn send_sms(&mut self) -> Result<(), ModemError>;
}

// ───────────────────────────────────────────────────────────────
// Dispatcher-facing operations
// ───────────────────────────────────────────────────────────────

/// Indicator mode setter.  May block until the indicator lock is free.
pub trait IndicatorControl {
    fn set_mode(
        &self,
        mode: IndicatorMode,
        period_ticks: u32,
        channel: IndicatorChannel,
        burst_flashes: u32,
    );
}

/// Hand an outbound message to the modem.
pub trait OutboundQueue {
    /// Fails with [`QueueError::Busy`] while a send is in progress.
    fn queue_message(&self, message: &MessageBuffer) -> Result<(), QueueError>;
}

/// Release the companion link's message slot for a new message.
pub trait ChannelRelease {
    fn free_channel(&self);
}
