//! GPIO / peripheral pin assignments for the gateway board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  Baud rates are runtime settings and live in
//! [`GatewayConfig`](crate::config::GatewayConfig).

// ---------------------------------------------------------------------------
// Status indicators (discrete LEDs, active HIGH)
// ---------------------------------------------------------------------------

/// Activity LED: boot progress, latched errors, 1 Hz "all healthy" blink.
pub const ACTIVITY_LED_GPIO: i32 = 13;
/// Link LED: GSM registration state and SMS-sent bursts.
pub const LINK_LED_GPIO: i32 = 12;

// ---------------------------------------------------------------------------
// Companion MCU link (UART1, 8N1, no flow control)
// ---------------------------------------------------------------------------

pub const COMPANION_UART_TX_GPIO: i32 = 4;
pub const COMPANION_UART_RX_GPIO: i32 = 5;

// ---------------------------------------------------------------------------
// GSM modem (UART2)
// ---------------------------------------------------------------------------

pub const MODEM_UART_TX_GPIO: i32 = 17;
pub const MODEM_UART_RX_GPIO: i32 = 16;
