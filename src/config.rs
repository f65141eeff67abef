//! System configuration parameters
//!
//! All tunable timing, retry and indicator parameters for the gateway.
//! Defaults reproduce the production board; a JSON document can override
//! them at build time (see `main.rs`).

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Maximum length of the SMS recipient number (E.164 plus `+`).
pub const RECIPIENT_CAPACITY: usize = 20;

/// Core gateway configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    // --- Companion link ---
    /// Companion protocol tick (milliseconds).
    pub companion_tick_ms: u32,
    /// Unanswered SCAN polls tolerated before the companion is declared absent.
    pub companion_retry_budget: u8,
    /// Companion UART baud rate.
    pub companion_baud: u32,

    // --- Modem ---
    /// Modem UART baud rate.
    pub modem_baud: u32,
    /// Modem lifecycle tick (milliseconds).
    pub modem_tick_ms: u32,
    /// Quiet period after power-up before the first modem tick (milliseconds).
    pub modem_startup_delay_ms: u32,
    /// Per-command AT response timeout (milliseconds).
    pub modem_response_timeout_ms: u32,
    /// Network registration timeout during configuration (milliseconds).
    pub modem_registration_timeout_ms: u32,
    /// `+CMGS` confirmation timeout for an SMS send (milliseconds).
    pub modem_send_timeout_ms: u32,
    /// Destination number for outbound messages.
    pub sms_recipient: String<RECIPIENT_CAPACITY>,

    // --- Indicators ---
    /// Indicator refresh tick (milliseconds).
    pub indicator_tick_ms: u32,
    /// Bounded wait for the indicator lock in the refresh worker (milliseconds).
    pub indicator_lock_timeout_ms: u32,
    /// Blink period while booting, in indicator ticks.
    pub boot_blink_period: u32,
    /// Activity blink period once both peripherals are healthy, in indicator ticks.
    pub healthy_blink_period: u32,
    /// Link burst period after an SMS was sent, in indicator ticks.
    pub sms_burst_period: u32,
    /// Number of visible flashes in the SMS-sent burst.
    pub sms_burst_flashes: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let mut sms_recipient = String::new();
        // Fits: literal is shorter than RECIPIENT_CAPACITY.
        let _ = sms_recipient.push_str("+10000000000");

        Self {
            // Companion link
            companion_tick_ms: 100,
            companion_retry_budget: 10,
            companion_baud: 115_200,

            // Modem
            modem_baud: 115_200,
            modem_tick_ms: 200,
            modem_startup_delay_ms: 2_000,
            modem_response_timeout_ms: 1_000,
            modem_registration_timeout_ms: 30_000,
            modem_send_timeout_ms: 60_000,
            sms_recipient,

            // Indicators
            indicator_tick_ms: 100,
            indicator_lock_timeout_ms: 10,
            boot_blink_period: 5,     // 500 ms
            healthy_blink_period: 10, // 1 Hz
            sms_burst_period: 3,      // 300 ms
            sms_burst_flashes: 5,
        }
    }
}

impl GatewayConfig {
    /// Parse a JSON document (missing fields take their defaults) and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|_| ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Build-time override if present and valid, defaults otherwise.
    pub fn load(override_json: Option<&str>) -> Self {
        let Some(json) = override_json else {
            return Self::default();
        };
        match Self::from_json(json) {
            Ok(config) => {
                log::info!("Config: build-time override applied");
                config
            }
            Err(e) => {
                log::warn!("Config: override rejected ({}), using defaults", e);
                Self::default()
            }
        }
    }

    /// Reject values that would stall a worker or break the indicator timing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.companion_tick_ms == 0 {
            return Err(ConfigError::Invalid("companion_tick_ms must be > 0"));
        }
        if self.companion_retry_budget == 0 {
            return Err(ConfigError::Invalid("companion_retry_budget must be > 0"));
        }
        if self.companion_baud == 0 {
            return Err(ConfigError::Invalid("companion_baud must be > 0"));
        }
        if self.modem_baud == 0 {
            return Err(ConfigError::Invalid("modem_baud must be > 0"));
        }
        if self.modem_tick_ms == 0 {
            return Err(ConfigError::Invalid("modem_tick_ms must be > 0"));
        }
        if self.modem_response_timeout_ms == 0 {
            return Err(ConfigError::Invalid("modem_response_timeout_ms must be > 0"));
        }
        if self.sms_recipient.is_empty() {
            return Err(ConfigError::Invalid("sms_recipient must not be empty"));
        }
        if self.indicator_tick_ms == 0 {
            return Err(ConfigError::Invalid("indicator_tick_ms must be > 0"));
        }
        if self.indicator_lock_timeout_ms >= self.indicator_tick_ms {
            return Err(ConfigError::Invalid(
                "indicator_lock_timeout_ms must be shorter than indicator_tick_ms",
            ));
        }
        if self.boot_blink_period == 0
            || self.healthy_blink_period == 0
            || self.sms_burst_period == 0
        {
            return Err(ConfigError::Invalid("blink periods must be > 0"));
        }
        Ok(())
    }
}
