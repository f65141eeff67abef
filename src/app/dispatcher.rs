//! Event dispatcher: the single consumer of the event channel.
//!
//! | Event                  | Reaction                                          |
//! |------------------------|---------------------------------------------------|
//! | `ModemInitOk`          | health + 1, Link on                               |
//! | `ModemConfigureFail`   | Activity on (latched error), Link off             |
//! | `ModemNotDetected`     | Activity on (latched error), Link off             |
//! | `CompanionNotDetected` | Activity on (latched error)                       |
//! | `CompanionOk`          | health + 1                                        |
//! | `CompanionMessageReady`| forward payload to the modem                      |
//! | `ModemSendOk`          | Link flash burst, free companion channel          |
//! | `ModemSendFail`        | free companion channel                            |
//!
//! After every event, a health count of 2 (modem and companion both up)
//! switches Activity to the slow "all good" blink.

use log::{info, warn};

use super::ports::{ChannelRelease, IndicatorControl, OutboundQueue};
use crate::config::GatewayConfig;
use crate::events::{EventKind, EventReceiver, SystemEvent};
use crate::indicators::{IndicatorChannel, IndicatorMode};

/// Number of peripherals that must report healthy.
pub const HEALTHY_DEVICES: u32 = 2;

/// Indicator timings the dispatcher applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchTimings {
    pub healthy_blink_period: u32,
    pub sms_burst_period: u32,
    pub sms_burst_flashes: u32,
}

impl DispatchTimings {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            healthy_blink_period: config.healthy_blink_period,
            sms_burst_period: config.sms_burst_period,
            sms_burst_flashes: config.sms_burst_flashes,
        }
    }
}

impl Default for DispatchTimings {
    fn default() -> Self {
        Self::from_config(&GatewayConfig::default())
    }
}

pub struct EventDispatcher<I, Q, C> {
    indicators: I,
    modem: Q,
    companion: C,
    timings: DispatchTimings,
    health: u32,
}

impl<I, Q, C> EventDispatcher<I, Q, C>
where
    I: IndicatorControl,
    Q: OutboundQueue,
    C: ChannelRelease,
{
    pub fn new(indicators: I, modem: Q, companion: C, timings: DispatchTimings) -> Self {
        Self {
            indicators,
            modem,
            companion,
            timings,
            health: 0,
        }
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn indicators(&self) -> &I {
        &self.indicators
    }

    pub fn handle(&mut self, event: SystemEvent) {
        info!("dispatch: {:?}", event.kind);

        match event.kind {
            EventKind::ModemInitOk => {
                self.health = self.health.saturating_add(1);
                self.set(IndicatorMode::On, 0, IndicatorChannel::Link, 0);
            }
            EventKind::ModemConfigureFail | EventKind::ModemNotDetected => {
                self.set(IndicatorMode::On, 0, IndicatorChannel::Activity, 0);
                self.set(IndicatorMode::Off, 0, IndicatorChannel::Link, 0);
            }
            EventKind::CompanionNotDetected => {
                self.set(IndicatorMode::On, 0, IndicatorChannel::Activity, 0);
            }
            EventKind::CompanionOk => {
                self.health = self.health.saturating_add(1);
            }
            EventKind::CompanionMessageReady => match event.payload {
                Some(message) => {
                    if let Err(e) = self.modem.queue_message(&message) {
                        warn!("dispatch: message {:?} not queued: {}", message.as_str(), e);
                    }
                }
                None => warn!("dispatch: message event without payload"),
            },
            EventKind::ModemSendOk => {
                self.set(
                    IndicatorMode::Blink,
                    self.timings.sms_burst_period,
                    IndicatorChannel::Link,
                    self.timings.sms_burst_flashes,
                );
                self.companion.free_channel();
            }
            EventKind::ModemSendFail => {
                self.companion.free_channel();
            }
        }

        if self.health == HEALTHY_DEVICES {
            self.set(
                IndicatorMode::Blink,
                self.timings.healthy_blink_period,
                IndicatorChannel::Activity,
                0,
            );
        }
    }

    /// Dispatch forever.
    pub fn run(mut self, receiver: EventReceiver<'_>) -> ! {
        loop {
            let event = receiver.receive();
            self.handle(event);
        }
    }

    fn set(&self, mode: IndicatorMode, period: u32, channel: IndicatorChannel, burst: u32) {
        self.indicators.set_mode(mode, period, channel, burst);
    }
}
