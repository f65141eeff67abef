//! Worker wiring.
//!
//! Each `start_*` function builds one subsystem, spawns its worker thread
//! and returns a cheap, cloneable handle the dispatcher uses to reach it.
//! The `spawn_*` variants take a worker built by the caller, so its handle
//! can be handed to the dispatcher before the worker thread exists.
//!
//! ```text
//!             ┌──────────────┐  events  ┌────────────┐
//!  UART1 ────▶│ companion    │─────────▶│            │──▶ IndicatorHandle ──▶ LEDs
//!             └──────────────┘          │ dispatcher │
//!             ┌──────────────┐  events  │            │──▶ ModemHandle (queue)
//!  UART2 ────▶│ modem        │─────────▶│            │──▶ CompanionHandle (free)
//!             └──────────────┘          └────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use embedded_hal::digital::OutputPin;
use log::{debug, info};

use crate::app::dispatcher::{DispatchTimings, EventDispatcher};
use crate::app::ports::{ChannelRelease, IndicatorControl, ModemDriver, OutboundQueue, SerialLink};
use crate::companion::{CompanionHandle, CompanionLink};
use crate::config::GatewayConfig;
use crate::drivers::task_pin::{WorkerSpec, spawn_worker};
use crate::drivers::ticker::PeriodicTicker;
use crate::events::{EventChannel, EventReceiver, EventSender};
use crate::indicators::{
    IndicatorBank, IndicatorChannel, IndicatorDescriptor, IndicatorMode, IndicatorTable,
};
use crate::modem::{Modem, ModemHandle};

/// Worker priorities on the target, highest first.
pub mod priority {
    pub const DISPATCHER: u8 = 5;
    pub const COMPANION: u8 = 4;
    pub const MODEM: u8 = 4;
    pub const INDICATORS: u8 = 3;
}

fn millis(ms: u32) -> Duration {
    Duration::from_millis(u64::from(ms))
}

// ── Companion link ───────────────────────────────────────────

pub fn start_companion_link<S>(
    link: S,
    events: &'static EventChannel,
    priority: u8,
    config: &GatewayConfig,
) -> CompanionHandle
where
    S: SerialLink + Send + 'static,
{
    let worker = CompanionLink::new(link, config.companion_retry_budget);
    let handle = worker.handle();
    spawn_companion_link(worker, events, priority, config);
    handle
}

pub fn spawn_companion_link<S>(
    worker: CompanionLink<S>,
    events: &'static EventChannel,
    priority: u8,
    config: &GatewayConfig,
) where
    S: SerialLink + Send + 'static,
{
    let period = millis(config.companion_tick_ms);
    spawn_worker(WorkerSpec::new("companion\0", priority), move || {
        worker.run(EventSender::new(events), period)
    });
}

// ── Modem ────────────────────────────────────────────────────

pub fn start_modem<D>(
    driver: D,
    events: &'static EventChannel,
    priority: u8,
    config: &GatewayConfig,
) -> ModemHandle
where
    D: ModemDriver + Send + 'static,
{
    let worker = Modem::new(driver);
    let handle = worker.handle();
    spawn_modem(worker, events, priority, config);
    handle
}

pub fn spawn_modem<D>(
    worker: Modem<D>,
    events: &'static EventChannel,
    priority: u8,
    config: &GatewayConfig,
) where
    D: ModemDriver + Send + 'static,
{
    let delay = millis(config.modem_startup_delay_ms);
    let period = millis(config.modem_tick_ms);
    spawn_worker(WorkerSpec::new("modem\0", priority).with_stack_kb(6), move || {
        worker.run(EventSender::new(events), delay, period)
    });
}

// ── Indicators ───────────────────────────────────────────────

/// Shared handle to the indicator table.
pub struct IndicatorHandle<P> {
    bank: Arc<IndicatorBank<P>>,
}

impl<P> Clone for IndicatorHandle<P> {
    fn clone(&self) -> Self {
        Self {
            bank: Arc::clone(&self.bank),
        }
    }
}

impl<P: OutputPin> IndicatorHandle<P> {
    pub fn new(activity: P, link: P, config: &GatewayConfig) -> Self {
        let table = IndicatorTable::new(activity, link);
        Self {
            bank: Arc::new(IndicatorBank::new(
                table,
                millis(config.indicator_lock_timeout_ms),
            )),
        }
    }

    pub fn descriptor(&self, channel: IndicatorChannel) -> IndicatorDescriptor {
        self.bank.descriptor(channel)
    }

    pub fn inspect<R>(&self, f: impl FnOnce(&IndicatorTable<P>) -> R) -> R {
        self.bank.inspect(f)
    }

    /// Worker loop: one refresh per `period`.
    pub fn run(self, period: Duration) -> ! {
        let mut ticker = PeriodicTicker::new(period);
        let mut skipped: u32 = 0;
        loop {
            if !self.bank.refresh() {
                skipped = skipped.wrapping_add(1);
                debug!("indicators: lock busy, tick skipped ({} total)", skipped);
            }
            ticker.wait();
        }
    }
}

impl<P: OutputPin> IndicatorControl for IndicatorHandle<P> {
    fn set_mode(
        &self,
        mode: IndicatorMode,
        period_ticks: u32,
        channel: IndicatorChannel,
        burst_flashes: u32,
    ) {
        self.bank.set_mode(mode, period_ticks, channel, burst_flashes);
    }
}

pub fn start_indicators<P>(
    activity: P,
    link: P,
    priority: u8,
    config: &GatewayConfig,
) -> IndicatorHandle<P>
where
    P: OutputPin + Send + 'static,
{
    let handle = IndicatorHandle::new(activity, link, config);
    spawn_indicators(handle.clone(), priority, config);
    handle
}

/// Spawn the refresh worker for an existing handle.
pub fn spawn_indicators<P>(worker: IndicatorHandle<P>, priority: u8, config: &GatewayConfig)
where
    P: OutputPin + Send + 'static,
{
    let period = millis(config.indicator_tick_ms);
    spawn_worker(WorkerSpec::new("indicators\0", priority), move || {
        worker.run(period)
    });
}

/// Boot pattern: both channels blink at the boot period ("starting up" on
/// Activity, "searching for network" on Link).
pub fn boot_indicators(indicators: &impl IndicatorControl, config: &GatewayConfig) {
    for channel in IndicatorChannel::ALL {
        indicators.set_mode(IndicatorMode::Blink, config.boot_blink_period, channel, 0);
    }
}

// ── Dispatcher ───────────────────────────────────────────────

pub fn start_dispatcher<I, Q, C>(
    events: &'static EventChannel,
    indicators: I,
    modem: Q,
    companion: C,
    priority: u8,
    config: &GatewayConfig,
) where
    I: IndicatorControl + Send + 'static,
    Q: OutboundQueue + Send + 'static,
    C: ChannelRelease + Send + 'static,
{
    let dispatcher = EventDispatcher::new(
        indicators,
        modem,
        companion,
        DispatchTimings::from_config(config),
    );
    spawn_worker(WorkerSpec::new("dispatcher\0", priority), move || {
        dispatcher.run(EventReceiver::new(events))
    });
    info!("gateway: dispatcher running");
}
