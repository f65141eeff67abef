//! Two-channel status indicator engine.
//!
//! Each channel (Activity, Link) is driven by a small mode machine that the
//! indicator worker refreshes every tick:
//!
//! | Mode  | Output each tick                                              |
//! |-------|---------------------------------------------------------------|
//! | Blink | toggles every `period_ticks`; optional burst of N flashes     |
//! | On    | forced HIGH                                                   |
//! | Off   | forced LOW                                                    |
//!
//! A *burst* temporarily overrides the mode for a fixed number of flashes
//! and then restores the mode that was active before it.
//!
//! ## Locking
//!
//! [`IndicatorBank`] wraps the descriptor table and both output pins in one
//! mutex.  [`IndicatorBank::set_mode`] waits for the lock as long as it
//! takes; [`IndicatorBank::refresh`] gives up after a short bounded wait and
//! the tick is simply lost.

use core::time::Duration;

use embedded_hal::digital::{OutputPin, PinState};
use log::{debug, warn};
use parking_lot::Mutex;

/// Display mode of one indicator channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorMode {
    /// Toggle at `period_ticks`.
    Blink,
    /// Continuously lit.
    On,
    /// Continuously dark.
    Off,
}

/// Physical indicator channels, refreshed in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum IndicatorChannel {
    Activity = 0,
    Link = 1,
}

impl IndicatorChannel {
    pub const COUNT: usize = 2;
    pub const ALL: [Self; Self::COUNT] = [Self::Activity, Self::Link];

    const fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// Descriptor (one per channel)
// ---------------------------------------------------------------------------

/// Timing state of one channel.
///
/// `countdown_ticks` stays within `0..=period_ticks`.  `remaining_blink_events`
/// counts level toggles left in a burst (two per visible flash); when it
/// drops to zero the mode reverts to `saved_mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorDescriptor {
    pub mode: IndicatorMode,
    pub period_ticks: u32,
    /// Level driven on the next toggle (`true` = HIGH).
    pub level_toggle: bool,
    pub countdown_ticks: u32,
    pub remaining_blink_events: u32,
    pub saved_mode: IndicatorMode,
}

impl IndicatorDescriptor {
    /// A dark channel with the given idle period.
    pub const fn new(period_ticks: u32) -> Self {
        Self {
            mode: IndicatorMode::Off,
            period_ticks,
            level_toggle: true,
            countdown_ticks: period_ticks,
            remaining_blink_events: 0,
            saved_mode: IndicatorMode::Off,
        }
    }

    /// Apply a mode request.
    ///
    /// A non-zero `burst_flashes` first remembers the current mode so it can
    /// be restored, then *adds* two toggles per flash to the outstanding
    /// count; overlapping bursts accumulate.
    pub fn apply(&mut self, mode: IndicatorMode, period_ticks: u32, burst_flashes: u32) {
        if burst_flashes != 0 {
            self.saved_mode = self.mode;
        }
        self.mode = mode;
        self.period_ticks = period_ticks;
        self.countdown_ticks = period_ticks;
        self.remaining_blink_events = self
            .remaining_blink_events
            .saturating_add(burst_flashes.saturating_mul(2));
    }

    /// Advance one tick.  Returns the level to drive, or `None` when the
    /// output should be left alone this tick.
    pub fn refresh(&mut self) -> Option<PinState> {
        match self.mode {
            IndicatorMode::Blink => self.blink_tick(),
            IndicatorMode::On => Some(PinState::High),
            IndicatorMode::Off => Some(PinState::Low),
        }
    }

    fn blink_tick(&mut self) -> Option<PinState> {
        if self.countdown_ticks == 0 {
            return None;
        }
        self.countdown_ticks -= 1;
        if self.countdown_ticks != 0 {
            return None;
        }

        let level = PinState::from(self.level_toggle);
        self.level_toggle = !self.level_toggle;
        self.countdown_ticks = self.period_ticks;

        if self.remaining_blink_events != 0 {
            self.remaining_blink_events -= 1;
            if self.remaining_blink_events == 0 {
                self.mode = self.saved_mode;
            }
        }
        Some(level)
    }
}

// ---------------------------------------------------------------------------
// Table: descriptors + pins
// ---------------------------------------------------------------------------

/// Both channels with the output lines they drive.
pub struct IndicatorTable<P> {
    descriptors: [IndicatorDescriptor; IndicatorChannel::COUNT],
    pins: [P; IndicatorChannel::COUNT],
}

impl<P: OutputPin> IndicatorTable<P> {
    /// Idle period of the Activity channel before the first mode request.
    pub const ACTIVITY_IDLE_PERIOD: u32 = 5;
    /// Idle period of the Link channel before the first mode request.
    pub const LINK_IDLE_PERIOD: u32 = 2;

    /// Take ownership of both lines and drive them LOW.
    pub fn new(activity: P, link: P) -> Self {
        let mut table = Self {
            descriptors: [
                IndicatorDescriptor::new(Self::ACTIVITY_IDLE_PERIOD),
                IndicatorDescriptor::new(Self::LINK_IDLE_PERIOD),
            ],
            pins: [activity, link],
        };
        for channel in IndicatorChannel::ALL {
            table.drive(channel, PinState::Low);
        }
        table
    }

    pub fn set_mode(
        &mut self,
        mode: IndicatorMode,
        period_ticks: u32,
        channel: IndicatorChannel,
        burst_flashes: u32,
    ) {
        self.descriptors[channel.index()].apply(mode, period_ticks, burst_flashes);
    }

    /// Refresh Activity, then Link.
    pub fn refresh(&mut self) {
        for channel in IndicatorChannel::ALL {
            if let Some(level) = self.descriptors[channel.index()].refresh() {
                self.drive(channel, level);
            }
        }
    }

    pub fn descriptor(&self, channel: IndicatorChannel) -> &IndicatorDescriptor {
        &self.descriptors[channel.index()]
    }

    pub fn pin(&self, channel: IndicatorChannel) -> &P {
        &self.pins[channel.index()]
    }

    fn drive(&mut self, channel: IndicatorChannel, level: PinState) {
        if self.pins[channel.index()].set_state(level).is_err() {
            warn!("Indicator {:?}: output write failed", channel);
        }
    }
}

// ---------------------------------------------------------------------------
// Bank: the locked table shared by the worker and the setters
// ---------------------------------------------------------------------------

/// Lock-protected indicator table.
pub struct IndicatorBank<P> {
    table: Mutex<IndicatorTable<P>>,
    lock_timeout: Duration,
}

impl<P: OutputPin> IndicatorBank<P> {
    pub fn new(table: IndicatorTable<P>, lock_timeout: Duration) -> Self {
        Self {
            table: Mutex::new(table),
            lock_timeout,
        }
    }

    /// Apply a mode request, waiting for the lock without bound.
    pub fn set_mode(
        &self,
        mode: IndicatorMode,
        period_ticks: u32,
        channel: IndicatorChannel,
        burst_flashes: u32,
    ) {
        debug!(
            "Indicator {:?}: {:?} period={} burst={}",
            channel, mode, period_ticks, burst_flashes
        );
        self.table
            .lock()
            .set_mode(mode, period_ticks, channel, burst_flashes);
    }

    /// One refresh pass.  Returns `false` if the lock stayed busy for the
    /// whole bounded wait and the pass was skipped.
    pub fn refresh(&self) -> bool {
        match self.table.try_lock_for(self.lock_timeout) {
            Some(mut table) => {
                table.refresh();
                true
            }
            None => false,
        }
    }

    /// Copy of one channel's descriptor.
    pub fn descriptor(&self, channel: IndicatorChannel) -> IndicatorDescriptor {
        *self.table.lock().descriptor(channel)
    }

    /// Run `f` against the locked table.
    pub fn inspect<R>(&self, f: impl FnOnce(&IndicatorTable<P>) -> R) -> R {
        f(&self.table.lock())
    }

    #[cfg(test)]
    fn hold_lock(&self) -> parking_lot::MutexGuard<'_, IndicatorTable<P>> {
        self.table.lock()
    }
}
