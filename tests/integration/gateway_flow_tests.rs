//! Whole-gateway flows: every worker running on its own host thread, wired
//! exactly as on the target, with mock UART peers and LEDs.

use std::time::Duration;

use gsm_gateway::config::GatewayConfig;
use gsm_gateway::error::ModemError;
use gsm_gateway::events::{EventChannel, EventKind, EventReceiver, EventSender};
use gsm_gateway::gateway::{self, IndicatorHandle, priority};
use gsm_gateway::indicators::{IndicatorChannel, IndicatorMode};
use gsm_gateway::companion::{BUSY_COMMAND, CompanionHandle, CompanionLink, SCAN_COMMAND};
use gsm_gateway::modem::{Modem, ModemHandle};
use gsm_gateway::app::ports::EventPublisher;

use crate::mock_hw::{MockCompanion, MockModem, MockPin, fast_config, leak_channel, wait_until};

const SETTLE: Duration = Duration::from_secs(3);

struct Rig {
    indicators: IndicatorHandle<MockPin>,
    activity_pin: MockPin,
    companion: CompanionHandle,
    modem: ModemHandle,
}

/// Boot order of the firmware: the dispatcher first, holding every handle,
/// then the companion and modem workers, then the indicator worker.  The boot
/// pattern goes on once all of them are running.
fn boot(companion: MockCompanion, modem: MockModem, config: &GatewayConfig) -> Rig {
    let events: &'static EventChannel = leak_channel();
    let activity_pin = MockPin::new();

    let companion_worker = CompanionLink::new(companion, config.companion_retry_budget);
    let modem_worker = Modem::new(modem);
    let indicators = IndicatorHandle::new(activity_pin.clone(), MockPin::new(), config);
    let companion = companion_worker.handle();
    let modem = modem_worker.handle();

    gateway::start_dispatcher(
        events,
        indicators.clone(),
        modem.clone(),
        companion.clone(),
        priority::DISPATCHER,
        config,
    );
    gateway::spawn_companion_link(companion_worker, events, priority::COMPANION, config);
    gateway::spawn_modem(modem_worker, events, priority::MODEM, config);
    gateway::spawn_indicators(indicators.clone(), priority::INDICATORS, config);
    gateway::boot_indicators(&indicators, config);

    Rig {
        indicators,
        activity_pin,
        companion,
        modem,
    }
}

fn mode_of(rig: &Rig, channel: IndicatorChannel) -> (IndicatorMode, u32) {
    let d = rig.indicators.descriptor(channel);
    (d.mode, d.period_ticks)
}

#[test]
fn healthy_boot_switches_activity_to_slow_blink() {
    let config = fast_config();
    let rig = boot(MockCompanion::present(), MockModem::healthy(), &config);

    assert!(wait_until(SETTLE, || {
        mode_of(&rig, IndicatorChannel::Activity)
            == (IndicatorMode::Blink, config.healthy_blink_period)
    }));
    assert!(wait_until(SETTLE, || {
        mode_of(&rig, IndicatorChannel::Link).0 == IndicatorMode::On
    }));
}

#[test]
fn boot_pattern_shows_until_the_modem_reports() {
    let config = GatewayConfig {
        modem_startup_delay_ms: 400,
        ..fast_config()
    };
    let rig = boot(MockCompanion::present(), MockModem::healthy(), &config);

    // The companion answers within a few ticks, but one healthy device is
    // not enough to leave the boot pattern.
    std::thread::sleep(Duration::from_millis(150));
    assert_eq!(rig.modem.state(), gsm_gateway::modem::ModemState::Init);
    let boot = (IndicatorMode::Blink, config.boot_blink_period);
    assert_eq!(mode_of(&rig, IndicatorChannel::Activity), boot);
    assert_eq!(mode_of(&rig, IndicatorChannel::Link), boot);

    assert!(wait_until(SETTLE, || {
        mode_of(&rig, IndicatorChannel::Link).0 == IndicatorMode::On
    }));
}

#[test]
fn companion_message_is_sent_as_sms_and_channel_released() {
    let config = fast_config();
    let companion = MockCompanion::present();
    let modem = MockModem::healthy();
    modem.configure(|m| m.send_delay = Duration::from_millis(100));
    let rig = boot(companion.clone(), modem.clone(), &config);

    assert!(wait_until(SETTLE, || {
        mode_of(&rig, IndicatorChannel::Link).0 == IndicatorMode::On
    }));
    companion.offer("TEMP HIGH");

    assert!(wait_until(SETTLE, || modem.sent() == vec!["TEMP HIGH".to_owned()]));
    assert!(wait_until(SETTLE, || !rig.companion.is_busy()));

    // The link announced BUSY while the SMS was in flight, then went back
    // to plain SCAN polling once released.
    let commands = companion.commands();
    assert!(commands.contains(&BUSY_COMMAND));
    assert!(wait_until(SETTLE, || {
        companion.commands().last() == Some(&SCAN_COMMAND)
    }));

    // The flash burst ends by restoring the steady Link light.
    assert!(wait_until(SETTLE, || {
        let d = rig.indicators.descriptor(IndicatorChannel::Link);
        d.mode == IndicatorMode::On && d.remaining_blink_events == 0
    }));
}

#[test]
fn missing_companion_latches_activity_on() {
    let config = fast_config();
    let rig = boot(MockCompanion::absent(), MockModem::healthy(), &config);

    assert!(wait_until(SETTLE, || {
        mode_of(&rig, IndicatorChannel::Activity).0 == IndicatorMode::On
            && mode_of(&rig, IndicatorChannel::Link).0 == IndicatorMode::On
    }));
    assert!(wait_until(SETTLE, || {
        rig.activity_pin.level() == Some(embedded_hal::digital::PinState::High)
    }));

    // Health never reaches two, so the latch holds.
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(mode_of(&rig, IndicatorChannel::Activity).0, IndicatorMode::On);
}

#[test]
fn absent_modem_latches_activity_and_clears_link() {
    let config = fast_config();
    let modem = MockModem::healthy();
    modem.configure(|m| m.start = Err(ModemError::Timeout));
    let rig = boot(MockCompanion::present(), modem, &config);

    assert!(wait_until(SETTLE, || {
        mode_of(&rig, IndicatorChannel::Activity).0 == IndicatorMode::On
            && mode_of(&rig, IndicatorChannel::Link).0 == IndicatorMode::Off
    }));
}

#[test]
fn failed_send_releases_channel_without_burst() {
    let config = fast_config();
    let companion = MockCompanion::present();
    let modem = MockModem::healthy();
    modem.configure(|m| m.send = Err(ModemError::Timeout));
    let rig = boot(companion.clone(), modem.clone(), &config);

    assert!(wait_until(SETTLE, || {
        mode_of(&rig, IndicatorChannel::Link).0 == IndicatorMode::On
    }));
    companion.offer("DOOR");
    assert!(wait_until(SETTLE, || companion.outbox_len() == 0));
    assert!(wait_until(SETTLE, || !rig.companion.is_busy()
        && rig.modem.state() == gsm_gateway::modem::ModemState::Stopped));

    assert!(modem.sent().is_empty());
    let link = rig.indicators.descriptor(IndicatorChannel::Link);
    assert_eq!(link.mode, IndicatorMode::On);
    assert_eq!(link.remaining_blink_events, 0);
}

#[test]
fn full_channel_blocks_publisher_until_drained() {
    let events: &'static EventChannel = leak_channel();

    let producer = std::thread::spawn(move || {
        let mut tx = EventSender::new(events);
        for _ in 0..15 {
            tx.publish(EventKind::CompanionOk.into());
        }
    });

    let rx = EventReceiver::new(events);
    assert!(wait_until(SETTLE, || rx.pending() == 10));
    std::thread::sleep(Duration::from_millis(50));
    assert!(!producer.is_finished());
    assert_eq!(rx.pending(), 10);

    for _ in 0..15 {
        assert_eq!(rx.receive().kind, EventKind::CompanionOk);
    }
    producer.join().unwrap();
    assert!(rx.try_receive().is_none());
}
