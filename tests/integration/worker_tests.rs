//! Individual workers on real threads, observed through the event channel
//! and their handles.

use std::time::Duration;

use embedded_hal::digital::PinState;

use gsm_gateway::app::ports::IndicatorControl;
use gsm_gateway::error::QueueError;
use gsm_gateway::events::{EventKind, EventReceiver, MessageBuffer};
use gsm_gateway::gateway::{self, priority};
use gsm_gateway::indicators::{IndicatorChannel, IndicatorMode};
use gsm_gateway::modem::ModemState;

use crate::mock_hw::{MockCompanion, MockModem, MockPin, fast_config, leak_channel, wait_until};

const SETTLE: Duration = Duration::from_secs(3);

#[test]
fn silent_companion_reported_once() {
    let config = fast_config();
    let events = leak_channel();
    let companion = MockCompanion::absent();
    gateway::start_companion_link(companion.clone(), events, priority::COMPANION, &config);

    let rx = EventReceiver::new(events);
    assert_eq!(rx.receive().kind, EventKind::CompanionNotDetected);

    std::thread::sleep(Duration::from_millis(100));
    assert!(rx.try_receive().is_none());
    assert_eq!(companion.commands().len(), 1);
}

#[test]
fn companion_detected_and_message_published() {
    let config = fast_config();
    let events = leak_channel();
    let companion = MockCompanion::present();
    let handle = gateway::start_companion_link(companion.clone(), events, priority::COMPANION, &config);

    let rx = EventReceiver::new(events);
    assert_eq!(rx.receive().kind, EventKind::CompanionOk);

    companion.offer("PUMP FAULT");
    let ev = rx.receive();
    assert_eq!(ev.kind, EventKind::CompanionMessageReady);
    assert_eq!(ev.payload.map(|m| m.as_bytes_with_nul().to_vec()), Some(b"PUMP FAULT\0".to_vec()));
    assert!(handle.is_busy());

    handle.free_channel();
    assert!(!handle.is_busy());
}

#[test]
fn modem_waits_out_startup_delay() {
    let config = gsm_gateway::config::GatewayConfig {
        modem_startup_delay_ms: 200,
        ..fast_config()
    };
    let events = leak_channel();
    let modem = gateway::start_modem(MockModem::healthy(), events, priority::MODEM, &config);

    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(modem.state(), ModemState::Init);

    let rx = EventReceiver::new(events);
    assert_eq!(rx.receive().kind, EventKind::ModemInitOk);
    assert_eq!(modem.state(), ModemState::Ready);
}

#[test]
fn second_message_rejected_while_sending() {
    let config = fast_config();
    let events = leak_channel();
    let driver = MockModem::healthy();
    driver.configure(|m| m.send_delay = Duration::from_millis(200));
    let modem = gateway::start_modem(driver.clone(), events, priority::MODEM, &config);

    let rx = EventReceiver::new(events);
    assert_eq!(rx.receive().kind, EventKind::ModemInitOk);

    let first = MessageBuffer::from_bytes(b"first");
    let second = MessageBuffer::from_bytes(b"second");
    assert_eq!(modem.queue_message(&first), Ok(()));
    assert_eq!(modem.queue_message(&second), Err(QueueError::Busy));

    assert_eq!(rx.receive().kind, EventKind::ModemSendOk);
    assert_eq!(driver.sent(), vec!["first".to_owned()]);

    // Stopped accepts a new send.
    assert_eq!(modem.queue_message(&second), Ok(()));
    assert_eq!(rx.receive().kind, EventKind::ModemSendOk);
    assert_eq!(driver.sent(), vec!["first".to_owned(), "second".to_owned()]);
}

#[test]
fn indicator_worker_blinks_the_pin() {
    let config = fast_config();
    let activity = MockPin::new();
    let indicators = gateway::start_indicators(
        activity.clone(),
        MockPin::new(),
        priority::INDICATORS,
        &config,
    );

    indicators.set_mode(IndicatorMode::Blink, 2, IndicatorChannel::Activity, 0);
    assert!(wait_until(SETTLE, || {
        let writes = activity.writes();
        writes.iter().filter(|s| **s == PinState::High).count() >= 3
            && writes.iter().filter(|s| **s == PinState::Low).count() >= 4
    }));
    assert_eq!(
        indicators.descriptor(IndicatorChannel::Activity).mode,
        IndicatorMode::Blink
    );
}

#[test]
fn indicator_burst_restores_previous_mode() {
    let config = fast_config();
    let indicators = gateway::start_indicators(
        MockPin::new(),
        MockPin::new(),
        priority::INDICATORS,
        &config,
    );

    indicators.set_mode(IndicatorMode::Off, 0, IndicatorChannel::Link, 0);
    indicators.set_mode(IndicatorMode::Blink, 1, IndicatorChannel::Link, 3);
    assert!(wait_until(SETTLE, || {
        let d = indicators.descriptor(IndicatorChannel::Link);
        d.mode == IndicatorMode::Off && d.remaining_blink_events == 0
    }));
}
