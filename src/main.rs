//! GSM alert gateway: firmware entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  UART1 ── CompanionLink ──┐                                  │
//! │                           ├──▶ EventChannel ──▶ Dispatcher   │
//! │  UART2 ── Modem(GsmModem)─┘                        │         │
//! │                                                    ▼         │
//! │  GPIO13/12 ◀── IndicatorBank ◀────────────── set_mode        │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    use esp_idf_hal::gpio::{AnyIOPin, AnyOutputPin, PinDriver};
    use esp_idf_hal::peripherals::Peripherals;
    use esp_idf_hal::uart::{UartDriver, config::Config as UartConfig};
    use esp_idf_hal::units::Hertz;
    use log::info;

    use gsm_gateway::companion::CompanionLink;
    use gsm_gateway::config::GatewayConfig;
    use gsm_gateway::drivers::uart::UartLink;
    use gsm_gateway::events::EventChannel;
    use gsm_gateway::gateway::{self, IndicatorHandle, priority};
    use gsm_gateway::modem::{AtTimeouts, GsmModem, Modem};
    use gsm_gateway::pins;

    static EVENTS: EventChannel = EventChannel::new();

    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    info!("GSM gateway v{}", env!("CARGO_PKG_VERSION"));

    let config = GatewayConfig::load(option_env!("GATEWAY_CONFIG"));

    // ── 2. Peripherals ────────────────────────────────────────
    let peripherals = Peripherals::take()?;

    // SAFETY: the typed GPIO singletons in `peripherals.pins` are never
    // taken, so each number in `pins` has exactly one owner below.
    let (companion_tx, companion_rx, modem_tx, modem_rx, activity_gpio, link_gpio) = unsafe {
        (
            AnyIOPin::new(pins::COMPANION_UART_TX_GPIO),
            AnyIOPin::new(pins::COMPANION_UART_RX_GPIO),
            AnyIOPin::new(pins::MODEM_UART_TX_GPIO),
            AnyIOPin::new(pins::MODEM_UART_RX_GPIO),
            AnyOutputPin::new(pins::ACTIVITY_LED_GPIO),
            AnyOutputPin::new(pins::LINK_LED_GPIO),
        )
    };

    let companion_uart = UartDriver::new(
        peripherals.uart1,
        companion_tx,
        companion_rx,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &UartConfig::default().baudrate(Hertz(config.companion_baud)),
    )?;
    info!(
        "Companion UART1 TX={} RX={} @{}",
        pins::COMPANION_UART_TX_GPIO,
        pins::COMPANION_UART_RX_GPIO,
        config.companion_baud
    );

    let modem_uart = UartDriver::new(
        peripherals.uart2,
        modem_tx,
        modem_rx,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &UartConfig::default().baudrate(Hertz(config.modem_baud)),
    )?;
    info!(
        "Modem UART2 TX={} RX={} @{}",
        pins::MODEM_UART_TX_GPIO,
        pins::MODEM_UART_RX_GPIO,
        config.modem_baud
    );

    let activity_led = PinDriver::output(activity_gpio)?;
    let link_led = PinDriver::output(link_gpio)?;
    info!(
        "Indicators: activity GPIO{} link GPIO{}",
        pins::ACTIVITY_LED_GPIO,
        pins::LINK_LED_GPIO
    );

    // ── 3. Workers ────────────────────────────────────────────
    // The dispatcher holds every handle before the first event is
    // published.
    let companion = CompanionLink::new(
        UartLink::new(companion_uart, "companion"),
        config.companion_retry_budget,
    );
    let modem = Modem::new(GsmModem::new(
        UartLink::new(modem_uart, "modem"),
        config.sms_recipient.clone(),
        AtTimeouts::from_config(&config),
    ));
    let indicators = IndicatorHandle::new(activity_led, link_led, &config);

    gateway::start_dispatcher(
        &EVENTS,
        indicators.clone(),
        modem.handle(),
        companion.handle(),
        priority::DISPATCHER,
        &config,
    );
    gateway::spawn_companion_link(companion, &EVENTS, priority::COMPANION, &config);
    gateway::spawn_modem(modem, &EVENTS, priority::MODEM, &config);
    gateway::spawn_indicators(indicators.clone(), priority::INDICATORS, &config);

    // ── 4. Boot pattern ───────────────────────────────────────
    gateway::boot_indicators(&indicators, &config);
    info!("System init complete");

    loop {
        std::thread::park();
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!(
        "gsm-gateway v{} runs on ESP-IDF targets; on the host use `cargo test`.",
        env!("CARGO_PKG_VERSION")
    );
}
