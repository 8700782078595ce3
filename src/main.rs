//! Gatekeeper Firmware — Main Entry Point
//!
//! Hexagonal architecture around a single-threaded control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   LogEventSink   ConsolePresenter  SystemClock│
//! │  (Sensor+Actuator) (EventSink)    (StatusPresenter) (ClockPort)│
//! │  WifiAdapter       Http / Serial decision transports           │
//! │  (Connectivity)    behind Inline or Worker dispatch            │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              GateService (pure logic)                  │    │
//! │  │  Debouncer · FSM                                       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Watchdog · WiFi reconnect poll · loop delay                   │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use embedded_hal::delay::DelayNs;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::EspWifi;
use log::{error, info, warn};

use gatekeeper::adapters::hardware::HardwareAdapter;
use gatekeeper::adapters::log_sink::LogEventSink;
use gatekeeper::adapters::presenter::ConsolePresenter;
use gatekeeper::adapters::time::{SystemClock, SystemDelay};
use gatekeeper::adapters::wifi::{ConnectivityPort, WifiAdapter};
use gatekeeper::app::ports::{ClockPort, DecisionPort};
use gatekeeper::app::service::GateService;
use gatekeeper::authz::dispatch::{InlineDecisions, WorkerDecisions};
use gatekeeper::authz::http::{HttpDecisionTransport, LinkStatus};
use gatekeeper::authz::link::UartLink;
use gatekeeper::authz::serial::SerialDecisionTransport;
use gatekeeper::authz::AuthorizationTransport;
use gatekeeper::config::{AuthorizationMode, DecisionDispatch, GateConfig};
use gatekeeper::drivers::hw_init;
use gatekeeper::drivers::servo::ServoDriver;
use gatekeeper::drivers::watchdog::Watchdog;
use gatekeeper::error::Error;
use gatekeeper::pins;
use gatekeeper::sensors::PresenceSensor;

type BoxedTransport = Box<dyn AuthorizationTransport + Send>;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Gatekeeper v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = GateConfig::default();
    config.validate()?;
    info!(
        "Config: mode={:?} dispatch={:?} window={}ms debounce={}ms watchdog={}ms",
        config.authorization,
        config.dispatch,
        config.response_window_ms,
        config.debounce_ms,
        config.watchdog_timeout_ms()
    );

    // ── 2. Peripherals ────────────────────────────────────────
    if let Err(e) = hw_init::init_presence_input() {
        // Without a presence input the gate never opens. Keep running so
        // the barrier stays commanded closed and the watchdog stays fed.
        error!("Presence input init failed: {}", Error::from(e));
    }
    let mut servo = ServoDriver::new(config.servo);
    if let Err(e) = servo.attach() {
        warn!("Continuing without barrier actuation: {}", Error::from(e));
    }
    let clock = SystemClock::new();
    let mut watchdog = Watchdog::new(config.watchdog_timeout_ms());

    let hw = HardwareAdapter::new(PresenceSensor::new(pins::PRESENCE_SENSOR_GPIO), servo);

    // ── 3. Authorization transport ────────────────────────────
    let mut wifi = None;
    let transport: BoxedTransport = match config.authorization {
        AuthorizationMode::Network => {
            let link = LinkStatus::default();
            let mut adapter = WifiAdapter::new(link.clone(), config.wifi_connect_timeout_ms);

            let peripherals = Peripherals::take()?;
            let sysloop = EspSystemEventLoop::take()?;
            let nvs = EspDefaultNvsPartition::take()?;
            adapter.attach_driver(EspWifi::new(peripherals.modem, sysloop, Some(nvs))?);

            // Association completes in the loop's poll; until then requests
            // yield NoResponse.
            match adapter.set_credentials(&config.wifi_ssid, &config.wifi_password) {
                Ok(()) => {
                    if let Err(e) = adapter.connect(clock.now_ms()) {
                        warn!("WiFi: {}, will retry", Error::from(e));
                    }
                }
                Err(e) => error!("WiFi: {}, network authorization disabled", Error::from(e)),
            }
            wifi = Some(adapter);

            let http = HttpDecisionTransport::new(&config.endpoint_url, link).map_err(Error::from)?;
            info!("AUTHZ: network mode, endpoint {:?}", http.endpoint());
            Box::new(http)
        }
        AuthorizationMode::Serial => {
            let uart = UartLink::open(pins::AUTH_UART_PORT, config.serial.baud_rate).map_err(Error::from)?;
            info!("AUTHZ: serial mode, UART{} @ {} baud", pins::AUTH_UART_PORT, config.serial.baud_rate);
            Box::new(SerialDecisionTransport::new(uart, SystemClock::new(), SystemDelay, config.serial))
        }
    };

    // ── 4. Dispatch ───────────────────────────────────────────
    let decisions: Box<dyn DecisionPort> = match config.dispatch {
        DecisionDispatch::Inline => Box::new(InlineDecisions::new(transport)),
        DecisionDispatch::Worker => Box::new(WorkerDecisions::spawn(transport).map_err(Error::from)?),
    };

    // ── 5. Application service ────────────────────────────────
    let mut delay = SystemDelay;
    let mut log_sink = LogEventSink::new();
    let loop_delay_ms = config.loop_delay_ms;

    let presenter = ConsolePresenter::for_config(&config);
    let mut app = GateService::new(config, hw, presenter, decisions, SystemClock::new());
    app.start(&mut log_sink);

    info!("System ready. Entering control loop.");

    // ── 6. Control loop ───────────────────────────────────────
    loop {
        app.tick(&mut log_sink);

        if let Some(wifi) = wifi.as_mut() {
            wifi.poll(clock.now_ms());
        }

        watchdog.feed();
        delay.delay_ms(loop_delay_ms);
    }
}
