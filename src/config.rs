//! Gate configuration parameters
//!
//! All tunable parameters for the GateKeeper controller. Network
//! credentials and the authorization endpoint are baked in at build time
//! from `GATEKEEPER_WIFI_SSID`, `GATEKEEPER_WIFI_PASSWORD` and
//! `GATEKEEPER_ENDPOINT`.

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::drivers::watchdog;
use crate::error::{Error, Result};

const DEFAULT_ENDPOINT: &str = "http://192.168.10.213:8000/lpr";

/// Which remote authority answers the gate's question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorizationMode {
    /// HTTP GET to [`GateConfig::endpoint_url`] over WiFi.
    Network,
    /// `CAR_DETECTED` line over the UART to a companion board.
    Serial,
}

/// How the authorization exchange is scheduled relative to the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionDispatch {
    /// Blocking call inside the tick; the loop stalls for at most the window.
    Inline,
    /// Dedicated worker thread; the loop polls for the outcome every tick.
    Worker,
}

/// Servo geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServoConfig {
    /// Barrier-down angle (degrees).
    pub closed_angle_deg: u8,
    /// Barrier-up angle (degrees).
    pub open_angle_deg: u8,
    /// Pulse width at 0 degrees (microseconds).
    pub min_pulse_us: u16,
    /// Pulse width at 180 degrees (microseconds).
    pub max_pulse_us: u16,
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            closed_angle_deg: 0,
            open_angle_deg: 90,
            min_pulse_us: 500,
            max_pulse_us: 2400,
        }
    }
}

/// Point-to-point link parameters for [`AuthorizationMode::Serial`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialConfig {
    pub baud_rate: u32,
    /// Transmit attempts before the request is abandoned.
    pub tx_attempts: u8,
    /// Pause after a failed transmit (milliseconds).
    pub tx_retry_interval_ms: u32,
    /// Length of one receive attempt (milliseconds).
    pub rx_attempt_timeout_ms: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            tx_attempts: 5,
            tx_retry_interval_ms: 20,
            rx_attempt_timeout_ms: 100,
        }
    }
}

/// Core gate configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    // --- Presence sensor ---
    /// `true` if a HIGH level means "object present". The stock LM393
    /// module pulls the line LOW when it sees a vehicle.
    pub sensor_active_high: bool,
    /// Raw level must hold this long before it is accepted (milliseconds)
    pub debounce_ms: u32,

    // --- Timing ---
    /// Idle delay at the end of every loop iteration (milliseconds)
    pub loop_delay_ms: u32,
    /// Longest time spent in AwaitingDecision (milliseconds)
    pub response_window_ms: u32,
    /// Closed setpoint hold time before returning to Idle (milliseconds)
    pub close_settle_ms: u32,

    // --- Actuator ---
    pub servo: ServoConfig,

    // --- Display ---
    /// `false` for boards without a status display; screens are dropped.
    pub status_display: bool,

    // --- Authorization ---
    pub authorization: AuthorizationMode,
    pub dispatch: DecisionDispatch,
    /// Decision endpoint, `http://host[:port]/path`
    pub endpoint_url: String<128>,
    pub wifi_ssid: String<32>,
    pub wifi_password: String<64>,
    /// Time one STA association attempt may stay pending (milliseconds)
    pub wifi_connect_timeout_ms: u32,
    pub serial: SerialConfig,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            // Presence sensor
            sensor_active_high: false,
            debounce_ms: 50,

            // Timing
            loop_delay_ms: 10,
            response_window_ms: 5000,
            close_settle_ms: 500,

            servo: ServoConfig::default(),
            status_display: true,

            // Authorization
            authorization: AuthorizationMode::Network,
            dispatch: DecisionDispatch::Worker,
            endpoint_url: bounded(option_env!("GATEKEEPER_ENDPOINT").unwrap_or(DEFAULT_ENDPOINT)),
            wifi_ssid: bounded(option_env!("GATEKEEPER_WIFI_SSID").unwrap_or("")),
            wifi_password: bounded(option_env!("GATEKEEPER_WIFI_PASSWORD").unwrap_or("")),
            wifi_connect_timeout_ms: 20_000,
            serial: SerialConfig::default(),
        }
    }
}

fn bounded<const N: usize>(s: &str) -> String<N> {
    crate::text::truncated(s)
}

impl GateConfig {
    /// Reject parameter combinations the control loop cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.debounce_ms == 0 {
            return Err(Error::Config("debounce_ms must be non-zero"));
        }
        if self.response_window_ms == 0 {
            return Err(Error::Config("response_window_ms must be non-zero"));
        }
        let servo = &self.servo;
        if servo.open_angle_deg > 180 || servo.closed_angle_deg > 180 {
            return Err(Error::Config("servo angles must be within 0..=180"));
        }
        if servo.open_angle_deg == servo.closed_angle_deg {
            return Err(Error::Config("servo open and closed angles coincide"));
        }
        if servo.min_pulse_us >= servo.max_pulse_us {
            return Err(Error::Config("servo pulse range is inverted"));
        }
        if self.serial.tx_attempts == 0 {
            return Err(Error::Config("serial tx_attempts must be at least 1"));
        }
        if self.serial.rx_attempt_timeout_ms > self.response_window_ms {
            return Err(Error::Config("serial rx attempt exceeds the response window"));
        }
        if self.authorization == AuthorizationMode::Network
            && !self.endpoint_url.starts_with("http://")
        {
            return Err(Error::Config("endpoint_url must be an http:// URL"));
        }
        Ok(())
    }

    /// Longest single loop iteration: an inline decision blocks for the
    /// window plus every serial transmit retry, then the idle delay runs.
    pub fn worst_case_iteration_ms(&self) -> u32 {
        let tx_retries = u32::from(self.serial.tx_attempts).saturating_mul(self.serial.tx_retry_interval_ms);
        self.response_window_ms
            .saturating_add(tx_retries)
            .saturating_add(self.loop_delay_ms)
    }

    /// TWDT timeout with twice the worst iteration as headroom.
    pub fn watchdog_timeout_ms(&self) -> u32 {
        watchdog::DEFAULT_TIMEOUT_MS.max(self.worst_case_iteration_ms().saturating_mul(2))
    }
}
