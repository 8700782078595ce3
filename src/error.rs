//! Unified error types for the GateKeeper firmware.
//!
//! Every subsystem converts into the single [`Error`] enum so the bootstrap
//! path in `main` has one type to report. Variants are `Copy`. None of them
//! ever escapes the control loop: the loop maps every collaborator failure
//! onto a closed barrier instead.

use core::fmt;

use crate::adapters::wifi::ConnectivityError;
use crate::authz::http::HttpError;
use crate::drivers::hw_init::HwInitError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The presence sensor could not be configured or read.
    Sensor(SensorError),
    /// The barrier actuator could not be driven.
    Actuator(ActuatorError),
    /// The authorization link failed below the decision contract.
    Transport(TransportError),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// GPIO input configuration was rejected.
    GpioConfigFailed,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioConfigFailed => write!(f, "GPIO config failed"),
        }
    }
}

impl core::error::Error for SensorError {}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// LEDC timer or channel setup failed.
    PwmAttachFailed,
    /// Duty-cycle write failed.
    PwmWriteFailed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PwmAttachFailed => write!(f, "PWM attach failed"),
            Self::PwmWriteFailed => write!(f, "PWM write failed"),
        }
    }
}

impl core::error::Error for ActuatorError {}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    WifiConnectFailed,
    UartInitFailed,
    WorkerSpawnFailed,
    RequestFailed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WifiConnectFailed => write!(f, "WiFi connect failed"),
            Self::UartInitFailed => write!(f, "UART init failed"),
            Self::WorkerSpawnFailed => write!(f, "decision worker spawn failed"),
            Self::RequestFailed => write!(f, "decision request failed"),
        }
    }
}

impl core::error::Error for TransportError {}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Subsystem failure types
// ---------------------------------------------------------------------------

impl From<HwInitError> for Error {
    fn from(e: HwInitError) -> Self {
        match e {
            HwInitError::GpioConfigFailed(_) => Self::Sensor(SensorError::GpioConfigFailed),
            HwInitError::LedcInitFailed(_) => Self::Actuator(ActuatorError::PwmAttachFailed),
            HwInitError::UartInitFailed(_) => Self::Transport(TransportError::UartInitFailed),
        }
    }
}

impl From<ConnectivityError> for Error {
    fn from(e: ConnectivityError) -> Self {
        match e {
            ConnectivityError::NoCredentials
            | ConnectivityError::InvalidSsid
            | ConnectivityError::InvalidPassword => Self::Config("WiFi credentials"),
            ConnectivityError::NoDriver
            | ConnectivityError::ConnectionFailed
            | ConnectivityError::Timeout
            | ConnectivityError::AlreadyConnected => Self::Transport(TransportError::WifiConnectFailed),
        }
    }
}

impl From<HttpError> for Error {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::InvalidUrl => Self::Config("endpoint_url must be http://host[:port]/path"),
            _ => Self::Transport(TransportError::RequestFailed),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
