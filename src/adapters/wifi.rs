//! WiFi station-mode adapter.
//!
//! Implements [`ConnectivityPort`], the hexagonal boundary for network
//! connectivity, and mirrors the association state into the shared
//! [`LinkStatus`] flag the HTTP transport checks before every request.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## Reconnection policy
//!
//! [`connect`](ConnectivityPort::connect) only starts association and
//! returns. [`poll`](ConnectivityPort::poll), called once per control-loop
//! iteration, checks whether the interface came up and gives the attempt
//! up after `connect_timeout_ms`. Nothing here waits on the radio, so the
//! loop keeps feeding the watchdog while the access point is away.
//!
//! After a drop or a failed attempt, retries are spaced by an exponential
//! backoff (2 s → 4 s → 8 s … capped at 60 s).

use core::fmt;
use log::{error, info, warn};

use crate::authz::http::LinkStatus;
use crate::text::is_printable_ascii;

// ───────────────────────────────────────────────────────────────
// Port trait
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    NoDriver,
    ConnectionFailed,
    Timeout,
    AlreadyConnected,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
            Self::NoDriver => write!(f, "WiFi driver not attached"),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
            Self::Timeout => write!(f, "WiFi association timed out"),
            Self::AlreadyConnected => write!(f, "already connected to AP"),
        }
    }
}

pub trait ConnectivityPort {
    /// Start associating. Success means the attempt is under way, not that
    /// the link is up.
    fn connect(&mut self, now_ms: u32) -> Result<(), ConnectivityError>;
    fn disconnect(&mut self);
    fn is_connected(&self) -> bool;
    /// Called each loop iteration with the current time in ms.
    fn poll(&mut self, now_ms: u32);
    fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError>;
}

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    Connecting { attempt: u32 },
    Connected,
    Reconnecting { attempt: u32 },
}

const INITIAL_BACKOFF_MS: u32 = 2_000;
const MAX_BACKOFF_MS: u32 = 60_000;

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    state: WifiState,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    connect_timeout_ms: u32,
    backoff_ms: u32,
    next_attempt_ms: u32,
    connect_started_ms: u32,
    link: LinkStatus,
    #[cfg(target_os = "espidf")]
    driver: Option<esp_idf_svc::wifi::EspWifi<'static>>,
    /// Simulation: whether the access point answers.
    #[cfg(not(target_os = "espidf"))]
    sim_reachable: bool,
    #[cfg(not(target_os = "espidf"))]
    sim_connect_calls: u32,
    /// Simulation: polls an association stays pending before it completes.
    #[cfg(not(target_os = "espidf"))]
    sim_association_polls: u32,
    #[cfg(not(target_os = "espidf"))]
    sim_pending_polls: u32,
}

impl WifiAdapter {
    pub fn new(link: LinkStatus, connect_timeout_ms: u32) -> Self {
        link.set(false);
        Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            connect_timeout_ms,
            backoff_ms: INITIAL_BACKOFF_MS,
            next_attempt_ms: 0,
            connect_started_ms: 0,
            link,
            #[cfg(target_os = "espidf")]
            driver: None,
            #[cfg(not(target_os = "espidf"))]
            sim_reachable: true,
            #[cfg(not(target_os = "espidf"))]
            sim_connect_calls: 0,
            #[cfg(not(target_os = "espidf"))]
            sim_association_polls: 0,
            #[cfg(not(target_os = "espidf"))]
            sim_pending_polls: 0,
        }
    }

    /// Hand over the station driver created in `main`.
    #[cfg(target_os = "espidf")]
    pub fn attach_driver(&mut self, driver: esp_idf_svc::wifi::EspWifi<'static>) {
        self.driver = Some(driver);
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    pub fn link_status(&self) -> LinkStatus {
        self.link.clone()
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn set_simulated_reachable(&mut self, reachable: bool) {
        self.sim_reachable = reachable;
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn simulated_connect_calls(&self) -> u32 {
        self.sim_connect_calls
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn set_simulated_association_polls(&mut self, polls: u32) {
        self.sim_association_polls = polls;
    }

    /// Kick off an association attempt and return without waiting for it.
    fn begin_attempt(&mut self, now_ms: u32, attempt: u32) -> Result<(), ConnectivityError> {
        self.state = WifiState::Connecting { attempt };
        self.connect_started_ms = now_ms;
        if let Err(e) = self.platform_begin_connect() {
            error!("WiFi: connect request rejected: {}", e);
            self.retry_later(now_ms, attempt + 1);
            return Err(e);
        }
        Ok(())
    }

    fn retry_later(&mut self, now_ms: u32, attempt: u32) {
        self.mark_lost(now_ms, attempt);
        self.backoff_ms = (self.backoff_ms * 2).min(MAX_BACKOFF_MS);
    }

    fn mark_connected(&mut self) {
        self.state = WifiState::Connected;
        self.backoff_ms = INITIAL_BACKOFF_MS;
        self.link.set(true);
    }

    fn mark_lost(&mut self, now_ms: u32, attempt: u32) {
        self.state = WifiState::Reconnecting { attempt };
        self.next_attempt_ms = now_ms.wrapping_add(self.backoff_ms);
        self.link.set(false);
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_begin_connect(&mut self) -> Result<(), ConnectivityError> {
        use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};

        let Some(driver) = self.driver.as_mut() else {
            return Err(ConnectivityError::NoDriver);
        };
        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let config = Configuration::Client(ClientConfiguration {
            ssid: self
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidSsid)?,
            password: self
                .password
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });

        driver
            .set_configuration(&config)
            .map_err(|_| ConnectivityError::ConnectionFailed)?;
        if !driver.is_started().unwrap_or(false) {
            driver.start().map_err(|_| ConnectivityError::ConnectionFailed)?;
        }
        // esp_wifi_connect() only queues the request; the outcome shows up
        // later through is_up().
        driver.connect().map_err(|_| ConnectivityError::ConnectionFailed)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_begin_connect(&mut self) -> Result<(), ConnectivityError> {
        self.sim_connect_calls = self.sim_connect_calls.wrapping_add(1);
        self.sim_pending_polls = self.sim_association_polls;
        info!("WiFi(sim): associating with '{}'", self.ssid);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_link_up(&mut self) -> bool {
        self.driver
            .as_ref()
            .is_some_and(|d| d.is_up().unwrap_or(false))
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_link_up(&mut self) -> bool {
        if !self.sim_reachable {
            return false;
        }
        if self.sim_pending_polls > 0 {
            self.sim_pending_polls -= 1;
            return false;
        }
        true
    }

    #[cfg(target_os = "espidf")]
    fn platform_disconnect(&mut self) {
        if let Some(driver) = self.driver.as_mut() {
            let _ = driver.disconnect();
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_disconnect(&mut self) {
        info!("WiFi(sim): disconnected");
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.driver
            .as_ref()
            .is_some_and(|d| d.is_connected().unwrap_or(false))
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.state == WifiState::Connected && self.sim_reachable
    }
}

// ───────────────────────────────────────────────────────────────
// ConnectivityPort
// ───────────────────────────────────────────────────────────────

impl ConnectivityPort for WifiAdapter {
    fn connect(&mut self, now_ms: u32) -> Result<(), ConnectivityError> {
        if self.ssid.is_empty() {
            return Err(ConnectivityError::NoCredentials);
        }
        if self.state == WifiState::Connected {
            return Err(ConnectivityError::AlreadyConnected);
        }

        info!("WiFi: connecting to '{}'", self.ssid);
        self.begin_attempt(now_ms, 0)
    }

    fn disconnect(&mut self) {
        self.platform_disconnect();
        self.state = WifiState::Disconnected;
        self.link.set(false);
        info!("WiFi: disconnected");
    }

    fn is_connected(&self) -> bool {
        self.platform_is_connected()
    }

    fn poll(&mut self, now_ms: u32) {
        match self.state {
            WifiState::Connecting { attempt } => {
                if self.platform_link_up() {
                    self.mark_connected();
                    info!("WiFi: connected (attempt {})", attempt);
                } else if now_ms.wrapping_sub(self.connect_started_ms) >= self.connect_timeout_ms {
                    warn!("WiFi: {} after {}ms", ConnectivityError::Timeout, self.connect_timeout_ms);
                    self.platform_disconnect();
                    self.retry_later(now_ms, attempt + 1);
                }
            }
            WifiState::Reconnecting { attempt } => {
                // Signed distance keeps the comparison valid across wrap.
                if (now_ms.wrapping_sub(self.next_attempt_ms) as i32) < 0 {
                    return;
                }
                info!("WiFi: reconnect attempt {} (backoff {}ms)", attempt, self.backoff_ms);
                let _ = self.begin_attempt(now_ms, attempt);
            }
            WifiState::Connected => {
                if !self.platform_is_connected() {
                    warn!("WiFi: connection lost, entering reconnect");
                    self.mark_lost(now_ms, 0);
                }
            }
            WifiState::Disconnected => {}
        }
    }

    fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.ssid.push_str(ssid).map_err(|_| ConnectivityError::InvalidSsid)?;
        self.password.clear();
        self.password
            .push_str(password)
            .map_err(|_| ConnectivityError::InvalidPassword)?;
        info!("WiFi: credentials set (SSID='{}')", self.ssid);
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
