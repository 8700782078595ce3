//! Network realization of [`AuthorizationTransport`].
//!
//! Issues a GET to the configured endpoint and decodes the JSON body with
//! [`decode_decision`](super::response::decode_decision). The request is
//! skipped outright while the WiFi link is down.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::http::client::EspHttpConnection`.
//! - **all other targets**: HTTP/1.0 over `std::net::TcpStream`, used by the
//!   host simulation and the integration tests.

use core::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use heapless::String;
use log::{debug, info, warn};

use super::response::outcome_from_body;
use super::{AuthorizationOutcome, AuthorizationRequest, AuthorizationTransport};

/// Largest decision body accepted.
pub const MAX_BODY_LEN: usize = 1024;

// ───────────────────────────────────────────────────────────────
// Link status
// ───────────────────────────────────────────────────────────────

/// Shared "WiFi is associated" flag, written by the WiFi adapter and read
/// by the transport (possibly from the decision worker thread).
#[derive(Debug, Clone, Default)]
pub struct LinkStatus(Arc<AtomicBool>);

impl LinkStatus {
    pub fn new(up: bool) -> Self {
        Self(Arc::new(AtomicBool::new(up)))
    }

    pub fn set(&self, up: bool) {
        self.0.store(up, Ordering::Release);
    }

    pub fn is_up(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpError {
    InvalidUrl,
    LinkDown,
    Connect,
    Io,
    Timeout,
    MalformedResponse,
    Status(u16),
    BodyTooLarge,
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl => write!(f, "endpoint URL is not http://host[:port]/path"),
            Self::LinkDown => write!(f, "WiFi link down"),
            Self::Connect => write!(f, "connection failed"),
            Self::Io => write!(f, "I/O error"),
            Self::Timeout => write!(f, "timed out"),
            Self::MalformedResponse => write!(f, "malformed HTTP response"),
            Self::Status(code) => write!(f, "HTTP status {}", code),
            Self::BodyTooLarge => write!(f, "body exceeds {} bytes", MAX_BODY_LEN),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Endpoint
// ───────────────────────────────────────────────────────────────

/// Parsed `http://host[:port]/path` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String<64>,
    pub port: u16,
    pub path: String<128>,
}

impl Endpoint {
    pub fn parse(url: &str) -> Result<Self, HttpError> {
        let rest = url.strip_prefix("http://").ok_or(HttpError::InvalidUrl)?;
        let (authority, path) = match rest.find('/') {
            Some(i) => rest.split_at(i),
            None => (rest, "/"),
        };
        let (host, port) = match authority.rsplit_once(':') {
            Some((h, p)) => (h, p.parse::<u16>().map_err(|_| HttpError::InvalidUrl)?),
            None => (authority, 80),
        };
        if host.is_empty() || !crate::text::is_printable_ascii(host) || host.contains(' ') {
            return Err(HttpError::InvalidUrl);
        }
        let mut h = String::new();
        h.push_str(host).map_err(|_| HttpError::InvalidUrl)?;
        let mut p = String::new();
        p.push_str(path).map_err(|_| HttpError::InvalidUrl)?;
        Ok(Self { host: h, port, path: p })
    }
}

// ───────────────────────────────────────────────────────────────
// Transport
// ───────────────────────────────────────────────────────────────

pub struct HttpDecisionTransport {
    url: String<128>,
    endpoint: Endpoint,
    link: LinkStatus,
}

impl HttpDecisionTransport {
    pub fn new(url: &str, link: LinkStatus) -> Result<Self, HttpError> {
        let endpoint = Endpoint::parse(url)?;
        let mut u = String::new();
        u.push_str(url).map_err(|_| HttpError::InvalidUrl)?;
        info!(
            "AUTHZ/http: endpoint {}:{}{}",
            endpoint.host, endpoint.port, endpoint.path
        );
        Ok(Self {
            url: u,
            endpoint,
            link,
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn fetch(&mut self, budget_ms: u32) -> Result<(u16, Vec<u8>), HttpError> {
        if !self.link.is_up() {
            return Err(HttpError::LinkDown);
        }
        platform_get(&self.url, &self.endpoint, budget_ms)
    }
}

impl AuthorizationTransport for HttpDecisionTransport {
    fn request_decision(
        &mut self,
        request: &AuthorizationRequest,
        budget_ms: u32,
    ) -> AuthorizationOutcome {
        match self.fetch(budget_ms) {
            Ok((200, body)) => {
                let outcome = outcome_from_body(&body);
                info!("AUTHZ/http: #{} -> {}", request.id, outcome.label());
                outcome
            }
            Ok((status, _)) => {
                warn!("AUTHZ/http: #{} rejected: {}", request.id, HttpError::Status(status));
                AuthorizationOutcome::NoResponse
            }
            Err(HttpError::LinkDown) => {
                debug!("AUTHZ/http: #{} skipped, link down", request.id);
                AuthorizationOutcome::NoResponse
            }
            Err(e) => {
                warn!("AUTHZ/http: #{} failed: {}", request.id, e);
                AuthorizationOutcome::NoResponse
            }
        }
    }
}

// ── Platform-specific ─────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn platform_get(url: &str, _endpoint: &Endpoint, budget_ms: u32) -> Result<(u16, Vec<u8>), HttpError> {
    use core::time::Duration;
    use esp_idf_svc::http::Method;
    use esp_idf_svc::http::client::{Configuration, EspHttpConnection};

    let config = Configuration {
        timeout: Some(Duration::from_millis(u64::from(budget_ms))),
        ..Default::default()
    };
    let mut conn = EspHttpConnection::new(&config).map_err(|_| HttpError::Connect)?;
    conn.initiate_request(Method::Get, url, &[("Accept", "application/json")])
        .map_err(|_| HttpError::Connect)?;
    conn.initiate_response().map_err(|_| HttpError::Timeout)?;
    let status = conn.status();

    let mut body = Vec::new();
    let mut buf = [0u8; 256];
    loop {
        let n = conn.read(&mut buf).map_err(|_| HttpError::Io)?;
        if n == 0 {
            break;
        }
        if body.len() + n > MAX_BODY_LEN {
            return Err(HttpError::BodyTooLarge);
        }
        body.extend_from_slice(&buf[..n]);
    }
    Ok((status, body))
}

#[cfg(not(target_os = "espidf"))]
fn platform_get(_url: &str, endpoint: &Endpoint, budget_ms: u32) -> Result<(u16, Vec<u8>), HttpError> {
    use std::io::{ErrorKind, Read, Write};
    use std::net::TcpStream;
    use std::time::{Duration, Instant};

    const MAX_RESPONSE_LEN: usize = MAX_BODY_LEN + 1024;

    let deadline = Instant::now() + Duration::from_millis(u64::from(budget_ms.max(1)));
    let remaining = || {
        deadline
            .checked_duration_since(Instant::now())
            .filter(|d| !d.is_zero())
            .ok_or(HttpError::Timeout)
    };

    let addr = resolve(&endpoint.host, endpoint.port, remaining()?)?;
    let mut stream = TcpStream::connect_timeout(&addr, remaining()?).map_err(|e| {
        if e.kind() == ErrorKind::TimedOut {
            HttpError::Timeout
        } else {
            HttpError::Connect
        }
    })?;

    stream.set_write_timeout(Some(remaining()?)).map_err(|_| HttpError::Io)?;
    let head = format!(
        "GET {} HTTP/1.0\r\nHost: {}\r\nAccept: application/json\r\nConnection: close\r\n\r\n",
        endpoint.path, endpoint.host
    );
    stream.write_all(head.as_bytes()).map_err(|_| HttpError::Io)?;

    let mut raw = Vec::new();
    let mut buf = [0u8; 256];
    loop {
        stream.set_read_timeout(Some(remaining()?)).map_err(|_| HttpError::Io)?;
        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if raw.len() + n > MAX_RESPONSE_LEN {
                    return Err(HttpError::BodyTooLarge);
                }
                raw.extend_from_slice(&buf[..n]);
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                return Err(HttpError::Timeout);
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(_) => return Err(HttpError::Io),
        }
    }
    parse_response(&raw)
}

/// Resolve `host` within `within`. IP literals skip the resolver; names are
/// looked up on a helper thread that is left behind if it overruns.
#[cfg(not(target_os = "espidf"))]
fn resolve(host: &str, port: u16, within: std::time::Duration) -> Result<std::net::SocketAddr, HttpError> {
    use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
    use std::sync::mpsc::{self, RecvTimeoutError};

    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }
    let (tx, rx) = mpsc::channel();
    let target = (host.to_owned(), port);
    std::thread::Builder::new()
        .name("dns".into())
        .spawn(move || {
            let addr = target.to_socket_addrs().ok().and_then(|mut a| a.next());
            let _ = tx.send(addr);
        })
        .map_err(|_| HttpError::Connect)?;
    match rx.recv_timeout(within) {
        Ok(Some(addr)) => Ok(addr),
        Ok(None) | Err(RecvTimeoutError::Disconnected) => Err(HttpError::Connect),
        Err(RecvTimeoutError::Timeout) => Err(HttpError::Timeout),
    }
}

/// Split a raw HTTP/1.x response into status code and body.
#[cfg(not(target_os = "espidf"))]
fn parse_response(raw: &[u8]) -> Result<(u16, Vec<u8>), HttpError> {
    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .ok_or(HttpError::MalformedResponse)?;
    let head = core::str::from_utf8(&raw[..split]).map_err(|_| HttpError::MalformedResponse)?;
    let status_line = head.lines().next().ok_or(HttpError::MalformedResponse)?;
    let mut parts = status_line.split_whitespace();
    match parts.next() {
        Some(v) if v.starts_with("HTTP/1.") => {}
        _ => return Err(HttpError::MalformedResponse),
    }
    let status = parts
        .next()
        .and_then(|c| c.parse::<u16>().ok())
        .ok_or(HttpError::MalformedResponse)?;
    let body = &raw[split + 4..];
    if body.len() > MAX_BODY_LEN {
        return Err(HttpError::BodyTooLarge);
    }
    Ok((status, body.to_vec()))
}
