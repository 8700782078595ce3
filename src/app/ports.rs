//! Port traits — the hexagonal boundary between gate logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ GateService (domain)
//! ```
//!
//! Driven adapters (sensor, servo, display, clock, authorization dispatch,
//! event sinks) implement these traits. [`GateService`](super::service::GateService)
//! receives them at construction, so the domain core never touches
//! hardware directly and tests substitute fakes.
//!
//! None of these calls can fail from the core's point of view: adapters
//! absorb their own errors and degrade to a no-op.

use crate::authz::{AuthorizationOutcome, AuthorizationRequest};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

pub trait SensorPort {
    /// Raw electrical level of the presence line, `true` = HIGH.
    fn read_presence_level(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Barrier position commands. Idempotent, fire-and-forget.
pub trait ActuatorPort {
    fn command_open(&mut self);
    fn command_close(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Status presenter (driven adapter: domain → human)
// ───────────────────────────────────────────────────────────────

/// Screens shown to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusScreen {
    Welcome,
    Checking,
    Accept,
    Deny,
    Timeout,
    Closing,
}

impl StatusScreen {
    /// Fixed text lines. Only [`Accept`](Self::Accept) is followed by an
    /// identifier, when the authority supplied one.
    pub fn lines(self) -> &'static [&'static str] {
        match self {
            Self::Welcome => &["Welcome"],
            Self::Checking => &["CAR", "", "checking"],
            Self::Accept => &["ACCEPT", ""],
            Self::Deny => &["DENY", ""],
            Self::Timeout => &["Timeout"],
            Self::Closing => &["Closing"],
        }
    }
}

/// Best-effort status rendering. Must not block.
pub trait StatusPresenter {
    fn show(&mut self, screen: StatusScreen, identifier: Option<&str>);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic milliseconds since boot, wrapping at `u32::MAX`.
pub trait ClockPort {
    fn now_ms(&self) -> u32;
}

// ───────────────────────────────────────────────────────────────
// Decision port (authorization dispatch)
// ───────────────────────────────────────────────────────────────

/// Runs an [`AuthorizationTransport`](crate::authz::AuthorizationTransport)
/// on behalf of the service, inline or on a worker.
pub trait DecisionPort {
    /// Start resolving `request`. `false` means the request was refused
    /// (a previous one is still being resolved).
    fn submit(&mut self, request: AuthorizationRequest, budget_ms: u32) -> bool;

    /// Outcome of the submitted request, once available. Outcomes for
    /// abandoned requests are never returned.
    fn poll(&mut self) -> Option<AuthorizationOutcome>;

    /// Forget the in-flight request.
    fn abandon(&mut self);
}

impl<D: DecisionPort + ?Sized> DecisionPort for Box<D> {
    fn submit(&mut self, request: AuthorizationRequest, budget_ms: u32) -> bool {
        (**self).submit(request, budget_ms)
    }

    fn poll(&mut self) -> Option<AuthorizationOutcome> {
        (**self).poll()
    }

    fn abandon(&mut self) {
        (**self).abandon();
    }
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`GateEvent`](super::events::GateEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::GateEvent);
}
