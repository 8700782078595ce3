//! Remote authorization: the decision contract and its realizations.
//!
//! ```text
//!  GateService ──▶ DecisionPort ──▶ AuthorizationTransport
//!                  (dispatch)        ├─ HttpDecisionTransport   (WiFi)
//!                                    └─ SerialDecisionTransport (UART)
//! ```
//!
//! A transport never reports an error to its caller. Every failure below
//! the contract (link down, timeout, malformed reply) collapses into
//! [`AuthorizationOutcome::NoResponse`], which the state machine treats
//! as a denial.

pub mod dispatch;
pub mod http;
pub mod link;
pub mod response;
pub mod serial;

use heapless::String;

/// Identifier returned with a grant (licence plate, badge id, ...).
pub type Identifier = String<32>;

/// One presence event awaiting a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizationRequest {
    /// Monotonic sequence number; replies for older ids are discarded.
    pub id: u32,
    /// Uptime at which the request was issued (milliseconds).
    pub issued_at_ms: u32,
}

/// Tri-state verdict of the remote authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    Granted(Option<Identifier>),
    Denied,
    NoResponse,
}

impl AuthorizationOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }

    /// Short tag for log lines.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Granted(_) => "granted",
            Self::Denied => "denied",
            Self::NoResponse => "no-response",
        }
    }
}

/// Asks the remote authority whether passage is permitted.
///
/// Implementations must return within roughly `budget_ms` and must map
/// every failure to [`AuthorizationOutcome::NoResponse`].
pub trait AuthorizationTransport {
    fn request_decision(
        &mut self,
        request: &AuthorizationRequest,
        budget_ms: u32,
    ) -> AuthorizationOutcome;
}

impl<T: AuthorizationTransport + ?Sized> AuthorizationTransport for Box<T> {
    fn request_decision(
        &mut self,
        request: &AuthorizationRequest,
        budget_ms: u32,
    ) -> AuthorizationOutcome {
        (**self).request_decision(request, budget_ms)
    }
}
