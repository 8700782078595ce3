//! Outbound gate events.
//!
//! The [`GateService`](super::service::GateService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.

use crate::authz::AuthorizationOutcome;
use crate::fsm::StateId;
use crate::sensors::debounce::PresenceEdge;

#[derive(Debug, Clone, PartialEq)]
pub enum GateEvent {
    /// The service has started (carries the initial phase).
    Started(StateId),

    /// The state machine moved between phases.
    PhaseChanged { from: StateId, to: StateId },

    /// The debounced presence signal changed.
    PresenceChanged(PresenceEdge),

    /// An authorization request was handed to the dispatcher.
    DecisionRequested { request_id: u32 },

    /// The dispatcher refused the request; treated as no response.
    DecisionRefused { request_id: u32 },

    /// A verdict arrived within the response window.
    DecisionResolved {
        request_id: u32,
        outcome: AuthorizationOutcome,
        elapsed_ms: u32,
    },

    /// The response window closed without a verdict.
    DecisionTimedOut { request_id: u32 },
}
