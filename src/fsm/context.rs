//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the "blackboard" the gate state handlers read from and
//! write to. The service fills the tick inputs (time, debounced presence,
//! edge, decision outcome) before each tick and applies the output
//! commands after it.

use crate::app::ports::StatusScreen;
use crate::authz::{AuthorizationOutcome, AuthorizationRequest, Identifier};
use crate::config::GateConfig;
use crate::sensors::debounce::PresenceEdge;

// ---------------------------------------------------------------------------
// Deadline
// ---------------------------------------------------------------------------

/// Response window of one authorization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    pub started_ms: u32,
    pub window_ms: u32,
}

impl Deadline {
    pub fn elapsed(&self, now_ms: u32) -> u32 {
        now_ms.wrapping_sub(self.started_ms)
    }

    pub fn expired(&self, now_ms: u32) -> bool {
        self.elapsed(now_ms) >= self.window_ms
    }

    /// Time left before expiry, 0 once expired.
    pub fn remaining(&self, now_ms: u32) -> u32 {
        self.window_ms.saturating_sub(self.elapsed(now_ms))
    }
}

// ---------------------------------------------------------------------------
// Decision bookkeeping (written by AwaitingDecision, drained by the service)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionResolution {
    Resolved {
        request_id: u32,
        outcome: AuthorizationOutcome,
        elapsed_ms: u32,
    },
    TimedOut {
        request_id: u32,
    },
}

// ---------------------------------------------------------------------------
// Output commands (written by state handlers; applied by the service)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Barrier {
    Closed,
    Open,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateCommands {
    pub barrier: Barrier,
    pub screen: StatusScreen,
    /// Shown under ACCEPT / DENY when known.
    pub identifier: Option<Identifier>,
}

impl Default for GateCommands {
    fn default() -> Self {
        Self {
            barrier: Barrier::Closed,
            screen: StatusScreen::Welcome,
            identifier: None,
        }
    }
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

pub struct FsmContext {
    // -- Timing --
    /// Uptime at the start of this tick (milliseconds, wrapping).
    pub now_ms: u32,
    /// Uptime at which the current state was entered.
    pub state_entered_ms: u32,
    /// Ticks elapsed since the current state was entered.
    pub ticks_in_state: u64,

    // -- Tick inputs --
    /// Debounced presence.
    pub present: bool,
    /// Edge committed by the debouncer this tick.
    pub edge: Option<PresenceEdge>,
    /// Verdict for the open request, delivered by the dispatcher.
    pub outcome: Option<AuthorizationOutcome>,

    // -- Authorization --
    /// Request currently awaiting a verdict.
    pub request: Option<AuthorizationRequest>,
    pub deadline: Option<Deadline>,
    /// Set on entering AwaitingDecision; cleared by the service once the
    /// request has been handed to the dispatcher.
    pub dispatch_pending: bool,
    /// How the last request ended, for event reporting.
    pub resolution: Option<DecisionResolution>,
    /// A vehicle arrived while the barrier was still closing.
    pub deferred_arrival: bool,
    next_request_id: u32,

    // -- Outputs --
    pub commands: GateCommands,

    // -- Configuration --
    pub config: GateConfig,
}

impl FsmContext {
    pub fn new(config: GateConfig) -> Self {
        Self {
            now_ms: 0,
            state_entered_ms: 0,
            ticks_in_state: 0,
            present: false,
            edge: None,
            outcome: None,
            request: None,
            deadline: None,
            dispatch_pending: false,
            resolution: None,
            deferred_arrival: false,
            next_request_id: 1,
            commands: GateCommands::default(),
            config,
        }
    }

    /// Milliseconds since the current state was entered.
    pub fn ms_in_state(&self) -> u32 {
        self.now_ms.wrapping_sub(self.state_entered_ms)
    }

    /// Allocate the next request id.
    pub fn issue_request(&mut self) -> AuthorizationRequest {
        let id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        AuthorizationRequest {
            id,
            issued_at_ms: self.now_ms,
        }
    }
}
