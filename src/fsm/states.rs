//! Concrete state handler functions and table builder.
//!
//! ```text
//!  IDLE ──[presence asserted]──▶ AWAITING_DECISION
//!    ▲                               │      │
//!    │         [denied / no response / deadline]
//!    ├───────────────────────────────┘      │
//!    │                                 [granted]
//!    │                                      ▼
//!    └──[settle elapsed]── CLOSING ◀──[cleared]── OPEN
//! ```
//!
//! The barrier is open in `Open` and closed everywhere else.

use log::{debug, info, warn};

use super::context::{Barrier, DecisionResolution, Deadline, FsmContext};
use super::{StateDescriptor, StateId};
use crate::app::ports::StatusScreen;
use crate::authz::AuthorizationOutcome;
use crate::sensors::debounce::PresenceEdge;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table. Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0 — Idle
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        // Index 1 — AwaitingDecision
        StateDescriptor {
            id: StateId::AwaitingDecision,
            name: "AwaitingDecision",
            on_enter: Some(awaiting_enter),
            on_exit: Some(awaiting_exit),
            on_update: awaiting_update,
        },
        // Index 2 — Open
        StateDescriptor {
            id: StateId::Open,
            name: "Open",
            on_enter: Some(open_enter),
            on_exit: None,
            on_update: open_update,
        },
        // Index 3 — Closing
        StateDescriptor {
            id: StateId::Closing,
            name: "Closing",
            on_enter: Some(closing_enter),
            on_exit: None,
            on_update: closing_update,
        },
    ]
}

/// Every screen but Accept is shown without an identifier.
fn show(ctx: &mut FsmContext, screen: StatusScreen) {
    ctx.commands.screen = screen;
    ctx.commands.identifier = None;
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE state
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut FsmContext) {
    ctx.commands.barrier = Barrier::Closed;
    // A verdict screen stays up until the vehicle leaves.
    if !matches!(ctx.commands.screen, StatusScreen::Deny | StatusScreen::Timeout) {
        show(ctx, StatusScreen::Welcome);
    }
}

fn idle_update(ctx: &mut FsmContext) -> Option<StateId> {
    match ctx.edge {
        Some(PresenceEdge::Asserted) => Some(StateId::AwaitingDecision),
        Some(PresenceEdge::Cleared) => {
            if ctx.commands.screen != StatusScreen::Welcome {
                show(ctx, StatusScreen::Welcome);
            }
            None
        }
        None if ctx.deferred_arrival => {
            ctx.deferred_arrival = false;
            if ctx.present {
                info!("FSM: serving vehicle that arrived while closing");
                Some(StateId::AwaitingDecision)
            } else {
                None
            }
        }
        None => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  AWAITING_DECISION state
// ═══════════════════════════════════════════════════════════════════════════

fn awaiting_enter(ctx: &mut FsmContext) {
    let request = ctx.issue_request();
    ctx.request = Some(request);
    ctx.deadline = Some(Deadline {
        started_ms: ctx.now_ms,
        window_ms: ctx.config.response_window_ms,
    });
    ctx.dispatch_pending = true;
    ctx.outcome = None;
    ctx.deferred_arrival = false;
    ctx.commands.barrier = Barrier::Closed;
    show(ctx, StatusScreen::Checking);
    info!("FSM: vehicle detected, request #{}", request.id);
}

fn awaiting_exit(ctx: &mut FsmContext) {
    ctx.request = None;
    ctx.deadline = None;
    ctx.dispatch_pending = false;
    ctx.outcome = None;
}

fn awaiting_update(ctx: &mut FsmContext) -> Option<StateId> {
    let (Some(request), Some(deadline)) = (ctx.request, ctx.deadline) else {
        warn!("FSM: awaiting decision without a request, closing");
        return Some(StateId::Idle);
    };

    if let Some(edge) = ctx.edge {
        debug!("FSM: {:?} ignored while request #{} is open", edge, request.id);
    }

    let expired = deadline.expired(ctx.now_ms);
    match ctx.outcome.take() {
        Some(outcome) if !expired => {
            ctx.resolution = Some(DecisionResolution::Resolved {
                request_id: request.id,
                outcome: outcome.clone(),
                elapsed_ms: deadline.elapsed(ctx.now_ms),
            });
            match outcome {
                AuthorizationOutcome::Granted(identifier) => {
                    ctx.commands.screen = StatusScreen::Accept;
                    ctx.commands.identifier = identifier;
                    Some(StateId::Open)
                }
                AuthorizationOutcome::Denied | AuthorizationOutcome::NoResponse => {
                    show(ctx, StatusScreen::Deny);
                    Some(StateId::Idle)
                }
            }
        }
        late if expired => {
            if let Some(o) = late {
                warn!("FSM: {} for #{} arrived after the window", o.label(), request.id);
            }
            ctx.resolution = Some(DecisionResolution::TimedOut {
                request_id: request.id,
            });
            show(ctx, StatusScreen::Timeout);
            Some(StateId::Idle)
        }
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  OPEN state
// ═══════════════════════════════════════════════════════════════════════════

fn open_enter(ctx: &mut FsmContext) {
    ctx.commands.barrier = Barrier::Open;
}

fn open_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.edge == Some(PresenceEdge::Cleared) || !ctx.present {
        return Some(StateId::Closing);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  CLOSING state
// ═══════════════════════════════════════════════════════════════════════════

fn closing_enter(ctx: &mut FsmContext) {
    ctx.commands.barrier = Barrier::Closed;
    show(ctx, StatusScreen::Closing);
}

fn closing_update(ctx: &mut FsmContext) -> Option<StateId> {
    match ctx.edge {
        Some(PresenceEdge::Asserted) => ctx.deferred_arrival = true,
        Some(PresenceEdge::Cleared) => ctx.deferred_arrival = false,
        None => {}
    }
    if ctx.ms_in_state() >= ctx.config.close_settle_ms {
        return Some(StateId::Idle);
    }
    None
}
