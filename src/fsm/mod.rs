//! Function-pointer finite state machine engine.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  StateTable                                                      │
//! │  ┌──────────────────┬──────────┬──────────┬───────────────────┐  │
//! │  │ StateId          │ on_enter │ on_exit  │ on_update         │  │
//! │  ├──────────────────┼──────────┼──────────┼───────────────────┤  │
//! │  │ Idle             │ fn(ctx)  │    -     │ fn(ctx)->Option<> │  │
//! │  │ AwaitingDecision │ fn(ctx)  │ fn(ctx)  │ fn(ctx)->Option<> │  │
//! │  │ Open             │ fn(ctx)  │    -     │ fn(ctx)->Option<> │  │
//! │  │ Closing          │ fn(ctx)  │    -     │ fn(ctx)->Option<> │  │
//! │  └──────────────────┴──────────┴──────────┴───────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state.
//! If it returns `Some(next_id)`, the engine runs `on_exit` for the
//! current state, then `on_enter` for the next, and updates the
//! current pointer. All functions receive `&mut FsmContext`, which holds
//! the tick's inputs (time, presence edge, decision outcome), the open
//! request, and the output commands.

pub mod context;
pub mod states;

use context::FsmContext;
use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Gate phases. Must stay in sync with [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Idle = 0,
    AwaitingDecision = 1,
    Open = 2,
    Closing = 3,
}

impl StateId {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 4;

    /// Convert an index back to `StateId`. Out-of-range indices trip a
    /// debug assertion and fall back to `Idle` (barrier closed).
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::AwaitingDecision,
            2 => Self::Open,
            3 => Self::Closing,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Idle
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut FsmContext);

/// Per-tick handler. Returns `Some(next)` to trigger a transition.
pub type StateUpdateFn = fn(&mut FsmContext) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Row `i` of a table must carry the `StateId` whose discriminant is `i`.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    current: usize,
    tick_count: u64,
    state_entry_tick: u64,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        for (idx, row) in table.iter().enumerate() {
            debug_assert_eq!(row.id as usize, idx, "state table row {} is {}", idx, row.name);
        }
        Self {
            table,
            current: initial as usize,
            tick_count: 0,
            state_entry_tick: 0,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut FsmContext) {
        info!("FSM starting in state: {}", self.table[self.current].name);
        ctx.state_entered_ms = ctx.now_ms;
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the FSM by one tick. Returns the transition taken, if any.
    pub fn tick(&mut self, ctx: &mut FsmContext) -> Option<(StateId, StateId)> {
        self.tick_count += 1;
        ctx.ticks_in_state = self.tick_count - self.state_entry_tick;

        let from = self.current_state();
        let next = (self.table[self.current].on_update)(ctx)?;
        self.transition(next, ctx);
        Some((from, next))
    }

    /// Jump straight to `next`, running exit/enter actions.
    pub fn force_transition(&mut self, next: StateId, ctx: &mut FsmContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    pub fn ticks_in_current_state(&self) -> u64 {
        self.tick_count - self.state_entry_tick
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: StateId, ctx: &mut FsmContext) {
        let next_idx = next_id as usize;

        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.state_entry_tick = self.tick_count;
        ctx.ticks_in_state = 0;
        ctx.state_entered_ms = ctx.now_ms;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}


#[cfg(all(test, not(target_os = "espidf")))]
mod proptests {
    use super::context::{Barrier, FsmContext};
    use super::*;
    use crate::authz::AuthorizationOutcome;
    use crate::config::GateConfig;
    use crate::sensors::debounce::PresenceEdge;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Input {
        Edge(PresenceEdge),
        Outcome(u8),
        Advance(u32),
    }

    fn arb_input() -> impl Strategy<Value = Input> {
        prop_oneof![
            prop_oneof![Just(PresenceEdge::Asserted), Just(PresenceEdge::Cleared)].prop_map(Input::Edge),
            (0u8..3).prop_map(Input::Outcome),
            (0u32..3000).prop_map(Input::Advance),
        ]
    }

    proptest! {
        #[test]
        fn barrier_follows_phase(inputs in proptest::collection::vec(arb_input(), 1..200)) {
            let mut fsm = Fsm::new(states::build_state_table(), StateId::Idle);
            let mut ctx = FsmContext::new(GateConfig::default());
            fsm.start(&mut ctx);
            let mut last_outcome_granted = false;

            for input in inputs {
                match input {
                    Input::Edge(e) => {
                        ctx.present = e == PresenceEdge::Asserted;
                        ctx.edge = Some(e);
                    }
                    Input::Outcome(k) => {
                        let o = match k {
                            0 => AuthorizationOutcome::Granted(None),
                            1 => AuthorizationOutcome::Denied,
                            _ => AuthorizationOutcome::NoResponse,
                        };
                        last_outcome_granted = o.is_granted();
                        ctx.outcome = Some(o);
                    }
                    Input::Advance(ms) => ctx.now_ms = ctx.now_ms.wrapping_add(ms),
                }
                let before = fsm.current_state();
                fsm.tick(&mut ctx);
                ctx.edge = None;
                ctx.outcome = None;

                let state = fsm.current_state();
                let expected = if state == StateId::Open { Barrier::Open } else { Barrier::Closed };
                prop_assert_eq!(ctx.commands.barrier, expected);
                if before == StateId::AwaitingDecision && state == StateId::Open {
                    prop_assert!(last_outcome_granted);
                }
                if state == StateId::AwaitingDecision {
                    let d = ctx.deadline.unwrap();
                    prop_assert!(ctx.now_ms.wrapping_sub(d.started_ms) < d.window_ms);
                }
            }
        }
    }
}
