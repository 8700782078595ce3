//! Application service — the hexagonal core.
//!
//! [`GateService`] owns the debouncer, the FSM and its context, and every
//! port it talks to. Ports are injected at construction so the whole
//! service runs against mock adapters in tests.
//!
//! ```text
//!  SensorPort ──▶ ┌──────────────────────────┐ ──▶ ActuatorPort
//!   ClockPort ──▶ │       GateService        │ ──▶ StatusPresenter
//!                 │  Debouncer · FSM         │ ──▶ EventSink
//! DecisionPort ◀─▶└──────────────────────────┘
//! ```
//!
//! One call to [`tick`](GateService::tick) is one control-loop iteration:
//! clock → sensor → debouncer → (decision poll) → FSM → outputs. The
//! actuator is always commanded closed in [`start`](GateService::start)
//! before the first sample is taken.

use log::{info, warn};

use crate::authz::{AuthorizationOutcome, Identifier};
use crate::config::GateConfig;
use crate::fsm::context::{Barrier, DecisionResolution, FsmContext, GateCommands};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::sensors::debounce::PresenceDebouncer;

use super::events::GateEvent;
use super::ports::{
    ActuatorPort, ClockPort, DecisionPort, EventSink, SensorPort, StatusPresenter, StatusScreen,
};

// ───────────────────────────────────────────────────────────────
// GateService
// ───────────────────────────────────────────────────────────────

pub struct GateService<H, P, D, C> {
    /// Presence input and barrier actuator.
    hw: H,
    presenter: P,
    decisions: D,
    clock: C,

    debouncer: PresenceDebouncer,
    fsm: Fsm,
    ctx: FsmContext,

    /// Last barrier command sent to the actuator.
    applied_barrier: Option<Barrier>,
    /// Last frame sent to the presenter.
    applied_screen: Option<(StatusScreen, Option<Identifier>)>,
    tick_count: u64,
}

impl<H, P, D, C> GateService<H, P, D, C>
where
    H: SensorPort + ActuatorPort,
    P: StatusPresenter,
    D: DecisionPort,
    C: ClockPort,
{
    /// Construct the service. Does **not** touch any port; call
    /// [`start`](Self::start) next.
    pub fn new(config: GateConfig, hw: H, presenter: P, decisions: D, clock: C) -> Self {
        let debouncer = PresenceDebouncer::new(config.debounce_ms, config.sensor_active_high);
        Self {
            hw,
            presenter,
            decisions,
            clock,
            debouncer,
            fsm: Fsm::new(build_state_table(), StateId::Idle),
            ctx: FsmContext::new(config),
            applied_barrier: None,
            applied_screen: None,
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Close the barrier, prime the debouncer from the current line level,
    /// and enter `Idle`.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.hw.command_close();
        self.applied_barrier = Some(Barrier::Closed);

        let now = self.clock.now_ms();
        let raw = self.hw.read_presence_level();
        self.debouncer = PresenceDebouncer::primed(
            self.ctx.config.debounce_ms,
            self.ctx.config.sensor_active_high,
            raw,
            now,
        );
        self.ctx.now_ms = now;
        self.ctx.present = self.debouncer.is_present();

        self.fsm.start(&mut self.ctx);
        self.apply_outputs();
        sink.emit(&GateEvent::Started(self.fsm.current_state()));
        info!(
            "GateService started in {:?} (presence={})",
            self.fsm.current_state(),
            self.ctx.present
        );
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control-loop iteration.
    pub fn tick(&mut self, sink: &mut impl EventSink) {
        self.tick_count += 1;

        // 1. Time and presence
        self.ctx.now_ms = self.clock.now_ms();
        let raw = self.hw.read_presence_level();
        self.ctx.edge = self.debouncer.sample(raw, self.ctx.now_ms);
        self.ctx.present = self.debouncer.is_present();
        if let Some(edge) = self.ctx.edge {
            sink.emit(&GateEvent::PresenceChanged(edge));
        }

        // 2. Collect a verdict from the dispatcher
        if self.fsm.current_state() == StateId::AwaitingDecision && self.ctx.outcome.is_none() {
            self.ctx.outcome = self.decisions.poll();
        }

        // 3. State machine, dispatch, outputs
        self.step(sink);
        self.ctx.edge = None;
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn phase(&self) -> StateId {
        self.fsm.current_state()
    }

    /// Debounced presence.
    pub fn is_present(&self) -> bool {
        self.ctx.present
    }

    /// Output commands of the current phase.
    pub fn commands(&self) -> &GateCommands {
        &self.ctx.commands
    }

    /// Id of the request awaiting a verdict, if any.
    pub fn open_request_id(&self) -> Option<u32> {
        self.ctx.request.map(|r| r.id)
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn config(&self) -> &GateConfig {
        &self.ctx.config
    }

    pub fn hw(&self) -> &H {
        &self.hw
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn decisions_mut(&mut self) -> &mut D {
        &mut self.decisions
    }

    // ── Internal ──────────────────────────────────────────────

    fn step(&mut self, sink: &mut impl EventSink) {
        let transition = self.fsm.tick(&mut self.ctx);
        self.report_resolution(sink);
        if let Some((from, to)) = transition {
            sink.emit(&GateEvent::PhaseChanged { from, to });
        }
        self.apply_outputs();

        if self.ctx.dispatch_pending {
            self.dispatch(sink);
        }
    }

    /// Hand the freshly issued request to the dispatcher. The "checking"
    /// screen is already up, since inline dispatch blocks right here.
    fn dispatch(&mut self, sink: &mut impl EventSink) {
        self.ctx.dispatch_pending = false;
        let (Some(request), Some(deadline)) = (self.ctx.request, self.ctx.deadline) else {
            return;
        };
        let budget_ms = deadline.remaining(self.ctx.now_ms);

        sink.emit(&GateEvent::DecisionRequested {
            request_id: request.id,
        });
        if self.decisions.submit(request, budget_ms) {
            self.ctx.outcome = self.decisions.poll();
        } else {
            warn!("GateService: request #{} refused by dispatcher", request.id);
            sink.emit(&GateEvent::DecisionRefused {
                request_id: request.id,
            });
            self.ctx.outcome = Some(AuthorizationOutcome::NoResponse);
        }

        // Inline dispatch (or refusal) already has a verdict: settle it in
        // this iteration with a fresh timestamp.
        if self.ctx.outcome.is_some() {
            self.ctx.now_ms = self.clock.now_ms();
            self.ctx.edge = None;
            self.step(sink);
        }
    }

    fn report_resolution(&mut self, sink: &mut impl EventSink) {
        match self.ctx.resolution.take() {
            Some(DecisionResolution::Resolved {
                request_id,
                outcome,
                elapsed_ms,
            }) => sink.emit(&GateEvent::DecisionResolved {
                request_id,
                outcome,
                elapsed_ms,
            }),
            Some(DecisionResolution::TimedOut { request_id }) => {
                self.decisions.abandon();
                sink.emit(&GateEvent::DecisionTimedOut { request_id });
            }
            None => {}
        }
    }

    /// Push changed commands to the actuator and presenter.
    fn apply_outputs(&mut self) {
        let cmds = &self.ctx.commands;

        if self.applied_barrier != Some(cmds.barrier) {
            match cmds.barrier {
                Barrier::Open => self.hw.command_open(),
                Barrier::Closed => self.hw.command_close(),
            }
            self.applied_barrier = Some(cmds.barrier);
        }

        let frame = (cmds.screen, cmds.identifier.clone());
        if self.applied_screen.as_ref() != Some(&frame) {
            self.presenter.show(frame.0, frame.1.as_deref());
            self.applied_screen = Some(frame);
        }
    }
}
