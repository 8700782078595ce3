//! Mock adapters for integration tests.
//!
//! Records every actuator and presenter call so tests can assert on the
//! full command history without touching real GPIO/PWM registers.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use gatekeeper::app::events::GateEvent;
use gatekeeper::app::ports::{
    ActuatorPort, ClockPort, DecisionPort, EventSink, SensorPort, StatusPresenter, StatusScreen,
};
use gatekeeper::app::service::GateService;
use gatekeeper::authz::link::ByteLink;
use gatekeeper::authz::{AuthorizationOutcome, AuthorizationRequest};
use gatekeeper::config::GateConfig;

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    Open,
    Close,
}

// ── MockHardware ──────────────────────────────────────────────

/// Presence line plus barrier. The line idles HIGH (nothing present
/// for the default active-low sensor).
pub struct MockHardware {
    /// Raw line level, shared with the rig that drives it.
    pub level: Rc<Cell<bool>>,
    pub calls: Vec<ActuatorCall>,
    /// Number of presence reads taken before the first actuator call.
    pub reads_before_first_command: Option<usize>,
    reads: usize,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            level: Rc::new(Cell::new(true)),
            calls: Vec::new(),
            reads_before_first_command: None,
            reads: 0,
        }
    }

    pub fn barrier_open(&self) -> bool {
        self.calls.last() == Some(&ActuatorCall::Open)
    }

    pub fn opens(&self) -> usize {
        self.calls.iter().filter(|c| **c == ActuatorCall::Open).count()
    }

    fn record(&mut self, call: ActuatorCall) {
        if self.reads_before_first_command.is_none() {
            self.reads_before_first_command = Some(self.reads);
        }
        self.calls.push(call);
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for MockHardware {
    fn read_presence_level(&mut self) -> bool {
        self.reads += 1;
        self.level.get()
    }
}

impl ActuatorPort for MockHardware {
    fn command_open(&mut self) {
        self.record(ActuatorCall::Open);
    }

    fn command_close(&mut self) {
        self.record(ActuatorCall::Close);
    }
}

// ── MockPresenter ─────────────────────────────────────────────

#[derive(Default)]
pub struct MockPresenter {
    pub frames: Vec<(StatusScreen, Option<String>)>,
}

#[allow(dead_code)]
impl MockPresenter {
    pub fn last_screen(&self) -> Option<StatusScreen> {
        self.frames.last().map(|(s, _)| *s)
    }

    pub fn last_identifier(&self) -> Option<&str> {
        self.frames.last().and_then(|(_, id)| id.as_deref())
    }

    pub fn screens(&self) -> Vec<StatusScreen> {
        self.frames.iter().map(|(s, _)| *s).collect()
    }
}

impl StatusPresenter for MockPresenter {
    fn show(&mut self, screen: StatusScreen, identifier: Option<&str>) {
        self.frames.push((screen, identifier.map(str::to_owned)));
    }
}

// ── ManualClock ───────────────────────────────────────────────

/// Shared, manually advanced millisecond clock.
#[derive(Clone, Default)]
pub struct ManualClock(Rc<Cell<u32>>);

#[allow(dead_code)]
impl ManualClock {
    pub fn at(ms: u32) -> Self {
        Self(Rc::new(Cell::new(ms)))
    }

    pub fn advance(&self, ms: u32) {
        self.0.set(self.0.get().wrapping_add(ms));
    }

    pub fn set(&self, ms: u32) {
        self.0.set(ms);
    }
}

impl ClockPort for ManualClock {
    fn now_ms(&self) -> u32 {
        self.0.get()
    }
}

/// Delay that moves a [`ManualClock`] forward instead of sleeping.
pub struct ClockDelay(pub ManualClock);

impl DelayNs for ClockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.advance(ns.div_ceil(1_000_000));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.0.advance(ms);
    }
}

// ── ScriptedDecisions ─────────────────────────────────────────

/// When a scripted verdict becomes visible to `poll`.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Available right after `submit`, like inline dispatch.
    Immediate(AuthorizationOutcome),
    /// Available after this many empty polls.
    AfterPolls(u32, AuthorizationOutcome),
    /// Never arrives.
    Never,
}

pub struct ScriptedDecisions {
    script: VecDeque<Reply>,
    current: Option<Reply>,
    pub submitted: Vec<(AuthorizationRequest, u32)>,
    pub abandoned: u32,
    pub refuse: bool,
}

#[allow(dead_code)]
impl ScriptedDecisions {
    pub fn new(script: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            script: script.into_iter().collect(),
            current: None,
            submitted: Vec::new(),
            abandoned: 0,
            refuse: false,
        }
    }

    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::new([])
        }
    }
}

impl DecisionPort for ScriptedDecisions {
    fn submit(&mut self, request: AuthorizationRequest, budget_ms: u32) -> bool {
        if self.refuse {
            return false;
        }
        self.submitted.push((request, budget_ms));
        self.current = Some(self.script.pop_front().unwrap_or(Reply::Never));
        true
    }

    fn poll(&mut self) -> Option<AuthorizationOutcome> {
        match self.current.take()? {
            Reply::Immediate(outcome) | Reply::AfterPolls(0, outcome) => Some(outcome),
            Reply::AfterPolls(n, outcome) => {
                self.current = Some(Reply::AfterPolls(n - 1, outcome));
                None
            }
            Reply::Never => {
                self.current = Some(Reply::Never);
                None
            }
        }
    }

    fn abandon(&mut self) {
        self.abandoned += 1;
        self.current = None;
    }
}

// ── MemLink ───────────────────────────────────────────────────

/// In-memory byte link. Bytes in `rx` are readable now; `reply` is queued
/// for reading once a full request line has been written.
#[derive(Clone, Default)]
pub struct MemLink {
    pub rx: Rc<RefCell<VecDeque<u8>>>,
    pub tx: Rc<RefCell<Vec<u8>>>,
    pub reply: Rc<RefCell<Vec<u8>>>,
    pub failing_writes: Rc<Cell<u32>>,
    pub write_calls: Rc<Cell<u32>>,
}

#[allow(dead_code)]
impl MemLink {
    pub fn replying(reply: &[u8]) -> Self {
        let link = Self::default();
        link.reply.borrow_mut().extend_from_slice(reply);
        link
    }

    pub fn with_stale(self, stale: &[u8]) -> Self {
        self.rx.borrow_mut().extend(stale.iter().copied());
        self
    }

    pub fn failing(self, writes: u32) -> Self {
        self.failing_writes.set(writes);
        self
    }
}

impl ByteLink for MemLink {
    type Error = ();

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ()> {
        let mut rx = self.rx.borrow_mut();
        let n = buf.len().min(rx.len());
        for slot in buf.iter_mut().take(n) {
            *slot = rx.pop_front().unwrap_or_default();
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, ()> {
        self.write_calls.set(self.write_calls.get() + 1);
        if self.failing_writes.get() > 0 {
            self.failing_writes.set(self.failing_writes.get() - 1);
            return Err(());
        }
        self.tx.borrow_mut().extend_from_slice(data);
        let reply: Vec<u8> = self.reply.borrow_mut().drain(..).collect();
        self.rx.borrow_mut().extend(reply);
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), ()> {
        Ok(())
    }

    fn available(&self) -> bool {
        !self.rx.borrow().is_empty()
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<GateEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&GateEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(*e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &GateEvent) {
        self.events.push(event.clone());
    }
}

// ── Rig ───────────────────────────────────────────────────────

pub type TestGate<D> = GateService<MockHardware, MockPresenter, D, ManualClock>;

/// A started gate service on a manual clock.
pub struct Rig<D: DecisionPort> {
    pub app: TestGate<D>,
    pub clock: ManualClock,
    pub sink: RecordingSink,
    line: Rc<Cell<bool>>,
}

#[allow(dead_code)]
impl<D: DecisionPort> Rig<D> {
    pub fn start(config: GateConfig, decisions: D) -> Self {
        Self::start_on(config, decisions, ManualClock::at(1_000), true)
    }

    /// Start with a vehicle already in front of the (active-low) sensor.
    pub fn start_present(config: GateConfig, decisions: D) -> Self {
        Self::start_on(config, decisions, ManualClock::at(1_000), false)
    }

    pub fn start_on(config: GateConfig, decisions: D, clock: ManualClock, level: bool) -> Self {
        let hw = MockHardware::new();
        let line = hw.level.clone();
        line.set(level);
        let mut app = GateService::new(
            config,
            hw,
            MockPresenter::default(),
            decisions,
            clock.clone(),
        );
        let mut sink = RecordingSink::default();
        app.start(&mut sink);
        Self { app, clock, sink, line }
    }

    /// Set the raw line level (active-low: `false` = vehicle present).
    pub fn set_level(&mut self, level: bool) {
        self.line.set(level);
    }

    pub fn tick(&mut self) {
        self.app.tick(&mut self.sink);
    }

    /// Advance the clock by `step_ms` and tick, `n` times.
    pub fn run(&mut self, n: u32, step_ms: u32) {
        for _ in 0..n {
            self.clock.advance(step_ms);
            self.tick();
        }
    }

    /// Vehicle arrives and the debounce window elapses.
    pub fn arrive(&mut self) {
        self.set_level(false);
        self.tick();
        self.run(6, 10);
    }

    /// Vehicle leaves and the debounce window elapses.
    pub fn leave(&mut self) {
        self.set_level(true);
        self.tick();
        self.run(6, 10);
    }
}
