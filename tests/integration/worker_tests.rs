//! Worker dispatch end to end: the control loop keeps ticking while the
//! transport runs on its own thread.

use std::sync::mpsc;
use std::time::{Duration, Instant};

use gatekeeper::app::events::GateEvent;
use gatekeeper::app::ports::StatusScreen;
use gatekeeper::authz::dispatch::WorkerDecisions;
use gatekeeper::authz::{AuthorizationOutcome, AuthorizationRequest, AuthorizationTransport};
use gatekeeper::config::GateConfig;
use gatekeeper::fsm::StateId;

use super::mock_hw::Rig;

/// Blocks each request until the test releases it.
struct Gated(mpsc::Receiver<AuthorizationOutcome>);

impl AuthorizationTransport for Gated {
    fn request_decision(&mut self, _r: &AuthorizationRequest, _b: u32) -> AuthorizationOutcome {
        self.0.recv().unwrap_or(AuthorizationOutcome::NoResponse)
    }
}

fn rig() -> (Rig<WorkerDecisions>, mpsc::Sender<AuthorizationOutcome>) {
    let (tx, rx) = mpsc::channel();
    let decisions = WorkerDecisions::spawn(Gated(rx)).unwrap();
    (Rig::start(GateConfig::default(), decisions), tx)
}

/// Tick on a frozen manual clock until `phase` is reached.
fn tick_until(r: &mut Rig<WorkerDecisions>, phase: StateId) -> bool {
    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(2) {
        r.tick();
        if r.app.phase() == phase {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    false
}

#[test]
fn loop_keeps_ticking_while_request_pending() {
    let (mut r, tx) = rig();
    r.arrive();
    assert_eq!(r.app.phase(), StateId::AwaitingDecision);
    assert_eq!(r.app.presenter().last_screen(), Some(StatusScreen::Checking));

    let ticks = r.app.tick_count();
    r.run(10, 10);
    assert_eq!(r.app.tick_count(), ticks + 10);
    assert_eq!(r.app.phase(), StateId::AwaitingDecision);

    tx.send(AuthorizationOutcome::Granted(None)).unwrap();
    assert!(tick_until(&mut r, StateId::Open));
    assert!(r.app.hw().barrier_open());
}

#[test]
fn late_grant_after_timeout_never_opens() {
    let (mut r, tx) = rig();
    r.arrive();
    r.clock.advance(5_000);
    r.tick();
    assert_eq!(r.app.phase(), StateId::Idle);
    assert_eq!(r.app.presenter().last_screen(), Some(StatusScreen::Timeout));

    // #1 answers long after the window closed.
    tx.send(AuthorizationOutcome::Granted(None)).unwrap();
    std::thread::sleep(Duration::from_millis(20));
    r.run(5, 10);
    assert_eq!(r.app.hw().opens(), 0);

    // Next vehicle gets its own verdict.
    r.leave();
    r.arrive();
    assert_eq!(r.app.open_request_id(), Some(2));
    tx.send(AuthorizationOutcome::Denied).unwrap();
    assert!(tick_until(&mut r, StateId::Idle));
    assert_eq!(r.app.hw().opens(), 0);
    assert_eq!(
        r.sink.count(|e| matches!(
            e,
            GateEvent::DecisionResolved {
                request_id: 2,
                outcome: AuthorizationOutcome::Denied,
                ..
            }
        )),
        1
    );
}
