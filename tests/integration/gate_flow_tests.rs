//! Integration tests for the GateService → FSM → actuator/presenter pipeline.
//!
//! Verdicts come from [`ScriptedDecisions`]; presence comes from the mock
//! line level, debounced exactly as on the board.

use gatekeeper::app::events::GateEvent;
use gatekeeper::app::ports::StatusScreen;
use gatekeeper::authz::{AuthorizationOutcome, Identifier};
use gatekeeper::config::GateConfig;
use gatekeeper::fsm::StateId;
use gatekeeper::sensors::debounce::PresenceEdge;

use super::mock_hw::{ActuatorCall, Reply, Rig, ScriptedDecisions};

fn plate(s: &str) -> Option<Identifier> {
    Some(Identifier::try_from(s).unwrap())
}

fn rig(script: impl IntoIterator<Item = Reply>) -> Rig<ScriptedDecisions> {
    Rig::start(GateConfig::default(), ScriptedDecisions::new(script))
}

// ── Fail-safe start ───────────────────────────────────────────

#[test]
fn barrier_closed_before_presence_is_read() {
    let r = rig([]);
    let hw = r.app.hw();
    assert_eq!(hw.calls.first(), Some(&ActuatorCall::Close));
    assert_eq!(hw.reads_before_first_command, Some(0));
    assert_eq!(r.app.presenter().screens(), vec![StatusScreen::Welcome]);
    assert_eq!(r.sink.events, vec![GateEvent::Started(StateId::Idle)]);
}

#[test]
fn vehicle_present_at_boot_does_not_trigger() {
    let mut r = Rig::start_present(
        GateConfig::default(),
        ScriptedDecisions::new([Reply::Immediate(AuthorizationOutcome::Granted(None))]),
    );
    assert!(r.app.is_present());
    r.run(20, 10);
    assert!(r.app.decisions_mut().submitted.is_empty());
    assert_eq!(r.app.hw().opens(), 0);

    // Leaving and coming back is a genuine arrival.
    r.leave();
    r.arrive();
    assert_eq!(r.app.decisions_mut().submitted.len(), 1);
    assert_eq!(r.app.phase(), StateId::Open);
}

// ── Grant path ────────────────────────────────────────────────

#[test]
fn grant_opens_then_departure_closes() {
    let mut r = rig([Reply::Immediate(AuthorizationOutcome::Granted(plate("ABC123")))]);

    r.arrive();
    assert_eq!(r.app.phase(), StateId::Open);
    assert!(r.app.hw().barrier_open());
    assert_eq!(r.app.presenter().last_screen(), Some(StatusScreen::Accept));
    assert_eq!(r.app.presenter().last_identifier(), Some("ABC123"));

    r.leave();
    assert_eq!(r.app.phase(), StateId::Closing);
    assert_eq!(r.app.hw().calls.last(), Some(&ActuatorCall::Close));

    r.run(50, 10);
    assert_eq!(r.app.phase(), StateId::Idle);
    assert!(!r.app.hw().barrier_open());
    assert_eq!(
        r.app.presenter().screens(),
        vec![
            StatusScreen::Welcome,
            StatusScreen::Checking,
            StatusScreen::Accept,
            StatusScreen::Closing,
            StatusScreen::Welcome,
        ]
    );
}

#[test]
fn grant_event_sequence() {
    let mut r = rig([Reply::Immediate(AuthorizationOutcome::Granted(None))]);
    r.arrive();

    let tail: Vec<_> = r.sink.events.iter().skip(1).cloned().collect();
    assert_eq!(
        tail,
        vec![
            GateEvent::PresenceChanged(PresenceEdge::Asserted),
            GateEvent::PhaseChanged {
                from: StateId::Idle,
                to: StateId::AwaitingDecision,
            },
            GateEvent::DecisionRequested { request_id: 1 },
            GateEvent::DecisionResolved {
                request_id: 1,
                outcome: AuthorizationOutcome::Granted(None),
                elapsed_ms: 0,
            },
            GateEvent::PhaseChanged {
                from: StateId::AwaitingDecision,
                to: StateId::Open,
            },
        ]
    );
}

#[test]
fn late_grant_within_window_opens() {
    let mut r = rig([Reply::AfterPolls(3, AuthorizationOutcome::Granted(None))]);
    r.arrive();
    assert_eq!(r.app.phase(), StateId::AwaitingDecision);
    r.run(5, 10);
    assert_eq!(r.app.phase(), StateId::Open);
    assert_eq!(r.app.hw().opens(), 1);
}

#[test]
fn request_budget_is_response_window() {
    let mut r = rig([Reply::Immediate(AuthorizationOutcome::Denied)]);
    r.arrive();
    let submitted = &r.app.decisions_mut().submitted;
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].0.id, 1);
    assert_eq!(submitted[0].1, 5_000);
}

// ── Fail-closed paths ─────────────────────────────────────────

#[test]
fn denial_stays_closed_until_departure() {
    let mut r = rig([Reply::Immediate(AuthorizationOutcome::Denied)]);
    r.arrive();
    assert_eq!(r.app.phase(), StateId::Idle);
    assert_eq!(r.app.hw().opens(), 0);
    assert_eq!(r.app.presenter().last_screen(), Some(StatusScreen::Deny));

    r.leave();
    assert_eq!(r.app.presenter().last_screen(), Some(StatusScreen::Welcome));
    assert_eq!(r.app.hw().opens(), 0);
}

#[test]
fn denial_after_grant_shows_no_identifier() {
    let mut r = rig([
        Reply::Immediate(AuthorizationOutcome::Granted(plate("ABC123"))),
        Reply::Immediate(AuthorizationOutcome::Denied),
    ]);
    r.arrive();
    assert_eq!(r.app.presenter().last_identifier(), Some("ABC123"));
    r.leave();
    r.run(50, 10);
    assert_eq!(r.app.phase(), StateId::Idle);

    r.arrive();
    assert_eq!(r.app.presenter().last_screen(), Some(StatusScreen::Deny));
    assert_eq!(r.app.presenter().last_identifier(), None);
    assert_eq!(StatusScreen::Deny.lines(), &["DENY", ""]);
}

#[test]
fn no_response_is_a_denial() {
    let mut r = rig([Reply::Immediate(AuthorizationOutcome::NoResponse)]);
    r.arrive();
    assert_eq!(r.app.phase(), StateId::Idle);
    assert_eq!(r.app.hw().opens(), 0);
    assert_eq!(r.app.presenter().last_screen(), Some(StatusScreen::Deny));
}

#[test]
fn silent_authority_times_out() {
    let mut r = rig([Reply::Never]);
    r.arrive();
    assert_eq!(r.app.phase(), StateId::AwaitingDecision);
    assert_eq!(r.app.open_request_id(), Some(1));

    // The request was issued one tick before `arrive` returned.
    r.clock.advance(4_980);
    r.tick();
    assert_eq!(r.app.phase(), StateId::AwaitingDecision);

    r.clock.advance(10);
    r.tick();
    assert_eq!(r.app.phase(), StateId::Idle);
    assert_eq!(r.app.hw().opens(), 0);
    assert_eq!(r.app.presenter().last_screen(), Some(StatusScreen::Timeout));
    assert_eq!(r.app.decisions_mut().abandoned, 1);
    assert_eq!(r.app.open_request_id(), None);
    assert_eq!(
        r.sink.events.last(),
        Some(&GateEvent::PhaseChanged {
            from: StateId::AwaitingDecision,
            to: StateId::Idle,
        })
    );
    assert_eq!(
        r.sink.count(|e| matches!(e, GateEvent::DecisionTimedOut { request_id: 1 })),
        1
    );
}

#[test]
fn refused_submit_fails_closed() {
    let mut r = Rig::start(GateConfig::default(), ScriptedDecisions::refusing());
    r.arrive();
    assert_eq!(r.app.phase(), StateId::Idle);
    assert_eq!(r.app.hw().opens(), 0);
    assert_eq!(
        r.sink.count(|e| matches!(e, GateEvent::DecisionRefused { .. })),
        1
    );
}

// ── Presence handling ─────────────────────────────────────────

#[test]
fn held_presence_requests_once() {
    let mut r = rig([
        Reply::Immediate(AuthorizationOutcome::Denied),
        Reply::Immediate(AuthorizationOutcome::Denied),
    ]);
    r.set_level(false);
    // Samples spaced wider than the debounce window.
    r.run(5, 60);
    r.run(100, 10);
    assert_eq!(r.app.decisions_mut().submitted.len(), 1);
    assert_eq!(
        r.sink.count(|e| matches!(e, GateEvent::PresenceChanged(PresenceEdge::Asserted))),
        1
    );
}

#[test]
fn chatter_shorter_than_window_is_ignored() {
    let mut r = rig([Reply::Immediate(AuthorizationOutcome::Granted(None))]);
    for _ in 0..20 {
        r.set_level(false);
        r.run(2, 10);
        r.set_level(true);
        r.run(2, 10);
    }
    assert!(r.app.decisions_mut().submitted.is_empty());
    assert_eq!(r.app.phase(), StateId::Idle);
}

#[test]
fn second_vehicle_queued_behind_closing() {
    let mut r = rig([
        Reply::Immediate(AuthorizationOutcome::Granted(None)),
        Reply::Immediate(AuthorizationOutcome::Granted(None)),
    ]);
    r.arrive();
    r.leave();
    assert_eq!(r.app.phase(), StateId::Closing);

    r.arrive();
    assert_eq!(r.app.phase(), StateId::Closing);
    assert_eq!(r.app.decisions_mut().submitted.len(), 1);

    r.run(50, 10);
    assert_eq!(r.app.phase(), StateId::Open);
    assert_eq!(r.app.decisions_mut().submitted.len(), 2);
    assert_eq!(r.app.hw().opens(), 2);
}

#[test]
fn active_high_sensor_polarity() {
    let config = GateConfig {
        sensor_active_high: true,
        ..GateConfig::default()
    };
    let mut r = Rig::start(
        config,
        ScriptedDecisions::new([Reply::Immediate(AuthorizationOutcome::Granted(None))]),
    );
    // Idle-high line reads as present for an active-high sensor: no edge yet.
    assert!(r.app.is_present());
    r.set_level(false);
    r.run(7, 10);
    assert!(!r.app.is_present());
    assert!(r.app.decisions_mut().submitted.is_empty());

    r.set_level(true);
    r.run(7, 10);
    assert_eq!(r.app.phase(), StateId::Open);
}
