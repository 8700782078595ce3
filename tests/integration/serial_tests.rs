//! Serial authorization end to end: GateService → InlineDecisions →
//! SerialDecisionTransport → in-memory byte link.
//!
//! The transport's delays advance the same manual clock the service
//! reads, so a silent companion board consumes the full response window.

use gatekeeper::app::ports::{ClockPort, StatusScreen};
use gatekeeper::authz::dispatch::InlineDecisions;
use gatekeeper::authz::serial::{REQUEST_LINE, SerialDecisionTransport};
use gatekeeper::authz::{AuthorizationOutcome, AuthorizationRequest, AuthorizationTransport};
use gatekeeper::config::{AuthorizationMode, DecisionDispatch, GateConfig, SerialConfig};
use gatekeeper::fsm::StateId;

use super::mock_hw::{ClockDelay, ManualClock, MemLink, Rig};

type SerialRig = Rig<InlineDecisions<SerialDecisionTransport<MemLink, ManualClock, ClockDelay>>>;

fn serial_config() -> GateConfig {
    GateConfig {
        authorization: AuthorizationMode::Serial,
        dispatch: DecisionDispatch::Inline,
        ..GateConfig::default()
    }
}

fn rig(link: MemLink) -> SerialRig {
    let config = serial_config();
    let clock = ManualClock::at(1_000);
    let transport =
        SerialDecisionTransport::new(link, clock.clone(), ClockDelay(clock.clone()), config.serial);
    Rig::start_on(config, InlineDecisions::new(transport), clock, true)
}

#[test]
fn ok_reply_opens() {
    let link = MemLink::replying(b"OK");
    let mut r = rig(link.clone());
    r.arrive();
    assert_eq!(r.app.phase(), StateId::Open);
    assert!(r.app.hw().barrier_open());
    assert_eq!(link.tx.borrow().as_slice(), REQUEST_LINE);
}

#[test]
fn no_reply_denies() {
    let mut r = rig(MemLink::replying(b"NO"));
    r.arrive();
    assert_eq!(r.app.phase(), StateId::Idle);
    assert_eq!(r.app.hw().opens(), 0);
    assert_eq!(r.app.presenter().last_screen(), Some(StatusScreen::Deny));
}

#[test]
fn silence_times_out_closed() {
    let link = MemLink::default();
    let mut r = rig(link.clone());
    let before = r.clock.now_ms();
    r.arrive();

    assert!(r.clock.now_ms().wrapping_sub(before) >= 5_000);
    assert_eq!(r.app.phase(), StateId::Idle);
    assert_eq!(r.app.hw().opens(), 0);
    assert_eq!(r.app.presenter().last_screen(), Some(StatusScreen::Timeout));
    // One request line; silence is not a transmit failure.
    assert_eq!(link.write_calls.get(), 1);
}

#[test]
fn stale_grant_is_not_mistaken_for_reply() {
    let link = MemLink::default().with_stale(b"OK");
    let mut r = rig(link.clone());
    r.arrive();
    assert_eq!(r.app.hw().opens(), 0);
    assert_eq!(r.app.phase(), StateId::Idle);
}

#[test]
fn garbage_reply_fails_closed() {
    let mut r = rig(MemLink::replying(b"ok"));
    r.arrive();
    assert_eq!(r.app.hw().opens(), 0);
    assert_eq!(r.app.presenter().last_screen(), Some(StatusScreen::Deny));
}

#[test]
fn transmit_retries_are_bounded() {
    let link = MemLink::replying(b"OK").failing(u32::MAX);
    let mut r = rig(link.clone());
    r.arrive();
    assert_eq!(link.write_calls.get(), 5);
    assert_eq!(r.app.hw().opens(), 0);
    assert_eq!(r.app.phase(), StateId::Idle);
}

#[test]
fn transient_write_failure_recovers() {
    let clock = ManualClock::at(0);
    let link = MemLink::replying(b"OK").failing(2);
    let mut transport = SerialDecisionTransport::new(
        link.clone(),
        clock.clone(),
        ClockDelay(clock.clone()),
        SerialConfig::default(),
    );
    let request = AuthorizationRequest {
        id: 7,
        issued_at_ms: 0,
    };
    assert_eq!(
        transport.request_decision(&request, 5_000),
        AuthorizationOutcome::Granted(None)
    );
    assert_eq!(link.write_calls.get(), 3);
    // Two retry pauses of 20 ms.
    assert_eq!(clock.now_ms(), 40);
}
