//! Fuzz target: `decode_decision`
//!
//! Feeds arbitrary HTTP bodies to the decision decoder and asserts that it
//! never panics and that any grant came from a literal `"status": true`.
//!
//! cargo fuzz run fuzz_decision_body

#![no_main]

use gatekeeper::authz::response::{decode_decision, outcome_from_body};
use gatekeeper::authz::AuthorizationOutcome;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    match decode_decision(data) {
        Ok(AuthorizationOutcome::Granted(plate)) => {
            let text = core::str::from_utf8(data).expect("granted body must be UTF-8 JSON");
            assert!(text.contains("true"), "grant without a true status");
            if let Some(p) = plate {
                assert!(!p.is_empty() && p.len() <= 32);
            }
        }
        Ok(AuthorizationOutcome::Denied) => {}
        Ok(AuthorizationOutcome::NoResponse) => panic!("decoder never yields NoResponse"),
        Err(_) => assert_eq!(outcome_from_body(data), AuthorizationOutcome::NoResponse),
    }
});
