//! Application core — gate logic with no direct I/O.
//!
//! Debouncing, the access state machine, and the authorization
//! timeout policy live here. All interaction with hardware happens through
//! the **port traits** defined in [`ports`].

pub mod events;
pub mod ports;
pub mod service;
