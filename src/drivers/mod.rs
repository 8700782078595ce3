//! Actuator driver, hardware initialisation, and platform helpers.

pub mod hw_init;
pub mod servo;
pub mod task_pin;
pub mod watchdog;
