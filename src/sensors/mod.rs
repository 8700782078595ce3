//! Presence sensing: the raw GPIO reader and the [`debounce`] filter.
//!
//! [`PresenceSensor`] only reports the electrical level. Polarity and
//! debouncing are applied by [`debounce::PresenceDebouncer`] inside the
//! application service.

pub mod debounce;

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicBool, Ordering};

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;

/// Simulated line level for host builds. Idle-high like the real module.
#[cfg(not(target_os = "espidf"))]
static SIM_LEVEL: AtomicBool = AtomicBool::new(true);

/// Drive the simulated sensor line (host builds only).
#[cfg(not(target_os = "espidf"))]
pub fn set_simulated_level(high: bool) {
    SIM_LEVEL.store(high, Ordering::Release);
}

/// Raw digital presence input on a single GPIO.
pub struct PresenceSensor {
    gpio: i32,
}

impl PresenceSensor {
    pub fn new(gpio: i32) -> Self {
        Self { gpio }
    }

    /// GPIO this sensor is wired to.
    pub fn gpio(&self) -> i32 {
        self.gpio
    }

    /// Current electrical level, `true` = HIGH.
    #[cfg(target_os = "espidf")]
    pub fn read_level(&self) -> bool {
        hw_init::gpio_read(self.gpio)
    }

    /// Current electrical level, `true` = HIGH.
    #[cfg(not(target_os = "espidf"))]
    pub fn read_level(&self) -> bool {
        SIM_LEVEL.load(Ordering::Acquire)
    }
}
