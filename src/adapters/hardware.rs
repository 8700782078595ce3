//! Hardware adapter — bridges real peripherals to domain port traits.
//!
//! Owns the presence input and the barrier servo, exposing them through
//! [`SensorPort`] and [`ActuatorPort`]. On non-espidf targets the
//! underlying drivers use cfg-gated simulation stubs.

use log::error;

use crate::app::ports::{ActuatorPort, SensorPort};
use crate::drivers::servo::{BarrierPosition, ServoDriver};
use crate::sensors::PresenceSensor;

pub struct HardwareAdapter {
    sensor: PresenceSensor,
    servo: ServoDriver,
}

impl HardwareAdapter {
    pub fn new(sensor: PresenceSensor, servo: ServoDriver) -> Self {
        Self { sensor, servo }
    }

    pub fn barrier_position(&self) -> Option<BarrierPosition> {
        self.servo.position()
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl SensorPort for HardwareAdapter {
    fn read_presence_level(&mut self) -> bool {
        self.sensor.read_level()
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl ActuatorPort for HardwareAdapter {
    fn command_open(&mut self) {
        if let Err(e) = self.servo.open() {
            error!("HW: open command lost: {}", crate::error::Error::from(e));
        }
    }

    fn command_close(&mut self) {
        if let Err(e) = self.servo.close() {
            error!("HW: close command lost: {}", crate::error::Error::from(e));
        }
    }
}
