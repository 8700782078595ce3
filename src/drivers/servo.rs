//! Hobby-servo barrier driver.
//!
//! Maps the two barrier setpoints onto a 50 Hz LEDC channel. A pulse of
//! `min_pulse_us` corresponds to 0°, `max_pulse_us` to 180°. There is no
//! position feedback; a command is a single immediate duty write.
//!
//! If the PWM peripheral fails to attach, the driver logs the failure once
//! and every later command becomes a no-op.

use log::{debug, error, info, warn};

use super::hw_init;
use crate::config::ServoConfig;
use crate::error::ActuatorError;
use crate::pins;

/// Servo frame period at 50 Hz.
const FRAME_US: u32 = 1_000_000 / pins::SERVO_PWM_FREQ_HZ;
const DUTY_MAX: u32 = (1 << pins::SERVO_PWM_RESOLUTION_BITS) - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierPosition {
    Closed,
    Open,
}

pub struct ServoDriver {
    config: ServoConfig,
    attached: bool,
    position: Option<BarrierPosition>,
}

impl ServoDriver {
    pub fn new(config: ServoConfig) -> Self {
        Self {
            config,
            attached: false,
            position: None,
        }
    }

    /// Bring up the PWM peripheral. On failure the driver stays detached.
    pub fn attach(&mut self) -> Result<(), ActuatorError> {
        match hw_init::init_servo_pwm() {
            Ok(()) => {
                self.attached = true;
                info!("SERVO: attached");
                Ok(())
            }
            Err(e) => {
                error!("SERVO: attach failed ({}), barrier commands disabled", e);
                self.attached = false;
                Err(ActuatorError::PwmAttachFailed)
            }
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Last commanded position, if any.
    pub fn position(&self) -> Option<BarrierPosition> {
        self.position
    }

    pub fn open(&mut self) -> Result<(), ActuatorError> {
        self.move_to(BarrierPosition::Open)
    }

    pub fn close(&mut self) -> Result<(), ActuatorError> {
        self.move_to(BarrierPosition::Closed)
    }

    /// A failed duty write leaves the last known position untouched.
    fn move_to(&mut self, target: BarrierPosition) -> Result<(), ActuatorError> {
        if !self.attached {
            debug!("SERVO: detached, ignoring {:?}", target);
            return Ok(());
        }
        let angle = match target {
            BarrierPosition::Open => self.config.open_angle_deg,
            BarrierPosition::Closed => self.config.closed_angle_deg,
        };
        let duty = angle_to_duty(angle, &self.config);
        match hw_init::ledc_set(hw_init::LEDC_CH_SERVO, duty) {
            Ok(()) => {
                self.position = Some(target);
                info!("SERVO: {:?} ({}°, duty={})", target, angle, duty);
                Ok(())
            }
            Err(rc) => {
                warn!("SERVO: duty write failed (rc={})", rc);
                Err(ActuatorError::PwmWriteFailed)
            }
        }
    }
}

/// Pulse width (µs) for an angle, clamped to 0..=180°.
pub fn angle_to_pulse_us(angle_deg: u8, cfg: &ServoConfig) -> u32 {
    let angle = u32::from(angle_deg.min(180));
    let span = u32::from(cfg.max_pulse_us.saturating_sub(cfg.min_pulse_us));
    u32::from(cfg.min_pulse_us) + span * angle / 180
}

/// LEDC duty value for an angle at the configured resolution.
pub fn angle_to_duty(angle_deg: u8, cfg: &ServoConfig) -> u32 {
    let pulse = angle_to_pulse_us(angle_deg, cfg);
    (pulse * (DUTY_MAX + 1) / FRAME_US).min(DUTY_MAX)
}
