//! Continuous-rotation azimuth axis.
//!
//! The pan servo only accepts a speed, so the controller keeps a dead-reckoned
//! position estimate by integrating the commanded speed once per tick. Soft
//! limits are enforced against that estimate: motion further out is refused,
//! motion back toward centre is always allowed.

use embedded_hal::pwm::SetDutyCycle;
use serde::{Deserialize, Serialize};

use crate::servo::Servo;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanConfig {
    /// Pulse width at which the servo stands still.
    pub stop_us: u16,
    /// Pulse width for full speed clockwise (positive speed).
    pub cw_full_us: u16,
    /// Pulse width for full speed counter-clockwise (negative speed).
    pub ccw_full_us: u16,
    /// Soft travel limit either side of home, degrees.
    pub limit_deg: f32,
    /// Smallest speed magnitude the gearbox actually responds to.
    pub min_speed: f32,
    /// Angular rate at speed 1.0, used for dead reckoning.
    pub deg_per_sec: f32,
    pub home_tolerance_deg: f32,
    /// Speed used while driving back to home.
    pub park_speed: f32,
}

impl Default for PanConfig {
    fn default() -> Self {
        PanConfig {
            stop_us: 1500,
            cw_full_us: 1300,
            ccw_full_us: 1700,
            limit_deg: 135.0,
            min_speed: 0.15,
            deg_per_sec: 60.0,
            home_tolerance_deg: 5.0,
            park_speed: 0.30,
        }
    }
}

pub struct PanController<P> {
    servo: Servo<P>,
    config: PanConfig,
    speed: f32,
    position_deg: f32,
}

impl<P> PanController<P>
where
    P: SetDutyCycle,
{
    /// Attach the servo and command it to stand still at position 0.
    ///
    /// # Panics
    ///
    /// If the limit, dead zone, rate or park speed cannot be integrated
    /// against.
    pub fn new(pwm: P, config: PanConfig) -> PanController<P> {
        assert!(
            config.limit_deg.is_finite() && config.limit_deg > 0.0,
            "pan limit {} must be positive",
            config.limit_deg
        );
        assert!(
            (0.0..1.0).contains(&config.min_speed),
            "pan min speed {} must be within [0, 1)",
            config.min_speed
        );
        assert!(
            config.deg_per_sec.is_finite() && config.deg_per_sec > 0.0,
            "pan rate {} must be finite and positive",
            config.deg_per_sec
        );
        assert!(
            config.park_speed >= config.min_speed && config.park_speed <= 1.0,
            "pan park speed {} must be within [min_speed, 1]",
            config.park_speed
        );
        let mut pan = PanController {
            servo: Servo::new(pwm),
            config,
            speed: 0.0,
            position_deg: 0.0,
        };
        pan.stop();
        pan
    }

    /// Command a normalised speed: -1.0 full CCW, 0.0 stop, +1.0 full CW.
    pub fn set_speed(&mut self, speed: f32) {
        let mut speed = if speed.is_nan() {
            0.0
        } else {
            speed.clamp(-1.0, 1.0)
        };

        // Backlash dead zone
        if speed.abs() < self.config.min_speed {
            speed = 0.0;
        }

        let limit = self.config.limit_deg;
        if self.position_deg >= limit && speed > 0.0 {
            speed = 0.0;
        }
        if self.position_deg <= -limit && speed < 0.0 {
            speed = 0.0;
        }

        self.speed = speed;
        let pulse = self.speed_to_microseconds(speed);
        self.servo.write_microseconds(pulse);
    }

    pub fn stop(&mut self) {
        self.speed = 0.0;
        self.servo.write_microseconds(self.config.stop_us);
    }

    /// Integrate the commanded speed over `dt_ms`.
    ///
    /// Must run exactly once per tick in every mode; it is the only position
    /// feedback this axis has.
    pub fn update_position(&mut self, dt_ms: u32) {
        let dt_sec = dt_ms as f32 / 1000.0;
        self.position_deg += self.speed * self.config.deg_per_sec * dt_sec;

        let limit = self.config.limit_deg;
        self.position_deg = self.position_deg.clamp(-limit, limit);
    }

    /// Estimated angle from home, degrees. Positive is clockwise.
    pub fn position_deg(&self) -> f32 {
        self.position_deg
    }

    /// Speed currently in effect after dead zone and limits.
    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn is_within_limits(&self) -> bool {
        self.position_deg > -self.config.limit_deg && self.position_deg < self.config.limit_deg
    }

    /// Drive toward the estimated home. Non-blocking: call every tick until it
    /// returns `true`.
    pub fn park_home(&mut self) -> bool {
        if self.position_deg.abs() < self.config.home_tolerance_deg {
            self.stop();
            return true;
        }

        let speed = if self.position_deg > 0.0 {
            -self.config.park_speed
        } else {
            self.config.park_speed
        };
        self.set_speed(speed);
        false
    }

    /// Zero the estimate. Only meaningful right after homing was confirmed.
    pub fn reset_position(&mut self) {
        self.position_deg = 0.0;
    }

    pub fn pulse_us(&self) -> u16 {
        self.servo.pulse_us()
    }

    pub fn config(&self) -> &PanConfig {
        &self.config
    }

    /// Linear map between the three calibration points.
    pub fn speed_to_microseconds(&self, speed: f32) -> u16 {
        let stop = self.config.stop_us as f32;
        let full = if speed >= 0.0 {
            self.config.cw_full_us as f32
        } else {
            self.config.ccw_full_us as f32
        };
        (stop + speed.abs() * (full - stop)).round() as u16
    }
}
