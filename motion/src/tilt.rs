//! Absolute-angle elevation axis with rate-limited incremental steps.

use embedded_hal::pwm::SetDutyCycle;
use serde::{Deserialize, Serialize};

use crate::servo::Servo;

/// Angular span covered by the servo's pulse range.
const SERVO_SPAN_DEG: f32 = 180.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TiltConfig {
    pub min_deg: f32,
    pub max_deg: f32,
    pub home_deg: f32,
    /// Angle held while sweeping for a lost beacon.
    pub scan_deg: f32,
    /// Largest change a single nudge may make.
    pub step_deg: f32,
    /// Minimum time between accepted nudges.
    pub holdoff_ms: u64,
    /// Pulse width at 0 degrees.
    pub min_pulse_us: u16,
    /// Pulse width at 180 degrees.
    pub max_pulse_us: u16,
}

impl Default for TiltConfig {
    fn default() -> Self {
        TiltConfig {
            min_deg: 0.0,
            max_deg: 45.0,
            home_deg: 0.0,
            scan_deg: 20.0,
            step_deg: 1.0,
            holdoff_ms: 100,
            min_pulse_us: 544,
            max_pulse_us: 2400,
        }
    }
}

pub struct TiltController<P> {
    servo: Servo<P>,
    config: TiltConfig,
    angle_deg: f32,
    last_step_ms: u64,
}

impl<P> TiltController<P>
where
    P: SetDutyCycle,
{
    /// Attach the servo and move it to the home angle. The step timer starts
    /// at `now_ms`.
    ///
    /// # Panics
    ///
    /// If the range is inverted or the step size is not positive.
    pub fn new(pwm: P, config: TiltConfig, now_ms: u64) -> TiltController<P> {
        assert!(
            config.min_deg <= config.max_deg,
            "tilt range [{}, {}] is inverted",
            config.min_deg,
            config.max_deg
        );
        assert!(
            config.step_deg.is_finite() && config.step_deg > 0.0,
            "tilt step {} must be positive",
            config.step_deg
        );
        let home = config.home_deg;
        let mut tilt = TiltController {
            servo: Servo::new(pwm),
            config,
            angle_deg: home,
            last_step_ms: now_ms,
        };
        tilt.set_angle(home);
        tilt
    }

    /// Go straight to `degrees`, clamped to range. Not rate limited.
    pub fn set_angle(&mut self, degrees: f32) {
        let degrees = if degrees.is_nan() {
            self.angle_deg
        } else {
            degrees
        };
        self.angle_deg = degrees.clamp(self.config.min_deg, self.config.max_deg);
        let pulse = self.angle_to_microseconds(self.angle_deg);
        self.servo.write_microseconds(pulse);
    }

    /// Step by at most `step_deg`. Returns `false` without moving if the
    /// previous accepted step was less than `holdoff_ms` ago.
    pub fn nudge(&mut self, delta_deg: f32, now_ms: u64) -> bool {
        if now_ms.saturating_sub(self.last_step_ms) < self.config.holdoff_ms {
            return false;
        }

        let step = self.config.step_deg;
        let delta = if delta_deg.is_nan() {
            0.0
        } else {
            delta_deg.clamp(-step, step)
        };
        self.set_angle(self.angle_deg + delta);
        self.last_step_ms = now_ms;
        true
    }

    pub fn park_home(&mut self) {
        self.set_angle(self.config.home_deg);
    }

    pub fn go_scan_position(&mut self) {
        self.set_angle(self.config.scan_deg);
    }

    pub fn angle(&self) -> f32 {
        self.angle_deg
    }

    pub fn step_deg(&self) -> f32 {
        self.config.step_deg
    }

    pub fn pulse_us(&self) -> u16 {
        self.servo.pulse_us()
    }

    pub fn config(&self) -> &TiltConfig {
        &self.config
    }

    fn angle_to_microseconds(&self, degrees: f32) -> u16 {
        let min = self.config.min_pulse_us as f32;
        let max = self.config.max_pulse_us as f32;
        (min + degrees / SERVO_SPAN_DEG * (max - min)).round() as u16
    }
}
