//! Fallback sweep while the beacon is lost.

use embedded_hal::pwm::SetDutyCycle;
use serde::{Deserialize, Serialize};

use crate::pan::PanController;
use crate::tilt::TiltController;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Sweep half-angle either side of home, degrees.
    pub sweep_deg: f32,
    pub sweep_speed: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            sweep_deg: 90.0,
            sweep_speed: 0.25,
        }
    }
}

/// Slow back-and-forth pan between `-sweep_deg` and `+sweep_deg` with tilt
/// parked at its scan angle.
pub struct SearchSweep {
    config: SearchConfig,
    clockwise: bool,
}

impl SearchSweep {
    pub fn new(config: SearchConfig) -> SearchSweep {
        SearchSweep {
            config,
            clockwise: true,
        }
    }

    /// Pick the first leg so the sweep heads toward centre.
    pub fn reset(&mut self, position_deg: f32) {
        self.clockwise = position_deg <= 0.0;
    }

    pub fn step<S, T>(&mut self, pan: &mut PanController<S>, tilt: &mut TiltController<T>)
    where
        S: SetDutyCycle,
        T: SetDutyCycle,
    {
        tilt.go_scan_position();

        if self.clockwise {
            pan.set_speed(self.config.sweep_speed);
            if pan.position_deg() >= self.config.sweep_deg {
                self.clockwise = false;
            }
        } else {
            pan.set_speed(-self.config.sweep_speed);
            if pan.position_deg() <= -self.config.sweep_deg {
                self.clockwise = true;
            }
        }
    }

    pub fn is_clockwise(&self) -> bool {
        self.clockwise
    }
}
