//! Sensor fusion to axis commands.
//!
//! The detectors only say which side sees the beacon, so pan runs a two-level
//! bang-bang law: fast when the beacon is well off-axis, slow when the opposite
//! detector fired within `approach_memory_ms` (the beacon just crossed centre).
//! Tilt steps one increment toward the active vertical detector.

use embedded_hal::pwm::SetDutyCycle;
use sensors::SensorReading;
use serde::{Deserialize, Serialize};

use crate::pan::PanController;
use crate::tilt::TiltController;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub fast_speed: f32,
    pub slow_speed: f32,
    pub approach_memory_ms: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        TrackingConfig {
            fast_speed: 0.80,
            slow_speed: 0.30,
            approach_memory_ms: 300,
        }
    }
}

pub struct TrackingEngine {
    config: TrackingConfig,
    last_left_ms: Option<u64>,
    last_right_ms: Option<u64>,
}

impl TrackingEngine {
    pub fn new(config: TrackingConfig) -> TrackingEngine {
        TrackingEngine {
            config,
            last_left_ms: None,
            last_right_ms: None,
        }
    }

    /// Forget all horizontal activity.
    pub fn init(&mut self) {
        self.last_left_ms = None;
        self.last_right_ms = None;
    }

    /// One tracking step: command pan speed and request a tilt nudge.
    pub fn update<S, T>(
        &mut self,
        reading: &SensorReading,
        pan: &mut PanController<S>,
        tilt: &mut TiltController<T>,
        now_ms: u64,
    ) where
        S: SetDutyCycle,
        T: SetDutyCycle,
    {
        let speed = self.pan_speed(reading.left_active(), reading.right_active(), now_ms);
        pan.set_speed(speed);

        let direction = self.tilt_direction(reading.top_active(), reading.bottom_active());
        if direction != 0 {
            // A throttled nudge is simply dropped this tick.
            let _ = tilt.nudge(direction as f32 * tilt.step_deg(), now_ms);
        }
    }

    /// Stop panning. Tilt keeps its last angle.
    pub fn halt<S>(&self, pan: &mut PanController<S>)
    where
        S: SetDutyCycle,
    {
        pan.stop();
    }

    /// Signed pan speed for this tick; negative is toward the left detector.
    pub fn pan_speed(&mut self, left: bool, right: bool, now_ms: u64) -> f32 {
        if left {
            self.last_left_ms = Some(now_ms);
        }
        if right {
            self.last_right_ms = Some(now_ms);
        }

        if left == right {
            return 0.0;
        }

        let opposite = if left {
            self.last_right_ms
        } else {
            self.last_left_ms
        };
        let near_center = opposite
            .map(|t| now_ms.saturating_sub(t) < self.config.approach_memory_ms)
            .unwrap_or(false);

        let speed = if near_center {
            self.config.slow_speed
        } else {
            self.config.fast_speed
        };

        if left {
            -speed
        } else {
            speed
        }
    }

    /// +1 up, -1 down, 0 hold.
    pub fn tilt_direction(&self, top: bool, bottom: bool) -> i8 {
        match (top, bottom) {
            (true, false) => 1,
            (false, true) => -1,
            _ => 0,
        }
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pan::PanConfig;
    use crate::test_support::FakePwm;
    use crate::tilt::TiltConfig;
    use proptest::prelude::*;
    use sensors::ChannelState::{self, *};

    fn reading(
        top: ChannelState,
        bottom: ChannelState,
        left: ChannelState,
        right: ChannelState,
    ) -> SensorReading {
        SensorReading::new(top, bottom, left, right)
    }

    fn axes() -> (PanController<FakePwm>, TiltController<FakePwm>) {
        (
            PanController::new(FakePwm::default(), PanConfig::default()),
            TiltController::new(FakePwm::default(), TiltConfig::default(), 0),
        )
    }

    #[test]
    fn left_only_pans_ccw_fast() {
        let mut engine = TrackingEngine::new(TrackingConfig::default());
        assert_eq!(engine.pan_speed(true, false, 1000), -0.80);
    }

    #[test]
    fn right_only_pans_cw_fast() {
        let mut engine = TrackingEngine::new(TrackingConfig::default());
        assert_eq!(engine.pan_speed(false, true, 1000), 0.80);
    }

    #[test]
    fn both_or_neither_hold() {
        let mut engine = TrackingEngine::new(TrackingConfig::default());
        assert_eq!(engine.pan_speed(true, true, 1000), 0.0);
        assert_eq!(engine.pan_speed(false, false, 1020), 0.0);
    }

    #[test]
    fn recent_opposite_activity_slows_the_approach() {
        let mut engine = TrackingEngine::new(TrackingConfig::default());
        engine.pan_speed(false, true, 1000);
        assert_eq!(engine.pan_speed(true, false, 1200), -0.30);
        // Right was last seen at 1000; 300 ms later the memory has lapsed.
        assert_eq!(engine.pan_speed(true, false, 1300), -0.80);
    }

    #[test]
    fn centred_tick_stamps_both_sides() {
        let mut engine = TrackingEngine::new(TrackingConfig::default());
        engine.pan_speed(true, true, 5000);
        assert_eq!(engine.pan_speed(false, true, 5020), 0.30);
    }

    #[test]
    fn memory_is_empty_after_boot() {
        let mut engine = TrackingEngine::new(TrackingConfig::default());
        assert_eq!(engine.pan_speed(true, false, 10), -0.80);

        engine.pan_speed(false, true, 20);
        engine.init();
        assert_eq!(engine.pan_speed(true, false, 40), -0.80);
    }

    #[test]
    fn tilt_follows_vertical_pair() {
        let engine = TrackingEngine::new(TrackingConfig::default());
        assert_eq!(engine.tilt_direction(true, false), 1);
        assert_eq!(engine.tilt_direction(false, true), -1);
        assert_eq!(engine.tilt_direction(true, true), 0);
        assert_eq!(engine.tilt_direction(false, false), 0);
    }

    #[test]
    fn update_writes_through_both_controllers() {
        let mut engine = TrackingEngine::new(TrackingConfig::default());
        let (mut pan, mut tilt) = axes();

        engine.update(&reading(Active, Inactive, Inactive, Active), &mut pan, &mut tilt, 100);
        assert_eq!(pan.speed(), 0.80);
        assert_eq!(tilt.angle(), 1.0);

        // Tilt holdoff swallows the next request silently.
        engine.update(&reading(Active, Inactive, Inactive, Active), &mut pan, &mut tilt, 120);
        assert_eq!(tilt.angle(), 1.0);

        engine.update(&reading(Inactive, Active, Inactive, Inactive), &mut pan, &mut tilt, 200);
        assert_eq!(pan.speed(), 0.0);
        assert_eq!(tilt.angle(), 0.0);
    }

    #[test]
    fn saturated_channels_are_ignored() {
        let mut engine = TrackingEngine::new(TrackingConfig::default());
        let (mut pan, mut tilt) = axes();
        engine.update(&reading(Saturated, Inactive, Saturated, Inactive), &mut pan, &mut tilt, 500);
        assert_eq!(pan.speed(), 0.0);
        assert_eq!(tilt.angle(), 0.0);
    }

    #[test]
    fn halt_stops_pan_and_leaves_tilt() {
        let mut engine = TrackingEngine::new(TrackingConfig::default());
        let (mut pan, mut tilt) = axes();
        engine.update(&reading(Active, Inactive, Active, Inactive), &mut pan, &mut tilt, 100);
        engine.halt(&mut pan);
        assert_eq!(pan.speed(), 0.0);
        assert_eq!(tilt.angle(), 1.0);
    }

    fn channel_state() -> impl Strategy<Value = ChannelState> {
        prop_oneof![Just(Inactive), Just(Active), Just(Saturated)]
    }

    /// Pairs whose members are either both active or both not.
    fn balanced_pair() -> impl Strategy<Value = (ChannelState, ChannelState)> {
        prop_oneof![
            Just((Active, Active)),
            Just((Inactive, Inactive)),
            Just((Saturated, Inactive)),
            Just((Inactive, Saturated)),
            Just((Saturated, Saturated)),
        ]
    }

    proptest! {
        #[test]
        fn horizontal_dead_band(
            top in channel_state(),
            bottom in channel_state(),
            horizontal in balanced_pair(),
            history in proptest::collection::vec((any::<bool>(), any::<bool>()), 0..20),
        ) {
            let mut engine = TrackingEngine::new(TrackingConfig::default());
            let mut now = 0;
            for (l, r) in history {
                now += 20;
                engine.pan_speed(l, r, now);
            }
            let (mut pan, mut tilt) = axes();
            pan.set_speed(0.8);
            engine.update(&reading(top, bottom, horizontal.0, horizontal.1), &mut pan, &mut tilt, now + 20);
            prop_assert_eq!(pan.speed(), 0.0);
        }

        #[test]
        fn vertical_dead_band(
            left in channel_state(),
            right in channel_state(),
            vertical in balanced_pair(),
        ) {
            let mut engine = TrackingEngine::new(TrackingConfig::default());
            let (mut pan, mut tilt) = axes();
            tilt.set_angle(20.0);
            engine.update(&reading(vertical.0, vertical.1, left, right), &mut pan, &mut tilt, 1_000);
            prop_assert_eq!(tilt.angle(), 20.0);
        }
    }
}
