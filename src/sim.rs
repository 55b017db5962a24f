//! Bench simulation: a scripted IR beacon and simulated peripherals.
//!
//! The detectors are modelled as four overlapping cones. A channel sees the
//! beacon when its bearing relative to the turret lies on that channel's side
//! of the axis or inside the centre band, and within the field of view.

use std::cell::Cell;
use std::convert::Infallible;
use std::rc::Rc;

use clock::{Clock, ManualClock};
use embedded_hal::digital::{self, InputPin, OutputPin};
use embedded_hal::pwm::{self, SetDutyCycle};
use log::*;
use motion::servo::FRAME_US;
use motion::MonitorState;

use crate::config::Config;
use crate::control::{Hardware, Turret};

/// Band either side of the axis where both opposing detectors see the beacon.
const CENTER_BAND_DEG: f32 = 2.0;
const HALF_FOV_DEG: f32 = 30.0;
/// Modulated beacon: lit for 140 ms of every 160 ms.
const STROBE_PERIOD_MS: u64 = 160;
const STROBE_ON_MS: u64 = 140;

/// Shared raw detector levels, top/bottom/left/right, `true` = beacon seen.
#[derive(Clone, Default)]
pub struct DetectorBank(Rc<Cell<[bool; 4]>>);

impl DetectorBank {
    pub fn new() -> DetectorBank {
        DetectorBank::default()
    }

    pub fn set(&self, seen: [bool; 4]) {
        self.0.set(seen);
    }

    pub fn pins(&self) -> [SimPin; 4] {
        [0, 1, 2, 3].map(|index| SimPin {
            bank: self.clone(),
            index,
        })
    }
}

/// Active-low detector output: pulled low while the beacon is seen.
pub struct SimPin {
    bank: DetectorBank,
    index: usize,
}

impl digital::ErrorType for SimPin {
    type Error = Infallible;
}

impl InputPin for SimPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.bank.0.get()[self.index])
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.bank.0.get()[self.index])
    }
}

/// PWM channel whose duty reads back as pulse width in microseconds.
#[derive(Clone, Default)]
pub struct SimPwm(Rc<Cell<u16>>);

impl SimPwm {
    pub fn pulse_us(&self) -> u16 {
        self.0.get()
    }
}

impl pwm::ErrorType for SimPwm {
    type Error = Infallible;
}

impl SetDutyCycle for SimPwm {
    fn max_duty_cycle(&self) -> u16 {
        FRAME_US
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.0.set(duty);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct SimLed(Rc<Cell<bool>>);

impl SimLed {
    pub fn is_on(&self) -> bool {
        self.0.get()
    }
}

impl digital::ErrorType for SimLed {
    type Error = Infallible;
}

impl OutputPin for SimLed {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set(true);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bearing {
    pub azimuth_deg: f32,
    pub elevation_deg: f32,
}

impl Bearing {
    pub fn new(azimuth_deg: f32, elevation_deg: f32) -> Bearing {
        Bearing {
            azimuth_deg,
            elevation_deg,
        }
    }

    fn lerp(self, to: Bearing, t: f32) -> Bearing {
        Bearing {
            azimuth_deg: self.azimuth_deg + (to.azimuth_deg - self.azimuth_deg) * t,
            elevation_deg: self.elevation_deg + (to.elevation_deg - self.elevation_deg) * t,
        }
    }
}

/// One segment of the script. `None` endpoints mean the beacon is off.
#[derive(Debug, Clone, Copy)]
pub struct Leg {
    pub duration_ms: u64,
    pub from: Option<Bearing>,
    pub to: Option<Bearing>,
}

impl Leg {
    pub fn hold(duration_ms: u64, at: Bearing) -> Leg {
        Leg {
            duration_ms,
            from: Some(at),
            to: Some(at),
        }
    }

    pub fn sweep(duration_ms: u64, from: Bearing, to: Bearing) -> Leg {
        Leg {
            duration_ms,
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn hidden(duration_ms: u64) -> Leg {
        Leg {
            duration_ms,
            from: None,
            to: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Scenario {
    legs: Vec<Leg>,
}

impl Default for Scenario {
    /// Acquire, follow a slow move, lose the beacon long enough to park, then
    /// reacquire on the other side.
    fn default() -> Self {
        let start = Bearing::new(25.0, 10.0);
        let moved = Bearing::new(-20.0, 10.0);
        Scenario::new(vec![
            Leg::hold(8_000, start),
            Leg::sweep(6_000, start, moved),
            Leg::hidden(20_000),
            Leg::hold(11_000, Bearing::new(-25.0, 5.0)),
        ])
    }
}

impl Scenario {
    pub fn new(legs: Vec<Leg>) -> Scenario {
        Scenario { legs }
    }

    pub fn duration_ms(&self) -> u64 {
        self.legs.iter().map(|leg| leg.duration_ms).sum()
    }

    /// Where the beacon is at `now_ms`, or `None` while it is off. The last
    /// leg holds once the script runs out.
    pub fn beacon_at(&self, now_ms: u64) -> Option<Bearing> {
        let mut start = 0;
        for leg in &self.legs {
            if now_ms < start + leg.duration_ms {
                let t = (now_ms - start) as f32 / leg.duration_ms as f32;
                return match (leg.from, leg.to) {
                    (Some(from), Some(to)) => Some(from.lerp(to, t)),
                    _ => None,
                };
            }
            start += leg.duration_ms;
        }
        self.legs.last().and_then(|leg| leg.to)
    }

    /// Raw detector levels for a turret pointing at `pan_deg`/`tilt_deg`.
    pub fn detectors(&self, now_ms: u64, pan_deg: f32, tilt_deg: f32) -> [bool; 4] {
        let beacon = match self.beacon_at(now_ms) {
            Some(b) if now_ms % STROBE_PERIOD_MS < STROBE_ON_MS => b,
            _ => return [false; 4],
        };

        let az = beacon.azimuth_deg - pan_deg;
        let el = beacon.elevation_deg - tilt_deg;
        if az.abs() > HALF_FOV_DEG || el.abs() > HALF_FOV_DEG {
            return [false; 4];
        }

        [
            el > -CENTER_BAND_DEG,
            el < CENTER_BAND_DEG,
            az < CENTER_BAND_DEG,
            az > -CENTER_BAND_DEG,
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimSummary {
    pub final_state: MonitorState,
    /// Time and new state of every transition.
    pub transitions: Vec<(u64, MonitorState)>,
    pub pan_deg: f32,
    pub tilt_deg: f32,
    pub ticks: u64,
}

/// Run the default scenario for `duration_ms` of simulated time.
pub fn run(config: &Config, duration_ms: u64) -> SimSummary {
    run_scenario(config, &Scenario::default(), duration_ms)
}

pub fn run_scenario(config: &Config, scenario: &Scenario, duration_ms: u64) -> SimSummary {
    let clock = ManualClock::new(0);
    let bank = DetectorBank::new();
    let hardware = Hardware {
        sensor_pins: bank.pins(),
        pan_pwm: SimPwm::default(),
        tilt_pwm: SimPwm::default(),
        status_led: SimLed::default(),
    };
    let mut turret = Turret::new(hardware, config, clock.now_ms());
    let period = u64::from(turret.period_ms());

    let mut transitions = Vec::new();
    let mut ticks = 0;
    while clock.now_ms() < duration_ms {
        let now = clock.now_ms();
        bank.set(scenario.detectors(now, turret.pan().position_deg(), turret.tilt().angle()));

        let report = turret.tick(now);
        if report.changed {
            info!(
                "[{:>6} ms] {} (pan {:.1}°, tilt {:.0}°)",
                now, report.state, report.pan_position_deg, report.tilt_deg
            );
            transitions.push((now, report.state));
        }

        ticks += 1;
        clock.advance(period);
    }

    SimSummary {
        final_state: turret.state(),
        transitions,
        pan_deg: turret.pan().position_deg(),
        tilt_deg: turret.tilt().angle(),
        ticks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beacon_follows_the_script() {
        let scenario = Scenario::default();
        assert_eq!(scenario.duration_ms(), 45_000);
        assert_eq!(scenario.beacon_at(0), Some(Bearing::new(25.0, 10.0)));
        let mid = scenario.beacon_at(11_000).unwrap();
        assert!((mid.azimuth_deg - 2.5).abs() < 1e-3);
        assert_eq!(scenario.beacon_at(20_000), None);
        assert_eq!(scenario.beacon_at(60_000), Some(Bearing::new(-25.0, 5.0)));
    }

    #[test]
    fn detector_cones_overlap_at_centre() {
        let scenario = Scenario::new(vec![Leg::hold(1_000, Bearing::new(10.0, 0.0))]);
        // top, bottom, left, right
        assert_eq!(scenario.detectors(0, 0.0, 0.0), [true, true, false, true]);
        assert_eq!(scenario.detectors(0, 10.5, 0.0), [true, true, true, true]);
        assert_eq!(scenario.detectors(0, 20.0, 5.0), [false, true, true, false]);
        assert_eq!(scenario.detectors(0, 50.0, 0.0), [false; 4]);
        // strobe gap
        assert_eq!(scenario.detectors(150, 10.0, 0.0), [false; 4]);
    }

    #[test]
    fn sim_pins_are_active_low() {
        let bank = DetectorBank::new();
        let mut pins = bank.pins();
        bank.set([false, true, false, false]);
        assert!(pins[0].is_high().unwrap());
        assert!(pins[1].is_low().unwrap());
    }

    #[test]
    fn default_scene_loses_parks_and_reacquires() {
        let summary = run(&Config::default(), Scenario::default().duration_ms());
        let states: Vec<MonitorState> = summary.transitions.iter().map(|&(_, s)| s).collect();
        assert_eq!(
            states,
            vec![
                MonitorState::Searching,
                MonitorState::Parked,
                MonitorState::Tracking
            ]
        );
        assert_eq!(summary.final_state, MonitorState::Tracking);
        assert_eq!(summary.ticks, 45_000 / 20);

        // Beacon disappears at 14 s.
        let (searching_at, _) = summary.transitions[0];
        assert!((17_000..17_500).contains(&searching_at));
        let (parked_at, _) = summary.transitions[1];
        assert_eq!(parked_at - searching_at, 12_000);
        let (tracking_at, _) = summary.transitions[2];
        assert!((34_000..34_500).contains(&tracking_at));

        assert!((summary.pan_deg + 25.0).abs() < 10.0);
        assert!((summary.tilt_deg - 5.0).abs() < 3.0);
    }

    #[test]
    fn static_beacon_is_centred() {
        let scenario = Scenario::new(vec![Leg::hold(10_000, Bearing::new(-18.0, 12.0))]);
        let summary = run_scenario(&Config::default(), &scenario, 10_000);
        assert!(summary.transitions.is_empty());
        assert!((summary.pan_deg + 18.0).abs() < 10.0);
        assert!((summary.tilt_deg - 12.0).abs() < 3.0);
    }
}
