//! The per-tick pipeline.
//!
//! `Turret` owns exactly one of each component and runs them in a fixed order
//! every tick: sample, filter, monitor, branch on state, integrate pan
//! position, refresh the indicator. Nothing here blocks; pacing and the
//! watchdog belong to the caller.

use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::pwm::SetDutyCycle;
use log::*;
use motion::{
    MonitorState, PanController, SearchSweep, SignalMonitor, TiltController, TrackingEngine,
};
use sensors::{SensorArray, SensorReading};
use status_led::StatusLed;

use crate::config::Config;

/// Peripherals the core is handed at startup.
pub struct Hardware<I, S, T, L> {
    /// Top, bottom, left, right.
    pub sensor_pins: [I; 4],
    pub pan_pwm: S,
    pub tilt_pwm: T,
    pub status_led: L,
}

/// What happened during one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub state: MonitorState,
    pub changed: bool,
    pub reading: SensorReading,
    pub pan_speed: f32,
    pub pan_position_deg: f32,
    pub tilt_deg: f32,
}

pub struct Turret<I, S, T, L> {
    sensors: SensorArray<I>,
    monitor: SignalMonitor,
    pan: PanController<S>,
    tilt: TiltController<T>,
    tracker: TrackingEngine,
    sweep: SearchSweep,
    led: StatusLed<L>,
    period_ms: u32,
    report_interval_ms: u64,
    last_report_ms: Option<u64>,
    homed: bool,
}

impl<I, S, T, L> Turret<I, S, T, L>
where
    I: InputPin,
    S: SetDutyCycle,
    T: SetDutyCycle,
    L: OutputPin,
{
    /// Build every component from `config`. The configuration is expected to
    /// have passed [`Config::validate`].
    ///
    /// # Panics
    ///
    /// If a section violates its component's contract.
    pub fn new(hardware: Hardware<I, S, T, L>, config: &Config, now_ms: u64) -> Self {
        let period_ms = config.control.period_ms;
        let mut led = StatusLed::new(hardware.status_led, config.monitor.blink_half_period_ms);
        led.display_healthy();

        Turret {
            sensors: SensorArray::new(hardware.sensor_pins, config.sensors.clone(), period_ms),
            monitor: SignalMonitor::new(config.monitor.clone(), now_ms),
            pan: PanController::new(hardware.pan_pwm, config.pan.clone()),
            tilt: TiltController::new(hardware.tilt_pwm, config.tilt.clone(), now_ms),
            tracker: TrackingEngine::new(config.tracking.clone()),
            sweep: SearchSweep::new(config.search.clone()),
            led,
            period_ms,
            report_interval_ms: config.control.report_interval_ms,
            last_report_ms: None,
            homed: false,
        }
    }

    pub fn tick(&mut self, now_ms: u64) -> TickReport {
        self.sensors.update();
        let reading = self.sensors.filtered();

        self.monitor.update(reading.any_active(), now_ms);
        let state = self.monitor.state();
        let changed = self.monitor.state_changed();
        if changed {
            self.on_enter(state, self.monitor.previous_state());
        }

        match state {
            MonitorState::Tracking => {
                self.tracker
                    .update(&reading, &mut self.pan, &mut self.tilt, now_ms);
            }
            MonitorState::Searching => {
                self.sweep.step(&mut self.pan, &mut self.tilt);
            }
            MonitorState::Parked => {
                let arrived = self.pan.park_home();
                self.tilt.park_home();
                if arrived && !self.homed {
                    // The only point where dead-reckoning drift is known to be gone.
                    self.pan.reset_position();
                    self.homed = true;
                    info!("Pan homed, position estimate re-zeroed");
                }
            }
        }

        // Runs in every state; it is the only position feedback.
        self.pan.update_position(self.period_ms);

        self.monitor.update_status_led(&mut self.led, now_ms);

        let report = TickReport {
            state,
            changed,
            reading,
            pan_speed: self.pan.speed(),
            pan_position_deg: self.pan.position_deg(),
            tilt_deg: self.tilt.angle(),
        };
        self.log_status(&report, now_ms);
        report
    }

    fn on_enter(&mut self, state: MonitorState, from: MonitorState) {
        match state {
            MonitorState::Tracking => {
                info!("[Transition] {} -> TRACKING", from);
            }
            MonitorState::Searching => {
                self.tracker.halt(&mut self.pan);
                self.sweep.reset(self.pan.position_deg());
                info!(
                    "[Transition] {} -> SEARCHING, sweeping {} first from {:.1}°",
                    from,
                    if self.sweep.is_clockwise() { "CW" } else { "CCW" },
                    self.pan.position_deg()
                );
            }
            MonitorState::Parked => {
                self.tracker.halt(&mut self.pan);
                self.homed = false;
                info!("[Transition] {} -> PARKED", from);
            }
        }
    }

    /// True at most once per `report_interval_ms`; the first call always reports.
    fn report_due(&mut self, now_ms: u64) -> bool {
        let due = self
            .last_report_ms
            .map(|t| now_ms.saturating_sub(t) >= self.report_interval_ms)
            .unwrap_or(true);
        if due {
            self.last_report_ms = Some(now_ms);
        }
        due
    }

    fn log_status(&mut self, report: &TickReport, now_ms: u64) {
        if !self.report_due(now_ms) {
            return;
        }
        debug!(
            "State={}  Pan={:.1}° ({} us)  Tilt={:.0}° ({} us)  Sensors: {}  Direction={:?}",
            report.state,
            report.pan_position_deg,
            self.pan.pulse_us(),
            report.tilt_deg,
            self.tilt.pulse_us(),
            report.reading,
            report.reading.direction()
        );
    }

    pub fn state(&self) -> MonitorState {
        self.monitor.state()
    }

    /// Whether the pan estimate has been re-zeroed since the last park began.
    pub fn is_homed(&self) -> bool {
        self.homed
    }

    pub fn pan(&self) -> &PanController<S> {
        &self.pan
    }

    pub fn tilt(&self) -> &TiltController<T> {
        &self.tilt
    }

    pub fn sensors(&self) -> &SensorArray<I> {
        &self.sensors
    }

    pub fn led(&self) -> &StatusLed<L> {
        &self.led
    }

    pub fn period_ms(&self) -> u32 {
        self.period_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{DetectorBank, SimLed, SimPin, SimPwm};

    const PERIOD: u64 = 20;

    struct Rig {
        turret: Turret<SimPin, SimPwm, SimPwm, SimLed>,
        bank: DetectorBank,
        pan_pwm: SimPwm,
        led: SimLed,
        now: u64,
    }

    impl Rig {
        fn new() -> Rig {
            let bank = DetectorBank::new();
            let pan_pwm = SimPwm::default();
            let led = SimLed::default();
            let hardware = Hardware {
                sensor_pins: bank.pins(),
                pan_pwm: pan_pwm.clone(),
                tilt_pwm: SimPwm::default(),
                status_led: led.clone(),
            };
            Rig {
                turret: Turret::new(hardware, &Config::default(), 0),
                bank,
                pan_pwm,
                led,
                now: 0,
            }
        }

        fn tick(&mut self, raw: [bool; 4]) -> TickReport {
            self.bank.set(raw);
            let report = self.turret.tick(self.now);
            self.now += PERIOD;
            report
        }

        fn run(&mut self, raw: [bool; 4], ms: u64) -> Vec<TickReport> {
            (0..ms / PERIOD).map(|_| self.tick(raw)).collect()
        }
    }

    const NONE: [bool; 4] = [false; 4];
    const RIGHT: [bool; 4] = [false, false, false, true];
    const TOP_LEFT: [bool; 4] = [true, false, true, false];

    #[test]
    fn boots_tracking_with_solid_indicator_and_idle_axes() {
        let mut rig = Rig::new();
        let report = rig.tick(NONE);
        assert_eq!(report.state, MonitorState::Tracking);
        assert!(!report.changed);
        assert_eq!(report.pan_speed, 0.0);
        assert_eq!(rig.pan_pwm.pulse_us(), 1500);
        assert!(rig.led.is_on());
    }

    #[test]
    fn filtered_signal_drives_the_axes() {
        let mut rig = Rig::new();
        let reports = rig.run(RIGHT, 5 * PERIOD);
        assert!(reports.iter().all(|r| r.pan_speed == 0.0));

        let report = rig.tick(RIGHT);
        assert!(report.reading.right_active());
        assert_eq!(report.pan_speed, 0.80);
        assert!(report.pan_position_deg > 0.0);

        rig.run(TOP_LEFT, 200);
        let report = rig.tick(TOP_LEFT);
        assert!(report.pan_speed < 0.0);
        assert!(report.tilt_deg > 0.0);
    }

    #[test]
    fn loss_walks_through_search_and_park() {
        let mut rig = Rig::new();
        rig.run(RIGHT, 1000);
        let tracked_to = rig.turret.pan().position_deg();
        assert!(tracked_to > 0.0);

        let reports = rig.run(NONE, 20_000);
        let transitions: Vec<(usize, MonitorState)> = reports
            .iter()
            .enumerate()
            .filter(|(_, r)| r.changed)
            .map(|(i, r)| (i, r.state))
            .collect();
        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[0].1, MonitorState::Searching);
        assert_eq!(transitions[1].1, MonitorState::Parked);

        // Entry into SEARCHING halts tracking and sweeps CCW back toward centre.
        let searching = &reports[transitions[0].0];
        assert!(searching.pan_speed < 0.0);
        assert_eq!(searching.tilt_deg, 20.0);

        // The estimate keeps integrating while searching.
        let a = reports[transitions[0].0 + 10].pan_position_deg;
        let b = reports[transitions[0].0 + 60].pan_position_deg;
        assert!(a != b);

        // Parked: homed and re-zeroed, indicator dark, tilt home.
        assert_eq!(rig.turret.state(), MonitorState::Parked);
        assert!(rig.turret.is_homed());
        assert_eq!(rig.turret.pan().position_deg(), 0.0);
        assert_eq!(rig.turret.pan().speed(), 0.0);
        assert_eq!(rig.turret.tilt().angle(), 0.0);
        assert!(!rig.led.is_on());
    }

    #[test]
    fn indicator_blinks_while_searching() {
        let mut rig = Rig::new();
        rig.run(RIGHT, 200);
        rig.run(NONE, 3500);
        assert_eq!(rig.turret.state(), MonitorState::Searching);

        let mut levels = Vec::new();
        for _ in 0..100 {
            rig.tick(NONE);
            levels.push(rig.led.is_on());
        }
        let toggles = levels.windows(2).filter(|w| w[0] != w[1]).count();
        // 2 s of 500 ms half-cycles
        assert!((3..=5).contains(&toggles));
    }

    #[test]
    fn recovers_on_the_first_tick_with_a_filtered_detection() {
        let mut rig = Rig::new();
        rig.run(NONE, 16_000);
        assert_eq!(rig.turret.state(), MonitorState::Parked);

        let reports = rig.run(RIGHT, 6 * PERIOD);
        assert!(reports[..5].iter().all(|r| r.state == MonitorState::Parked));
        assert_eq!(reports[5].state, MonitorState::Tracking);
        assert!(reports[5].changed);
        assert!(reports[5].pan_speed > 0.0);
    }

    #[test]
    fn status_line_is_throttled_to_the_report_interval() {
        let mut rig = Rig::new();
        assert!(rig.turret.report_due(0));
        assert!(!rig.turret.report_due(20));
        assert!(!rig.turret.report_due(480));
        assert!(rig.turret.report_due(500));
        assert!(!rig.turret.report_due(999));
        assert!(rig.turret.report_due(1000));

        // Ticking reports on the same cadence.
        let mut rig = Rig::new();
        rig.run(NONE, 1260);
        assert_eq!(rig.turret.last_report_ms, Some(1000));
    }

    #[test]
    #[should_panic(expected = "pan limit")]
    fn invalid_section_is_refused_at_construction() {
        let mut config = Config::default();
        config.pan.limit_deg = -10.0;
        let bank = DetectorBank::new();
        let hardware = Hardware {
            sensor_pins: bank.pins(),
            pan_pwm: SimPwm::default(),
            tilt_pwm: SimPwm::default(),
            status_led: SimLed::default(),
        };
        Turret::new(hardware, &config, 0);
    }

    #[test]
    fn stuck_detector_is_treated_as_loss() {
        let mut rig = Rig::new();
        let reports = rig.run(RIGHT, 6000);
        let last = reports.last().unwrap();
        assert!(!last.reading.any_active());
        assert_eq!(last.state, MonitorState::Searching);
    }
}
