use anyhow::{ensure, Context};
use motion::{MonitorConfig, PanConfig, SearchConfig, TiltConfig, TrackingConfig};
use sensors::{SensorConfig, MAX_WINDOW};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Every tunable of the turret, one TOML section per component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sensors: SensorConfig,
    pub pan: PanConfig,
    pub tilt: TiltConfig,
    pub tracking: TrackingConfig,
    pub monitor: MonitorConfig,
    pub search: SearchConfig,
    pub control: ControlConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Target loop period.
    pub period_ms: u32,
    /// How often the status line is logged.
    pub report_interval_ms: u64,
    /// Watchdog timeout on hardware builds.
    pub watchdog_timeout_s: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        ControlConfig {
            period_ms: 20,
            report_interval_ms: 500,
            watchdog_timeout_s: 4,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        // Try external file first
        let path = Path::new("config.toml");
        let config = if path.exists() {
            let config = Self::load_from(path)?;
            log::info!("Loaded configuration from {}", path.display());
            config
        } else {
            // Fallback to embedded defaults
            let config = Self::from_toml_str(include_str!("../config.toml.example"))?;
            log::warn!("Using embedded default configuration");
            config
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Reject combinations the control loop cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let (p, t, k, w) = (&self.pan, &self.tilt, &self.tracking, &self.search);
        let tunables = [
            ("pan.limit_deg", p.limit_deg),
            ("pan.min_speed", p.min_speed),
            ("pan.deg_per_sec", p.deg_per_sec),
            ("pan.home_tolerance_deg", p.home_tolerance_deg),
            ("pan.park_speed", p.park_speed),
            ("tilt.min_deg", t.min_deg),
            ("tilt.max_deg", t.max_deg),
            ("tilt.home_deg", t.home_deg),
            ("tilt.scan_deg", t.scan_deg),
            ("tilt.step_deg", t.step_deg),
            ("tracking.fast_speed", k.fast_speed),
            ("tracking.slow_speed", k.slow_speed),
            ("search.sweep_deg", w.sweep_deg),
            ("search.sweep_speed", w.sweep_speed),
        ];
        for (name, value) in tunables {
            ensure!(value.is_finite(), "{} must be finite, got {}", name, value);
        }

        let s = &self.sensors;
        ensure!(
            (1..=MAX_WINDOW).contains(&s.window),
            "sensors.window must be 1..={}, got {}",
            MAX_WINDOW,
            s.window
        );
        ensure!(
            s.active_threshold >= 1 && s.active_threshold <= s.window,
            "sensors.active_threshold ({}) must be within 1..=window ({})",
            s.active_threshold,
            s.window
        );
        ensure!(s.saturation_ms > 0, "sensors.saturation_ms must be positive");

        ensure!(p.limit_deg > 0.0, "pan.limit_deg must be positive");
        ensure!(
            (0.0..1.0).contains(&p.min_speed),
            "pan.min_speed must be in [0, 1), got {}",
            p.min_speed
        );
        ensure!(p.deg_per_sec > 0.0, "pan.deg_per_sec must be positive");
        ensure!(p.home_tolerance_deg > 0.0, "pan.home_tolerance_deg must be positive");
        ensure!(
            p.park_speed > 0.0 && p.park_speed <= 1.0 && p.park_speed >= p.min_speed,
            "pan.park_speed ({}) must be in [min_speed, 1]",
            p.park_speed
        );

        ensure!(
            t.min_deg >= 0.0 && t.min_deg <= t.max_deg && t.max_deg <= 180.0,
            "tilt range [{}, {}] must lie within [0, 180]",
            t.min_deg,
            t.max_deg
        );
        ensure!(
            (t.min_deg..=t.max_deg).contains(&t.home_deg),
            "tilt.home_deg {} is outside [{}, {}]",
            t.home_deg,
            t.min_deg,
            t.max_deg
        );
        ensure!(
            (t.min_deg..=t.max_deg).contains(&t.scan_deg),
            "tilt.scan_deg {} is outside [{}, {}]",
            t.scan_deg,
            t.min_deg,
            t.max_deg
        );
        ensure!(t.step_deg > 0.0, "tilt.step_deg must be positive");
        ensure!(
            t.min_pulse_us < t.max_pulse_us,
            "tilt.min_pulse_us must be below tilt.max_pulse_us"
        );

        ensure!(
            k.slow_speed > 0.0 && k.slow_speed <= k.fast_speed && k.fast_speed <= 1.0,
            "tracking speeds must satisfy 0 < slow ({}) <= fast ({}) <= 1",
            k.slow_speed,
            k.fast_speed
        );
        ensure!(
            k.slow_speed >= p.min_speed,
            "tracking.slow_speed {} falls inside the pan dead zone ({})",
            k.slow_speed,
            p.min_speed
        );

        let m = &self.monitor;
        ensure!(
            m.present_holdoff_ms <= m.search_ms && m.search_ms < m.park_ms,
            "monitor timings must satisfy holdoff ({}) <= search ({}) < park ({})",
            m.present_holdoff_ms,
            m.search_ms,
            m.park_ms
        );
        ensure!(m.blink_half_period_ms > 0, "monitor.blink_half_period_ms must be positive");

        ensure!(
            w.sweep_deg > 0.0 && w.sweep_deg <= p.limit_deg,
            "search.sweep_deg {} must be in (0, pan.limit_deg]",
            w.sweep_deg
        );
        ensure!(
            w.sweep_speed >= p.min_speed && w.sweep_speed <= 1.0,
            "search.sweep_speed {} must be in [pan.min_speed, 1]",
            w.sweep_speed
        );

        ensure!(self.control.period_ms > 0, "control.period_ms must be positive");
        Ok(())
    }

    pub fn get_tick_period_ms(&self) -> u32 {
        self.control.period_ms
    }

    pub fn get_watchdog_timeout_s(&self) -> u64 {
        self.control.watchdog_timeout_s
    }
}
