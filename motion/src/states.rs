// States of the signal-presence machine and what each one shows on the
// status indicator.

use status_led::LedPattern;
use std::fmt;

/// - Tracking: beacon seen recently, the tracking engine drives both axes
/// - Searching: beacon lost for a while, pan sweeps with tilt at scan angle
/// - Parked: beacon lost for long, both axes return home and idle
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub enum MonitorState {
    #[default]
    Tracking,
    Searching,
    Parked,
}

impl MonitorState {
    /// Solid while tracking, blinking while searching, dark when parked.
    pub fn led_pattern(&self) -> LedPattern {
        match self {
            MonitorState::Tracking => LedPattern::Solid,
            MonitorState::Searching => LedPattern::Blink,
            MonitorState::Parked => LedPattern::Off,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorState::Tracking => "TRACKING",
            MonitorState::Searching => "SEARCHING",
            MonitorState::Parked => "PARKED",
        }
    }
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
