//! Signal-presence hysteresis.
//!
//! Time since the last positive detection decides the state:
//!
//! ```text
//!  detection ──────────────────────────────► TRACKING (from any state)
//!  elapsed < present_holdoff                 unchanged
//!  elapsed >= park_ms                        PARKED
//!  elapsed >= search_ms                      SEARCHING
//!  otherwise                                 unchanged
//! ```
//!
//! Every update records the state it started from, so callers can run
//! one-shot entry actions on the tick a transition happens.

use embedded_hal::digital::OutputPin;
use serde::{Deserialize, Serialize};
use status_led::StatusLed;

use crate::states::MonitorState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Dropouts shorter than this never start the loss clock.
    pub present_holdoff_ms: u64,
    pub search_ms: u64,
    pub park_ms: u64,
    /// Half-cycle of the status blink while searching.
    pub blink_half_period_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            present_holdoff_ms: 500,
            search_ms: 3000,
            park_ms: 15_000,
            blink_half_period_ms: 500,
        }
    }
}

pub struct SignalMonitor {
    config: MonitorConfig,
    state: MonitorState,
    previous: MonitorState,
    last_detection_ms: u64,
}

impl SignalMonitor {
    /// Starts in `Tracking` with the loss clock at `now_ms`.
    pub fn new(config: MonitorConfig, now_ms: u64) -> SignalMonitor {
        SignalMonitor {
            config,
            state: MonitorState::Tracking,
            previous: MonitorState::Tracking,
            last_detection_ms: now_ms,
        }
    }

    pub fn init(&mut self, now_ms: u64) {
        self.state = MonitorState::Tracking;
        self.previous = MonitorState::Tracking;
        self.last_detection_ms = now_ms;
    }

    pub fn update(&mut self, detected: bool, now_ms: u64) {
        self.previous = self.state;

        if detected {
            self.last_detection_ms = now_ms;
            self.state = MonitorState::Tracking;
            return;
        }

        let elapsed = self.elapsed_since_detection(now_ms);
        if elapsed < self.config.present_holdoff_ms {
            return;
        }

        if elapsed >= self.config.park_ms {
            self.state = MonitorState::Parked;
        } else if elapsed >= self.config.search_ms {
            self.state = MonitorState::Searching;
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// State before the most recent `update`.
    pub fn previous_state(&self) -> MonitorState {
        self.previous
    }

    pub fn state_changed(&self) -> bool {
        self.state != self.previous
    }

    pub fn last_detection_ms(&self) -> u64 {
        self.last_detection_ms
    }

    pub fn elapsed_since_detection(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_detection_ms)
    }

    pub fn update_status_led<P>(&self, led: &mut StatusLed<P>, now_ms: u64)
    where
        P: OutputPin,
    {
        led.show(self.state.led_pattern(), now_ms);
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }
}
