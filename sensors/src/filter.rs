use heapless::Deque;

use crate::reading::ChannelState;

/// Largest sliding window a channel can be configured with.
pub const MAX_WINDOW: usize = 32;

/// Debounce and saturation state for one directional detector.
///
/// The window is pre-filled with inactive samples, so it always holds exactly
/// `window` samples and a freshly reset channel reads [`ChannelState::Inactive`].
#[derive(Debug, Clone)]
pub struct SensorChannel {
    samples: Deque<bool, MAX_WINDOW>,
    window: usize,
    active_run_ms: u32,
    saturated: bool,
}

impl SensorChannel {
    /// # Panics
    ///
    /// If `window` is zero or larger than [`MAX_WINDOW`].
    pub fn new(window: usize) -> SensorChannel {
        assert!(
            (1..=MAX_WINDOW).contains(&window),
            "filter window must be 1..={}, got {}",
            MAX_WINDOW,
            window
        );
        let mut channel = SensorChannel {
            samples: Deque::new(),
            window,
            active_run_ms: 0,
            saturated: false,
        };
        channel.reset();
        channel
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        for _ in 0..self.window {
            // len < window <= MAX_WINDOW
            let _ = self.samples.push_back(false);
        }
        self.active_run_ms = 0;
        self.saturated = false;
    }

    /// Push this tick's raw sample, dropping the oldest one.
    pub fn push(&mut self, active: bool, tick_ms: u32, saturation_ms: u32) {
        self.samples.pop_front();
        let _ = self.samples.push_back(active);

        if active {
            self.active_run_ms = self.active_run_ms.saturating_add(tick_ms);
        } else {
            self.active_run_ms = 0;
        }
        self.saturated = self.active_run_ms >= saturation_ms;
    }

    /// Number of active samples currently in the window.
    pub fn active_count(&self) -> usize {
        self.samples.iter().filter(|s| **s).count()
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// How long the channel has been continuously active, in milliseconds.
    pub fn active_run_ms(&self) -> u32 {
        self.active_run_ms
    }

    pub fn is_saturated(&self) -> bool {
        self.saturated
    }

    /// Majority vote over the window; saturation wins over any vote count.
    pub fn evaluate(&self, active_threshold: usize) -> ChannelState {
        if self.saturated {
            ChannelState::Saturated
        } else if self.active_count() >= active_threshold {
            ChannelState::Active
        } else {
            ChannelState::Inactive
        }
    }
}
