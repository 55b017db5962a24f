mod filter;
mod reading;

pub mod sensors {
    use embedded_hal::digital::InputPin;
    use log::*;
    use serde::{Deserialize, Serialize};

    use crate::filter::{SensorChannel, MAX_WINDOW};
    use crate::reading::{Channel, Direction, SensorReading};

    /// Debounce tuning for the detector channels.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct SensorConfig {
        /// Sliding window length, in samples.
        pub window: usize,
        /// Active samples required within the window to report `Active`.
        pub active_threshold: usize,
        /// Continuous activity after which a channel is reported `Saturated`.
        pub saturation_ms: u32,
        /// Detectors pull their output low while they see the carrier.
        pub active_low: bool,
    }

    impl Default for SensorConfig {
        fn default() -> Self {
            SensorConfig {
                window: 8,
                active_threshold: 6,
                saturation_ms: 2000,
                active_low: true,
            }
        }
    }

    /// Four directional detectors (top, bottom, left, right) with per-channel
    /// majority-vote filtering and a stuck-active guard.
    pub struct SensorArray<P> {
        pins: [P; 4],
        channels: [SensorChannel; 4],
        config: SensorConfig,
        tick_ms: u32,
    }

    impl<P> SensorArray<P>
    where
        P: InputPin,
    {
        /// Pins are ordered top, bottom, left, right.
        ///
        /// # Panics
        ///
        /// If the window is outside `1..=32` or the threshold exceeds it.
        pub fn new(pins: [P; 4], config: SensorConfig, tick_ms: u32) -> SensorArray<P> {
            assert!(
                config.window <= MAX_WINDOW,
                "filter window {} exceeds {}",
                config.window,
                MAX_WINDOW
            );
            assert!(
                config.active_threshold >= 1 && config.active_threshold <= config.window,
                "active threshold {} must be within 1..={}",
                config.active_threshold,
                config.window
            );

            let channel = SensorChannel::new(config.window);
            SensorArray {
                pins,
                channels: [channel.clone(), channel.clone(), channel.clone(), channel],
                config,
                tick_ms,
            }
        }

        /// Clear every channel's filter state.
        pub fn init(&mut self) {
            for channel in self.channels.iter_mut() {
                channel.reset();
            }
        }

        /// Sample all four pins and push the result into the filters.
        pub fn update(&mut self) {
            let active_low = self.config.active_low;
            let mut raw = [false; 4];
            let pins = self.pins.iter_mut().zip(Channel::ALL);
            for (sample, (pin, channel)) in raw.iter_mut().zip(pins) {
                let level = if active_low {
                    pin.is_low()
                } else {
                    pin.is_high()
                };
                // A failed read counts as no signal this tick.
                *sample = match level {
                    Ok(active) => active,
                    Err(e) => {
                        warn!("{:?} detector read failed: {:?}", channel, e);
                        false
                    }
                };
            }
            self.push_samples(raw);
        }

        fn push_samples(&mut self, raw: [bool; 4]) {
            for (channel, active) in self.channels.iter_mut().zip(raw) {
                channel.push(active, self.tick_ms, self.config.saturation_ms);
            }
        }

        pub fn filtered(&self) -> SensorReading {
            let threshold = self.config.active_threshold;
            SensorReading {
                top: self.channel(Channel::Top).evaluate(threshold),
                bottom: self.channel(Channel::Bottom).evaluate(threshold),
                left: self.channel(Channel::Left).evaluate(threshold),
                right: self.channel(Channel::Right).evaluate(threshold),
            }
        }

        pub fn direction(&self) -> Direction {
            self.filtered().direction()
        }

        pub fn channel(&self, channel: Channel) -> &SensorChannel {
            &self.channels[channel.index()]
        }

        pub fn config(&self) -> &SensorConfig {
            &self.config
        }
    }

}

pub use filter::{SensorChannel, MAX_WINDOW};
pub use reading::{Channel, ChannelState, Direction, SensorReading};
pub use sensors::{SensorArray, SensorConfig};
