pub mod status_led {
    use embedded_hal::digital::OutputPin;
    use log::*;

    /// What the indicator should be doing.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum LedPattern {
        Solid,
        Blink,
        Off,
    }

    /// Single-colour status LED with its own blink timer.
    ///
    /// Blink timing only depends on the timestamps passed to [`StatusLed::show`],
    /// not on how often it is called.
    pub struct StatusLed<P> {
        pin: P,
        half_period_ms: u64,
        lit: bool,
        last_toggle_ms: u64,
    }

    impl<P> StatusLed<P>
    where
        P: OutputPin,
    {
        pub fn new(pin: P, half_period_ms: u64) -> StatusLed<P> {
            StatusLed {
                pin,
                half_period_ms,
                lit: false,
                last_toggle_ms: 0,
            }
        }

        pub fn display_healthy(&mut self) {
            self.write(true);
        }

        pub fn show(&mut self, pattern: LedPattern, now_ms: u64) {
            match pattern {
                LedPattern::Solid => self.write(true),
                LedPattern::Off => self.write(false),
                LedPattern::Blink => {
                    if now_ms.saturating_sub(self.last_toggle_ms) >= self.half_period_ms {
                        self.last_toggle_ms = now_ms;
                        self.write(!self.lit);
                    } else {
                        self.write(self.lit);
                    }
                }
            }
        }

        pub fn is_lit(&self) -> bool {
            self.lit
        }

        fn write(&mut self, on: bool) {
            let result = if on {
                self.pin.set_high()
            } else {
                self.pin.set_low()
            };
            if let Err(e) = result {
                warn!("Status LED write failed: {:?}", e);
            }
            self.lit = on;
        }
    }

}

pub use status_led::{LedPattern, StatusLed};
