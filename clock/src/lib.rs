pub mod clock {
    use log::*;
    use std::cell::Cell;
    use std::thread;
    use std::time::{Duration, Instant};

    /// Monotonic millisecond time source consumed by the control loop.
    pub trait Clock {
        fn now_ms(&self) -> u64;
    }

    /// Wall clock backed by `Instant`, counting from construction.
    pub struct MonotonicClock {
        origin: Instant,
    }

    impl MonotonicClock {
        pub fn new() -> MonotonicClock {
            MonotonicClock {
                origin: Instant::now(),
            }
        }
    }

    impl Default for MonotonicClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Clock for MonotonicClock {
        fn now_ms(&self) -> u64 {
            self.origin.elapsed().as_millis() as u64
        }
    }

    /// Clock that only moves when told to. Used by the bench simulation and tests.
    #[derive(Debug, Default)]
    pub struct ManualClock {
        now: Cell<u64>,
    }

    impl ManualClock {
        pub fn new(start_ms: u64) -> ManualClock {
            ManualClock {
                now: Cell::new(start_ms),
            }
        }

        pub fn advance(&self, ms: u64) {
            self.now.set(self.now.get() + ms);
        }
    }

    impl Clock for ManualClock {
        fn now_ms(&self) -> u64 {
            self.now.get()
        }
    }

    /// Pads each loop iteration up to a fixed period.
    ///
    /// An iteration that runs long is not compensated on the next one; the loop
    /// just runs slower for that cycle.
    #[derive(Debug, Clone, Copy)]
    pub struct TickPacer {
        period: Duration,
    }

    impl TickPacer {
        pub fn new(period_ms: u32) -> TickPacer {
            TickPacer {
                period: Duration::from_millis(period_ms as u64),
            }
        }

        pub fn period_ms(&self) -> u32 {
            self.period.as_millis() as u32
        }

        /// Time left in the current tick, `None` if it has already overrun.
        pub fn remaining(&self, elapsed: Duration) -> Option<Duration> {
            self.period.checked_sub(elapsed)
        }

        /// Sleep out the rest of the tick that started at `tick_start`.
        pub fn wait(&self, tick_start: Instant) {
            let elapsed = tick_start.elapsed();
            match self.remaining(elapsed) {
                Some(pad) => thread::sleep(pad),
                None => warn!(
                    "Tick overran: {:?} against a {:?} period",
                    elapsed, self.period
                ),
            }
        }
    }

}

pub use clock::{Clock, ManualClock, MonotonicClock, TickPacer};
