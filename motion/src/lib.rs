pub mod monitor;
pub mod pan;
pub mod search;
pub mod servo;
pub mod states;
pub mod tilt;
pub mod tracking;

#[cfg(test)]
mod test_support;

pub use monitor::{MonitorConfig, SignalMonitor};
pub use pan::{PanConfig, PanController};
pub use search::{SearchConfig, SearchSweep};
pub use servo::Servo;
pub use states::MonitorState;
pub use tilt::{TiltConfig, TiltController};
pub use tracking::{TrackingConfig, TrackingEngine};
