pub mod config;
pub mod control;
#[cfg(not(target_os = "espidf"))]
pub mod sim;
