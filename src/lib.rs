pub mod clock;
pub mod collector;
pub mod config;
pub mod database;
pub mod error;
pub mod monitor;
pub mod notifier;

pub use error::MonitorError;
