pub mod api;
pub mod archiver;
pub mod config;
pub mod device_manager;
pub mod error;
pub mod notifier;
pub mod poller;

pub use error::Error;
