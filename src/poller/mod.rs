pub mod event_poller;
pub mod health;

pub use event_poller::EventPoller;
pub use health::{ConnectionHealth, Outage};
