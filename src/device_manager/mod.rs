pub mod auth;
pub mod models;
pub mod ring_client;

pub use models::{Device, DeviceKind, DoorbellEvent, EventKind, RecordingInfo};
pub use ring_client::{DeviceSession, RingClient};
