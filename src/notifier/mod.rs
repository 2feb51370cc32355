pub mod message;
pub mod pushover;
pub mod sms;

pub use message::{Notification, Priority};
pub use pushover::PushoverChannel;
pub use sms::SmsChannel;

use crate::config::{ChannelKind, NotifierConfig};
use crate::error::Error;
use async_trait::async_trait;
use std::sync::Arc;

/// One outbound delivery channel. Exactly one is active per process.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Deliver a notification. Errors are the caller's to log; they must
    /// never take down the polling loop.
    async fn send(&self, notification: &Notification) -> Result<(), Error>;

    /// Whether image attachments get delivered
    fn supports_attachments(&self) -> bool {
        false
    }
}

/// Build the channel the configuration selects
pub fn create_channel(config: &NotifierConfig) -> Result<Arc<dyn NotificationChannel>, Error> {
    match config.channel {
        ChannelKind::Pushover => Ok(Arc::new(PushoverChannel::new(config.pushover.clone())?)),
        ChannelKind::Sms => Ok(Arc::new(SmsChannel::new(config.sms.clone())?)),
    }
}
