use crate::archiver::ArchiveStats;
use crate::device_manager::{Device, DoorbellEvent, EventKind};
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Delivery priority, on Pushover's scale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Lowest,
    Low,
    Normal,
    High,
    Emergency,
}

impl Priority {
    /// Numeric value the Pushover API expects
    pub fn pushover_value(&self) -> i8 {
        match self {
            Priority::Lowest => -2,
            Priority::Low => -1,
            Priority::Normal => 0,
            Priority::High => 1,
            Priority::Emergency => 2,
        }
    }
}

/// A formatted notification, channel-agnostic
#[derive(Debug, Clone)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub priority: Priority,
    /// JPEG to attach when the channel supports it
    pub attachment: Option<PathBuf>,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>, priority: Priority) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            priority,
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, attachment: Option<PathBuf>) -> Self {
        self.attachment = attachment;
        self
    }

    /// Append the archived-clip line to the body
    pub fn note_saved_video(&mut self) {
        self.body.push_str("\n\nVideo saved locally");
    }
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Build the notification for a device event. Title, body, and priority
/// depend on the event kind.
pub fn event_notification(device: &Device, event: &DoorbellEvent) -> Notification {
    let time = format_time(&event.created_at);
    match &event.kind {
        EventKind::Ding => Notification::new(
            format!("Doorbell: {}", device.name),
            format!("Doorbell pressed\nTime: {}", time),
            Priority::High,
        ),
        EventKind::Motion => Notification::new(
            format!("Motion: {}", device.name),
            format!("Motion detected\nTime: {}", time),
            Priority::Normal,
        ),
        EventKind::OnDemand => Notification::new(
            format!("Live View: {}", device.name),
            format!("Live view started\nTime: {}", time),
            Priority::Normal,
        ),
        EventKind::Other(kind) => Notification::new(
            format!("Ring: {}", device.name),
            format!("{} event\nTime: {}", kind, time),
            Priority::Normal,
        ),
    }
}

/// Sent once when monitoring begins
pub fn started_notification(downloads_enabled: bool) -> Notification {
    let mut body = "Ring Watch is now active and monitoring your devices!".to_string();
    if downloads_enabled {
        body.push_str("\n\nVideo recording enabled");
    }
    Notification::new("Ring Watch Started", body, Priority::Normal)
}

/// Sent on interrupt, before exit
pub fn stopped_notification(stats: Option<&ArchiveStats>) -> Notification {
    let mut body = "Ring Watch has been stopped.".to_string();
    if let Some(stats) = stats {
        body.push_str(&format!("\n\n{}", stats));
    }
    Notification::new("Ring Watch Stopped", body, Priority::Low)
}

/// Sent once after a disconnect/reconnect cycle
pub fn recovery_notification(
    lost_at: &DateTime<Utc>,
    restored_at: &DateTime<Utc>,
    downtime: &str,
) -> Notification {
    Notification::new(
        "Ring Connection Restored",
        format!(
            "Connection restored at {}\n\nLost connection at: {}\nDowntime: {}\n\n\
             Monitoring resumed. Any events during downtime were not recorded.",
            format_time(restored_at),
            format_time(lost_at),
            downtime
        ),
        Priority::High,
    )
}
