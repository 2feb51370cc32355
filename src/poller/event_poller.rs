use crate::archiver::VideoArchiver;
use crate::config::PollerConfig;
use crate::device_manager::{Device, DeviceSession, DoorbellEvent, EventKind};
use crate::error::Error;
use crate::notifier::{message, NotificationChannel};
use crate::poller::health::ConnectionHealth;
use chrono::Utc;
use log::{error, info, warn};
use std::collections::HashMap;
use std::sync::Arc;

/// Fixed-interval poller. Holds the last-seen event id per device and the
/// connection health state; both are in-memory only and reset on restart.
pub struct EventPoller {
    session: Arc<dyn DeviceSession>,
    channel: Arc<dyn NotificationChannel>,
    archiver: Option<Arc<VideoArchiver>>,
    config: PollerConfig,
    last_seen: HashMap<i64, i64>,
    health: ConnectionHealth,
}

/// Entries strictly newer than `last_seen`, ordered oldest first.
///
/// `history` arrives newest first from the vendor. An unknown `last_seen`
/// yields nothing: first observation records, it does not notify. When the
/// boundary id has already rotated out of the batch, the whole batch is
/// newer and all of it is returned.
fn collect_new_events(history: &[DoorbellEvent], last_seen: Option<i64>) -> Vec<DoorbellEvent> {
    let Some(last_seen) = last_seen else {
        return Vec::new();
    };

    let mut fresh: Vec<DoorbellEvent> = history
        .iter()
        .take_while(|event| event.id != last_seen)
        .cloned()
        .collect();
    fresh.reverse();
    fresh
}

impl EventPoller {
    pub fn new(
        session: Arc<dyn DeviceSession>,
        channel: Arc<dyn NotificationChannel>,
        archiver: Option<Arc<VideoArchiver>>,
        config: PollerConfig,
    ) -> Self {
        let threshold = config.failure_threshold;
        Self {
            session,
            channel,
            archiver,
            config,
            last_seen: HashMap::new(),
            health: ConnectionHealth::new(threshold),
        }
    }

    /// Record the newest event id per device so pre-existing history never
    /// notifies. Runs once before the loop starts.
    pub async fn init_tracking(&mut self) -> Result<(), Error> {
        info!("Initializing event tracking");
        let devices = self.session.devices().await?;

        for device in devices.iter().filter(|d| d.is_monitored()) {
            let history = self.session.history(device, 1).await?;
            if let Some(newest) = history.first() {
                self.last_seen.insert(device.id, newest.id);
                info!("  {}: last event ID {}", device.name, newest.id);
            }
        }
        Ok(())
    }

    /// One polling cycle. Refresh errors are counted, never fatal; the
    /// first success after a disconnect sends the recovery notification.
    pub async fn poll_once(&mut self) {
        match self.check_devices().await {
            Ok(()) => {
                if let Some(outage) = self.health.record_success(Utc::now()) {
                    let downtime = outage.downtime_human();
                    info!("Connection restored! (Was down for {})", downtime);

                    let notification = message::recovery_notification(
                        &outage.lost_at,
                        &outage.restored_at,
                        &downtime,
                    );
                    if let Err(e) = self.channel.send(&notification).await {
                        error!("Error sending recovery notification: {}", e);
                    }
                }
            }
            Err(e) => {
                if self.health.record_failure(Utc::now()) {
                    warn!("Connection lost! Will notify when restored.");
                }
                error!(
                    "Error checking events ({}): {}",
                    self.health.consecutive_failures(),
                    e
                );
            }
        }
    }

    async fn check_devices(&mut self) -> Result<(), Error> {
        let devices = self.session.devices().await?;
        for device in devices.iter().filter(|d| d.is_monitored()) {
            self.check_device(device).await?;
        }
        Ok(())
    }

    async fn check_device(&mut self, device: &Device) -> Result<(), Error> {
        let history = self
            .session
            .history(device, self.config.history_limit)
            .await?;
        let Some(newest) = history.first() else {
            return Ok(());
        };

        let last_seen = self.last_seen.get(&device.id).copied();
        if last_seen == Some(newest.id) {
            return Ok(());
        }

        for event in collect_new_events(&history, last_seen) {
            self.process_event(device, &event).await;
        }
        self.last_seen.insert(device.id, newest.id);
        Ok(())
    }

    /// Notify for one event, archiving its recording first when enabled.
    /// Download and delivery failures are logged, not propagated.
    async fn process_event(&self, device: &Device, event: &DoorbellEvent) {
        info!(
            "New event: device={} kind={} time={}",
            device.name, event.kind, event.created_at
        );

        let mut notification = message::event_notification(device, event);

        let mut snapshot_path = None;
        if self.channel.supports_attachments() {
            if let Some(archiver) = &self.archiver {
                if let Ok(Some(bytes)) = self.session.snapshot(device).await {
                    snapshot_path = archiver.save_snapshot(device, &bytes).await;
                }
            }
        }

        if let Some(archiver) = &self.archiver {
            if matches!(event.kind, EventKind::Ding | EventKind::Motion) {
                info!("Waiting for video to be ready...");
                tokio::time::sleep(self.config.video_ready_delay()).await;

                match archiver.archive_event(device, event).await {
                    Ok(Some(_)) => notification.note_saved_video(),
                    Ok(None) => {}
                    Err(e) => warn!("Error downloading video: {}", e),
                }
            }
        }

        let notification = notification.with_attachment(snapshot_path);
        if let Err(e) = self.channel.send(&notification).await {
            error!("Error sending notification: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device_manager::DeviceKind;
    use crate::notifier::Notification;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    struct MockSession {
        devices: Vec<Device>,
        histories: Mutex<HashMap<i64, Vec<DoorbellEvent>>>,
        failing: Mutex<bool>,
    }

    impl MockSession {
        fn new(devices: Vec<Device>) -> Self {
            Self {
                devices,
                histories: Mutex::new(HashMap::new()),
                failing: Mutex::new(false),
            }
        }

        fn set_history(&self, device_id: i64, history: Vec<DoorbellEvent>) {
            self.histories.lock().unwrap().insert(device_id, history);
        }

        fn set_failing(&self, failing: bool) {
            *self.failing.lock().unwrap() = failing;
        }
    }

    #[async_trait]
    impl DeviceSession for MockSession {
        async fn devices(&self) -> Result<Vec<Device>, Error> {
            if *self.failing.lock().unwrap() {
                return Err(Error::Api("connection refused".to_string()));
            }
            Ok(self.devices.clone())
        }

        async fn history(
            &self,
            device: &Device,
            limit: usize,
        ) -> Result<Vec<DoorbellEvent>, Error> {
            let histories = self.histories.lock().unwrap();
            let mut history = histories.get(&device.id).cloned().unwrap_or_default();
            history.truncate(limit);
            Ok(history)
        }

        async fn recording_url(&self, _ding_id: i64) -> Result<Option<String>, Error> {
            Ok(None)
        }

        async fn snapshot(&self, _device: &Device) -> Result<Option<Vec<u8>>, Error> {
            Ok(None)
        }
    }

    struct MockChannel {
        sent: Mutex<Vec<Notification>>,
    }

    impl MockChannel {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent_bodies(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|n| n.body.clone())
                .collect()
        }

        fn sent_titles(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|n| n.title.clone())
                .collect()
        }
    }

    #[async_trait]
    impl NotificationChannel for MockChannel {
        async fn send(&self, notification: &Notification) -> Result<(), Error> {
            self.sent.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    fn doorbell(id: i64) -> Device {
        Device {
            id,
            name: format!("Door {}", id),
            kind: DeviceKind::Doorbell,
        }
    }

    // Kind carries the id so the notification body identifies the event
    fn event(id: i64) -> DoorbellEvent {
        DoorbellEvent {
            id,
            kind: EventKind::Other(format!("e{}", id)),
            created_at: Utc.timestamp_opt(1_700_000_000 + id, 0).unwrap(),
            answered: false,
            recording: None,
        }
    }

    fn poller(
        session: Arc<MockSession>,
        channel: Arc<MockChannel>,
    ) -> EventPoller {
        EventPoller::new(session, channel, None, PollerConfig::default())
    }

    #[tokio::test]
    async fn collect_new_returns_only_newer_entries_oldest_first() {
        let history = vec![event(30), event(20), event(10), event(5)];
        let fresh = collect_new_events(&history, Some(10));
        let ids: Vec<i64> = fresh.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![20, 30]);
    }

    #[tokio::test]
    async fn collect_new_with_unknown_boundary_takes_whole_batch() {
        let history = vec![event(30), event(20), event(10)];
        let fresh = collect_new_events(&history, Some(1));
        let ids: Vec<i64> = fresh.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn backlog_is_notified_oldest_first_and_last_seen_advances() {
        let session = Arc::new(MockSession::new(vec![doorbell(1)]));
        let channel = Arc::new(MockChannel::new());
        let mut poller = poller(session.clone(), channel.clone());

        session.set_history(1, vec![event(10)]);
        poller.init_tracking().await.unwrap();

        session.set_history(1, vec![event(30), event(20), event(10)]);
        poller.poll_once().await;

        let bodies = channel.sent_bodies();
        assert_eq!(bodies.len(), 2);
        assert!(bodies[0].starts_with("e20 event"));
        assert!(bodies[1].starts_with("e30 event"));

        // Nothing new on the next cycle: no further notifications
        poller.poll_once().await;
        assert_eq!(channel.sent_bodies().len(), 2);
    }

    #[tokio::test]
    async fn unchanged_newest_id_produces_no_notification() {
        let session = Arc::new(MockSession::new(vec![doorbell(1)]));
        let channel = Arc::new(MockChannel::new());
        let mut poller = poller(session.clone(), channel.clone());

        session.set_history(1, vec![event(10), event(5)]);
        poller.init_tracking().await.unwrap();
        poller.poll_once().await;
        poller.poll_once().await;

        assert!(channel.sent_bodies().is_empty());
    }

    #[tokio::test]
    async fn first_observation_records_without_notifying() {
        let session = Arc::new(MockSession::new(vec![doorbell(1)]));
        let channel = Arc::new(MockChannel::new());
        // No init_tracking: the device appears with existing history
        let mut poller = poller(session.clone(), channel.clone());

        session.set_history(1, vec![event(30), event(20), event(10)]);
        poller.poll_once().await;
        assert!(channel.sent_bodies().is_empty());

        // Only events after tracking started notify
        session.set_history(1, vec![event(40), event(30), event(20)]);
        poller.poll_once().await;
        let bodies = channel.sent_bodies();
        assert_eq!(bodies.len(), 1);
        assert!(bodies[0].starts_with("e40 event"));
    }

    #[tokio::test]
    async fn recovery_notification_sent_exactly_once_after_outage() {
        let session = Arc::new(MockSession::new(vec![doorbell(1)]));
        let channel = Arc::new(MockChannel::new());
        let mut poller = poller(session.clone(), channel.clone());

        session.set_history(1, vec![event(10)]);
        poller.init_tracking().await.unwrap();

        session.set_failing(true);
        for _ in 0..5 {
            poller.poll_once().await;
        }
        assert!(channel.sent_titles().is_empty());

        session.set_failing(false);
        poller.poll_once().await;
        poller.poll_once().await;

        let titles = channel.sent_titles();
        let recoveries = titles
            .iter()
            .filter(|t| t.as_str() == "Ring Connection Restored")
            .count();
        assert_eq!(recoveries, 1);
    }

    #[tokio::test]
    async fn failures_below_threshold_do_not_trigger_recovery() {
        let session = Arc::new(MockSession::new(vec![doorbell(1)]));
        let channel = Arc::new(MockChannel::new());
        let mut poller = poller(session.clone(), channel.clone());

        session.set_history(1, vec![event(10)]);
        poller.init_tracking().await.unwrap();

        session.set_failing(true);
        poller.poll_once().await;
        poller.poll_once().await;
        session.set_failing(false);
        poller.poll_once().await;

        assert!(channel.sent_titles().is_empty());
    }
}
