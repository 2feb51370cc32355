use chrono::{DateTime, Utc};

/// One completed disconnect/reconnect cycle
#[derive(Debug, Clone)]
pub struct Outage {
    pub lost_at: DateTime<Utc>,
    pub restored_at: DateTime<Utc>,
}

impl Outage {
    /// Human-readable downtime, e.g. "3 minutes and 12 seconds"
    pub fn downtime_human(&self) -> String {
        let total = (self.restored_at - self.lost_at).num_seconds().max(0);
        let minutes = total / 60;
        let seconds = total % 60;

        if minutes > 0 {
            format!(
                "{} minute{} and {} second{}",
                minutes,
                if minutes != 1 { "s" } else { "" },
                seconds,
                if seconds != 1 { "s" } else { "" }
            )
        } else {
            format!("{} second{}", seconds, if seconds != 1 { "s" } else { "" })
        }
    }
}

/// Counts consecutive polling failures and tracks the down/up transition.
/// Lives on the poller instance; nothing here is persisted.
#[derive(Debug)]
pub struct ConnectionHealth {
    threshold: u32,
    consecutive_failures: u32,
    down_since: Option<DateTime<Utc>>,
}

impl ConnectionHealth {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            consecutive_failures: 0,
            down_since: None,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Record a failed cycle. Returns true exactly when this failure
    /// crosses the threshold and the session transitions to down.
    pub fn record_failure(&mut self, now: DateTime<Utc>) -> bool {
        self.consecutive_failures += 1;
        if self.down_since.is_none() && self.consecutive_failures >= self.threshold {
            self.down_since = Some(now);
            return true;
        }
        false
    }

    /// Record a successful cycle. Returns the outage when the session was
    /// previously down; the failure counter resets either way.
    pub fn record_success(&mut self, now: DateTime<Utc>) -> Option<Outage> {
        self.consecutive_failures = 0;
        self.down_since.take().map(|lost_at| Outage {
            lost_at,
            restored_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn disconnect_entered_exactly_once_at_threshold() {
        let mut health = ConnectionHealth::new(3);
        let now = Utc::now();

        assert!(!health.record_failure(now));
        assert!(!health.record_failure(now));
        assert!(health.record_failure(now));
        // Already down, no second transition
        assert!(!health.record_failure(now));
        assert_eq!(health.consecutive_failures(), 4);
    }

    #[test]
    fn success_yields_one_outage_and_resets() {
        let mut health = ConnectionHealth::new(3);
        let lost = Utc::now();
        for _ in 0..3 {
            health.record_failure(lost);
        }

        let restored = lost + Duration::seconds(95);
        let outage = health.record_success(restored).expect("outage expected");
        assert_eq!(outage.lost_at, lost);
        assert_eq!(outage.restored_at, restored);
        assert_eq!(health.consecutive_failures(), 0);

        // A second success reports nothing
        assert!(health.record_success(restored).is_none());
    }

    #[test]
    fn failures_below_threshold_never_report_an_outage() {
        let mut health = ConnectionHealth::new(3);
        let now = Utc::now();
        health.record_failure(now);
        health.record_failure(now);
        assert!(health.record_success(now).is_none());
        assert_eq!(health.consecutive_failures(), 0);
    }

    #[test]
    fn downtime_formats_minutes_and_seconds() {
        let lost = Utc::now();
        let outage = Outage {
            lost_at: lost,
            restored_at: lost + Duration::seconds(95),
        };
        assert_eq!(outage.downtime_human(), "1 minute and 35 seconds");

        let outage = Outage {
            lost_at: lost,
            restored_at: lost + Duration::seconds(1),
        };
        assert_eq!(outage.downtime_human(), "1 second");

        let outage = Outage {
            lost_at: lost,
            restored_at: lost + Duration::seconds(30),
        };
        assert_eq!(outage.downtime_human(), "30 seconds");
    }
}
