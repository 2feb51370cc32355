use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Device capability as reported by the Ring account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Doorbell,
    Camera,
    Chime,
}

/// A device registered on the account. Enumerated fresh on every refresh,
/// never persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct Device {
    pub id: i64,
    #[serde(rename = "description")]
    pub name: String,
    #[serde(skip_deserializing, default = "default_device_kind")]
    pub kind: DeviceKind,
}

fn default_device_kind() -> DeviceKind {
    DeviceKind::Camera
}

impl Device {
    /// Chimes have no event history and are never polled
    pub fn is_monitored(&self) -> bool {
        matches!(self.kind, DeviceKind::Doorbell | DeviceKind::Camera)
    }
}

/// Event kind enumeration, with unknown kinds carried verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Ding,
    Motion,
    OnDemand,
    Other(String),
}

impl EventKind {
    /// Wire/filename slug for the kind
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Ding => "ding",
            EventKind::Motion => "motion",
            EventKind::OnDemand => "on_demand",
            EventKind::Other(kind) => kind,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for EventKind {
    fn from(kind: &str) -> Self {
        match kind {
            "ding" => EventKind::Ding,
            "motion" => EventKind::Motion,
            "on_demand" => EventKind::OnDemand,
            other => EventKind::Other(other.to_string()),
        }
    }
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let kind = String::deserialize(deserializer)?;
        Ok(EventKind::from(kind.as_str()))
    }
}

/// Recording processing state attached to a history entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingInfo {
    pub status: Option<String>,
}

/// One entry of a device's event history. Immutable once observed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoorbellEvent {
    pub id: i64,
    pub kind: EventKind,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub answered: bool,
    #[serde(default)]
    pub recording: Option<RecordingInfo>,
}

impl DoorbellEvent {
    /// The vendor marks a clip downloadable with status "ready"
    pub fn recording_ready(&self) -> bool {
        self.recording
            .as_ref()
            .and_then(|r| r.status.as_deref())
            .map_or(false, |status| status == "ready")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_round_trips_known_slugs() {
        assert_eq!(EventKind::from("ding"), EventKind::Ding);
        assert_eq!(EventKind::from("motion"), EventKind::Motion);
        assert_eq!(EventKind::from("on_demand"), EventKind::OnDemand);
        assert_eq!(EventKind::Ding.as_str(), "ding");
        assert_eq!(EventKind::OnDemand.as_str(), "on_demand");
    }

    #[test]
    fn event_kind_keeps_unknown_slugs() {
        let kind = EventKind::from("alarm");
        assert_eq!(kind, EventKind::Other("alarm".to_string()));
        assert_eq!(kind.as_str(), "alarm");
    }

    #[test]
    fn history_entry_deserializes_from_vendor_json() {
        let json = r#"{
            "id": 7012345678901234567,
            "kind": "motion",
            "created_at": "2024-01-15T14:30:00Z",
            "answered": false,
            "recording": { "status": "ready" }
        }"#;
        let event: DoorbellEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.kind, EventKind::Motion);
        assert!(event.recording_ready());
    }

    #[test]
    fn missing_recording_status_is_not_ready() {
        let json = r#"{"id": 1, "kind": "ding", "created_at": "2024-01-15T14:30:00Z"}"#;
        let event: DoorbellEvent = serde_json::from_str(json).unwrap();
        assert!(!event.recording_ready());

        let json = r#"{
            "id": 2, "kind": "ding", "created_at": "2024-01-15T14:30:00Z",
            "recording": { "status": "processing" }
        }"#;
        let event: DoorbellEvent = serde_json::from_str(json).unwrap();
        assert!(!event.recording_ready());
    }
}
