use crate::device_manager::EventKind;
use chrono::{DateTime, Local};

/// Spaces and slashes would break the filename convention
pub fn sanitize_device_name(name: &str) -> String {
    name.replace(' ', "_").replace('/', "_")
}

/// Deterministic clip name: `{timestamp}_{device}_{kind}_{event id}.mp4`
pub fn clip_filename(
    timestamp: DateTime<Local>,
    device_name: &str,
    kind: &EventKind,
    event_id: i64,
) -> String {
    format!(
        "{}_{}_{}_{}.mp4",
        timestamp.format("%Y%m%d_%H%M%S"),
        sanitize_device_name(device_name),
        kind,
        event_id
    )
}

/// Metadata recovered from a clip filename. The names are the archive's
/// only persisted index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipInfo {
    pub device: String,
    pub kind: String,
    pub date: String,
    pub time: String,
    pub event_id: String,
}

/// Parse a clip filename back into its parts. The device name may itself
/// contain underscores, so the kind and event id anchor from the end.
pub fn parse_clip_filename(filename: &str) -> Option<ClipInfo> {
    let stem = filename.strip_suffix(".mp4")?;
    let parts: Vec<&str> = stem.split('_').collect();
    if parts.len() < 5 {
        return None;
    }

    let date_str = parts[0];
    let time_str = parts[1];
    if date_str.len() != 8 || time_str.len() != 6 {
        return None;
    }

    let device = parts[2..parts.len() - 2].join(" ");
    let kind = capitalize(parts[parts.len() - 2]);
    let event_id = parts[parts.len() - 1].to_string();

    let date = format!("{}/{}/{}", &date_str[4..6], &date_str[6..8], &date_str[0..4]);
    let time = format!(
        "{}:{}:{}",
        &time_str[0..2],
        &time_str[2..4],
        &time_str[4..6]
    );

    Some(ClipInfo {
        device,
        kind,
        date,
        time,
        event_id,
    })
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
