use crate::archiver::clip;
use crate::archiver::storage_cleanup::{ArchiveStats, StorageCleanup};
use crate::device_manager::{Device, DeviceSession, DoorbellEvent};
use crate::error::Error;
use chrono::Local;
use futures_util::StreamExt;
use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Downloads event recordings into the archive directory, keeping the
/// directory inside its storage quota
pub struct VideoArchiver {
    session: Arc<dyn DeviceSession>,
    cleanup: StorageCleanup,
    videos_dir: PathBuf,
    http: reqwest::Client,
}

impl VideoArchiver {
    pub fn new(
        session: Arc<dyn DeviceSession>,
        videos_dir: &Path,
        max_storage_bytes: u64,
    ) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| Error::Download(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            session,
            cleanup: StorageCleanup::new(videos_dir, max_storage_bytes),
            videos_dir: videos_dir.to_path_buf(),
            http,
        })
    }

    pub fn stats(&self) -> ArchiveStats {
        self.cleanup.stats()
    }

    /// Download the recording for an event. Quota enforcement runs first;
    /// a recording that is not yet "ready" or has no URL is skipped with
    /// `Ok(None)`, no retry scheduled.
    pub async fn archive_event(
        &self,
        device: &Device,
        event: &DoorbellEvent,
    ) -> Result<Option<PathBuf>, Error> {
        self.cleanup.enforce_quota()?;

        if !event.recording_ready() {
            info!("Video not ready yet for event {}", event.id);
            return Ok(None);
        }

        let url = match self.session.recording_url(event.id).await? {
            Some(url) => url,
            None => {
                info!("No video URL available for event {}", event.id);
                return Ok(None);
            }
        };

        let filename = clip::clip_filename(Local::now(), &device.name, &event.kind, event.id);
        let path = self.videos_dir.join(&filename);
        info!("Downloading video to {}", filename);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Download(format!("Video request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| Error::Download(format!("Video download rejected: {}", e)))?;

        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| Error::Io(format!("Failed to create {}: {}", path.display(), e)))?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::Download(format!("Stream error: {}", e)))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::Io(format!("Failed to write {}: {}", path.display(), e)))?;
        }
        file.flush()
            .await
            .map_err(|e| Error::Io(e.to_string()))?;

        let size = tokio::fs::metadata(&path)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        info!("Video saved ({:.2}MB)", size as f64 / (1024.0 * 1024.0));

        Ok(Some(path))
    }

    /// Write a snapshot JPEG next to the clips so the notifier can attach
    /// it. Failures here are not worth failing the event over.
    pub async fn save_snapshot(&self, device: &Device, bytes: &[u8]) -> Option<PathBuf> {
        let filename = format!(
            "{}_{}_snapshot.jpg",
            Local::now().format("%Y%m%d_%H%M%S"),
            clip::sanitize_device_name(&device.name)
        );
        let path = self.videos_dir.join(filename);
        match tokio::fs::write(&path, bytes).await {
            Ok(()) => Some(path),
            Err(e) => {
                log::warn!("Failed to save snapshot {}: {}", path.display(), e);
                None
            }
        }
    }
}
