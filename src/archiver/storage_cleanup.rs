use crate::error::Error;
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Cleanup stops once usage drops to this fraction of the quota, so a
/// single new clip doesn't immediately trigger the next pass
const QUOTA_HYSTERESIS: f64 = 0.9;

/// Archive usage summary
#[derive(Debug, Clone, Copy)]
pub struct ArchiveStats {
    pub clip_count: usize,
    pub used_bytes: u64,
    pub max_bytes: u64,
}

impl std::fmt::Display for ArchiveStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Videos: {} | Storage: {:.2}GB / {:.2}GB",
            self.clip_count,
            self.used_bytes as f64 / GIB,
            self.max_bytes as f64 / GIB
        )
    }
}

/// Enforces the archive directory quota by evicting the oldest clips
pub struct StorageCleanup {
    videos_dir: PathBuf,
    max_bytes: u64,
}

impl StorageCleanup {
    pub fn new(videos_dir: &Path, max_bytes: u64) -> Self {
        Self {
            videos_dir: videos_dir.to_path_buf(),
            max_bytes,
        }
    }

    /// Total size of everything under the archive directory
    pub fn directory_usage(&self) -> u64 {
        directory_size(&self.videos_dir)
    }

    pub fn stats(&self) -> ArchiveStats {
        ArchiveStats {
            clip_count: self.clip_files().len(),
            used_bytes: self.directory_usage(),
            max_bytes: self.max_bytes,
        }
    }

    /// Delete oldest clips until usage is at or below 90% of the quota.
    /// Returns the number of files removed.
    pub fn enforce_quota(&self) -> Result<u64, Error> {
        let mut usage = self.directory_usage();
        if usage <= self.max_bytes {
            return Ok(0);
        }

        info!(
            "Storage limit exceeded ({:.2}GB / {:.2}GB), cleaning up oldest videos",
            usage as f64 / GIB,
            self.max_bytes as f64 / GIB
        );

        let mut clips = self.clip_files();
        clips.sort_by_key(|clip| clip.modified);

        let target = (self.max_bytes as f64 * QUOTA_HYSTERESIS) as u64;
        let mut deleted = 0;

        for clip in clips {
            if usage <= target {
                break;
            }
            match std::fs::remove_file(&clip.path) {
                Ok(()) => {
                    usage = usage.saturating_sub(clip.size);
                    deleted += 1;
                    info!(
                        "Deleted {} ({:.2}GB)",
                        clip.path
                            .file_name()
                            .map(|n| n.to_string_lossy().to_string())
                            .unwrap_or_default(),
                        clip.size as f64 / GIB
                    );
                }
                Err(e) => {
                    warn!("Failed to delete {}: {}", clip.path.display(), e);
                }
            }
        }

        info!(
            "Cleanup complete, current usage {:.2}GB ({} files deleted)",
            usage as f64 / GIB,
            deleted
        );
        Ok(deleted)
    }

    /// Clip files with their size and modification time
    fn clip_files(&self) -> Vec<ClipFile> {
        let pattern = self.videos_dir.join("*.mp4");
        let Ok(paths) = glob::glob(&pattern.to_string_lossy()) else {
            return Vec::new();
        };

        paths
            .filter_map(|entry| {
                let path = entry.ok()?;
                let metadata = std::fs::metadata(&path).ok()?;
                if !metadata.is_file() {
                    return None;
                }
                Some(ClipFile {
                    size: metadata.len(),
                    modified: metadata.modified().ok()?,
                    path,
                })
            })
            .collect()
    }
}

struct ClipFile {
    path: PathBuf,
    size: u64,
    modified: SystemTime,
}

fn directory_size(dir: &Path) -> u64 {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };

    entries
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let metadata = entry.metadata().ok()?;
            if metadata.is_dir() {
                Some(directory_size(&entry.path()))
            } else {
                Some(metadata.len())
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::time::Duration;

    fn temp_archive(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "ring-watch-cleanup-{}-{}",
            tag,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_clip(dir: &Path, name: &str, size: usize, age_secs: u64) {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(&vec![0u8; size]).unwrap();
        file.sync_all().unwrap();

        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        let file = File::options().write(true).open(&path).unwrap();
        file.set_modified(mtime).unwrap();
    }

    #[test]
    fn under_quota_deletes_nothing() {
        let dir = temp_archive("under");
        write_clip(&dir, "20240101_000000_Door_motion_1.mp4", 100, 300);

        let cleanup = StorageCleanup::new(&dir, 10_000);
        assert_eq!(cleanup.enforce_quota().unwrap(), 0);
        assert!(dir.join("20240101_000000_Door_motion_1.mp4").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn oldest_clips_evicted_down_to_hysteresis_target() {
        let dir = temp_archive("evict");
        // 4 clips of 1000 bytes; quota 2500, target 2250 -> two deletions
        write_clip(&dir, "20240101_000000_Door_motion_1.mp4", 1000, 400);
        write_clip(&dir, "20240102_000000_Door_motion_2.mp4", 1000, 300);
        write_clip(&dir, "20240103_000000_Door_motion_3.mp4", 1000, 200);
        write_clip(&dir, "20240104_000000_Door_motion_4.mp4", 1000, 100);

        let cleanup = StorageCleanup::new(&dir, 2500);
        assert_eq!(cleanup.enforce_quota().unwrap(), 2);

        // The two oldest are gone, the two newest survive
        assert!(!dir.join("20240101_000000_Door_motion_1.mp4").exists());
        assert!(!dir.join("20240102_000000_Door_motion_2.mp4").exists());
        assert!(dir.join("20240103_000000_Door_motion_3.mp4").exists());
        assert!(dir.join("20240104_000000_Door_motion_4.mp4").exists());

        let usage = cleanup.directory_usage();
        assert!(usage <= 2250, "usage {} above hysteresis target", usage);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn non_clip_files_count_toward_usage_but_are_never_deleted() {
        let dir = temp_archive("mixed");
        write_clip(&dir, "20240101_000000_Door_motion_1.mp4", 1000, 200);
        std::fs::write(dir.join("notes.txt"), vec![0u8; 1000]).unwrap();

        let cleanup = StorageCleanup::new(&dir, 1500);
        cleanup.enforce_quota().unwrap();

        assert!(dir.join("notes.txt").exists());
        assert!(!dir.join("20240101_000000_Door_motion_1.mp4").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn stats_reports_clip_count_and_usage() {
        let dir = temp_archive("stats");
        write_clip(&dir, "20240101_000000_Door_motion_1.mp4", 500, 100);
        write_clip(&dir, "20240102_000000_Door_ding_2.mp4", 500, 50);

        let cleanup = StorageCleanup::new(&dir, 10_000);
        let stats = cleanup.stats();
        assert_eq!(stats.clip_count, 2);
        assert_eq!(stats.used_bytes, 1000);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
