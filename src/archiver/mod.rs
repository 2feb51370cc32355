pub mod clip;
pub mod download;
pub mod storage_cleanup;

pub use clip::{parse_clip_filename, ClipInfo};
pub use download::VideoArchiver;
pub use storage_cleanup::{ArchiveStats, StorageCleanup};
