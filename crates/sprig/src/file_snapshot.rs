//
// file_snapshot.rs
//
// Disk snapshots used to decide whether cached derived data is still valid
//

use std::path::Path;
use std::time::SystemTime;

/// Snapshot metadata for a file on disk, used to determine cache validity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileSnapshot {
    /// File modification time (from filesystem metadata)
    pub mtime: SystemTime,
    /// File size in bytes
    pub size: u64,
}

impl FileSnapshot {
    /// Create snapshot from filesystem metadata
    pub fn from_metadata(metadata: &std::fs::Metadata) -> Self {
        Self {
            mtime: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            size: metadata.len(),
        }
    }

    /// Check if this snapshot matches current disk state
    pub fn matches_disk(&self, current: &FileSnapshot) -> bool {
        self.mtime == current.mtime && self.size == current.size
    }
}

/// Get file snapshot from disk (synchronous).
pub fn get_file_snapshot(path: &Path) -> Option<FileSnapshot> {
    let metadata = std::fs::metadata(path).ok()?;
    Some(FileSnapshot::from_metadata(&metadata))
}
