//! Filesystem service used by the organizer and scanner
//!
//! Everything the engine does to disk goes through [`FileSystem`], so tests
//! can substitute failures (full disks, locked files) without touching the
//! real filesystem. Operations that change a directory are bracketed by
//! change-begin/change-complete notifications.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use tokio::fs;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangePhase {
    Begin,
    Complete,
}

/// Emitted around every move/copy/delete the organizer performs
#[derive(Debug, Clone)]
pub struct FileChangeEvent {
    pub path: PathBuf,
    pub phase: ChangePhase,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMetadata {
    pub len: u64,
    pub is_dir: bool,
    pub created: Option<SystemTime>,
    pub modified: Option<SystemTime>,
}

impl FileMetadata {
    /// Creation time, or modification time where the platform has none
    pub fn created_or_modified(&self) -> Option<SystemTime> {
        self.created.or(self.modified)
    }
}

#[async_trait]
pub trait FileSystem: Send + Sync {
    async fn metadata(&self, path: &Path) -> io::Result<FileMetadata>;

    async fn exists(&self, path: &Path) -> bool;

    /// True when the file can't be opened or another process holds a lock
    async fn is_locked(&self, path: &Path) -> bool;

    async fn copy(&self, from: &Path, to: &Path) -> io::Result<u64>;

    /// Move a file, copying across devices when a rename isn't possible
    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    async fn delete_file(&self, path: &Path) -> io::Result<()>;

    /// Remove an empty directory
    async fn delete_dir(&self, path: &Path) -> io::Result<()>;

    async fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Direct children of a directory
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Every file below `root`, recursively
    async fn walk_files(&self, root: &Path) -> io::Result<Vec<PathBuf>>;

    fn begin_change(&self, path: &Path);

    fn complete_change(&self, path: &Path);
}

/// [`FileSystem`] over the local disk
pub struct LocalFileSystem {
    change_sender: broadcast::Sender<FileChangeEvent>,
}

impl Default for LocalFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalFileSystem {
    pub fn new() -> Self {
        let (change_sender, _) = broadcast::channel(256);
        Self { change_sender }
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<FileChangeEvent> {
        self.change_sender.subscribe()
    }

    fn broadcast_change(&self, path: &Path, phase: ChangePhase) {
        let _ = self.change_sender.send(FileChangeEvent {
            path: path.to_path_buf(),
            phase,
            timestamp: Utc::now(),
        });
    }
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn metadata(&self, path: &Path) -> io::Result<FileMetadata> {
        let metadata = fs::metadata(path).await?;
        Ok(FileMetadata {
            len: metadata.len(),
            is_dir: metadata.is_dir(),
            created: metadata.created().ok(),
            modified: metadata.modified().ok(),
        })
    }

    async fn exists(&self, path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }

    async fn is_locked(&self, path: &Path) -> bool {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let file = match std::fs::File::open(&path) {
                Ok(f) => f,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "File not readable");
                    return true;
                }
            };
            match FileExt::try_lock_shared(&file) {
                Ok(()) => {
                    let _ = FileExt::unlock(&file);
                    false
                }
                Err(_) => true,
            }
        })
        .await
        .unwrap_or(true)
    }

    async fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        fs::copy(from, to).await
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        // Try rename first (fast, same filesystem)
        if let Err(e) = fs::rename(from, to).await {
            debug!(
                from = %from.display(),
                to = %to.display(),
                error = %e,
                "Rename failed, falling back to copy and delete"
            );
            fs::copy(from, to).await?;
            if let Err(e) = fs::remove_file(from).await {
                warn!(path = %from.display(), error = %e, "Failed to remove source after copy");
                return Err(e);
            }
        }
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path).await
    }

    async fn delete_dir(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir(path).await
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path).await
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = fs::read_dir(path).await?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            paths.push(entry.path());
        }
        Ok(paths)
    }

    async fn walk_files(&self, root: &Path) -> io::Result<Vec<PathBuf>> {
        let root = root.to_path_buf();
        tokio::task::spawn_blocking(move || {
            WalkDir::new(&root)
                .into_iter()
                .filter_map(|entry| match entry {
                    Ok(e) => Some(e),
                    Err(e) => {
                        debug!(error = %e, "Skipping unreadable entry");
                        None
                    }
                })
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .collect()
        })
        .await
        .map_err(io::Error::other)
    }

    fn begin_change(&self, path: &Path) {
        self.broadcast_change(path, ChangePhase::Begin);
    }

    fn complete_change(&self, path: &Path) {
        self.broadcast_change(path, ChangePhase::Complete);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rename_moves_file() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("a.mkv");
        let to = dir.path().join("b.mkv");
        std::fs::write(&from, b"data").unwrap();

        let fs = LocalFileSystem::new();
        fs.rename(&from, &to).await.unwrap();
        assert!(!fs.exists(&from).await);
        assert_eq!(fs.metadata(&to).await.unwrap().len, 4);
    }

    #[tokio::test]
    async fn test_is_locked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.mkv");
        std::fs::write(&path, b"data").unwrap();

        let fs = LocalFileSystem::new();
        assert!(!fs.is_locked(&path).await);
        assert!(fs.is_locked(&dir.path().join("missing.mkv")).await);
    }

    #[tokio::test]
    async fn test_walk_files_is_recursive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("x/y")).unwrap();
        std::fs::write(dir.path().join("x/y/a.mkv"), b"1").unwrap();
        std::fs::write(dir.path().join("b.srt"), b"1").unwrap();

        let fs = LocalFileSystem::new();
        let mut files = fs.walk_files(dir.path()).await.unwrap();
        files.sort();
        assert_eq!(files.len(), 2);
    }

    #[tokio::test]
    async fn test_change_notifications() {
        let fs = LocalFileSystem::new();
        let mut rx = fs.subscribe();
        fs.begin_change(Path::new("/library/show"));
        fs.complete_change(Path::new("/library/show"));
        assert_eq!(rx.recv().await.unwrap().phase, ChangePhase::Begin);
        assert_eq!(rx.recv().await.unwrap().phase, ChangePhase::Complete);
    }
}
