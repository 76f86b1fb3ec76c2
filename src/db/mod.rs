//! Result store
//!
//! Holds organization results, smart-match entries and file corrections in
//! memory and, when opened with a path, writes a JSON snapshot after every
//! mutation so status survives restarts. Writes are serialized.

pub mod corrections;
pub mod results;
pub mod smart_matches;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

pub use corrections::{FileCorrection, FileCorrectionRepository};
pub use results::{
    ExtractedInfo, OrganizationResult, OrganizationStatus, OrganizerType, QueryResult,
    ResolutionInfo, ResultQuery, ResultRepository, StatusClass, result_id,
};
pub use smart_matches::{SmartMatchEntry, SmartMatchRepository};

/// Everything the store persists
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreState {
    pub results: BTreeMap<String, OrganizationResult>,
    pub smart_matches: BTreeMap<Uuid, SmartMatchEntry>,
    pub corrections: BTreeMap<Uuid, FileCorrection>,
}

struct DatabaseInner {
    path: Option<PathBuf>,
    state: RwLock<StoreState>,
    write_lock: Mutex<()>,
}

/// Database wrapper shared by the organizer, scanner and service
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    /// A store that lives only as long as the process
    pub fn in_memory() -> Self {
        Self::from_state(None, StoreState::default())
    }

    /// Open a JSON-backed store, loading the existing snapshot if there is one
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let state = if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read store at {}", path.display()))?;
            serde_json::from_slice::<StoreState>(&bytes)
                .with_context(|| format!("Failed to parse store at {}", path.display()))?
        } else {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create store directory {}", parent.display())
                })?;
            }
            StoreState::default()
        };

        info!(
            path = %path.display(),
            results = state.results.len(),
            smart_matches = state.smart_matches.len(),
            "Result store opened"
        );

        Ok(Self::from_state(Some(path), state))
    }

    fn from_state(path: Option<PathBuf>, state: StoreState) -> Self {
        Self {
            inner: Arc::new(DatabaseInner {
                path,
                state: RwLock::new(state),
                write_lock: Mutex::new(()),
            }),
        }
    }

    pub fn results(&self) -> ResultRepository<'_> {
        ResultRepository::new(self)
    }

    pub fn smart_matches(&self) -> SmartMatchRepository<'_> {
        SmartMatchRepository::new(self)
    }

    pub fn file_corrections(&self) -> FileCorrectionRepository<'_> {
        FileCorrectionRepository::new(self)
    }

    pub(crate) fn read<T>(&self, f: impl FnOnce(&StoreState) -> T) -> T {
        f(&self.inner.state.read())
    }

    /// Apply a change and flush the snapshot when the store is file-backed
    pub(crate) async fn mutate(&self, f: impl FnOnce(&mut StoreState)) -> Result<()> {
        let _write = self.inner.write_lock.lock().await;

        let snapshot = {
            let mut state = self.inner.state.write();
            f(&mut state);
            match self.inner.path {
                Some(_) => Some(serde_json::to_vec_pretty(&*state)?),
                None => None,
            }
        };

        if let (Some(path), Some(bytes)) = (&self.inner.path, snapshot) {
            let tmp = path.with_extension("json.tmp");
            tokio::fs::write(&tmp, &bytes)
                .await
                .with_context(|| format!("Failed to write store snapshot {}", tmp.display()))?;
            tokio::fs::rename(&tmp, path)
                .await
                .with_context(|| format!("Failed to replace store at {}", path.display()))?;
            debug!(path = %path.display(), bytes = bytes.len(), "Store snapshot written");
        }

        Ok(())
    }
}
