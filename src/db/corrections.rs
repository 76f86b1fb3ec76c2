//! File corrections found by the naming audit

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Database;
use super::results::QueryResult;

/// An on-disk file whose name drifted from what the active template produces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCorrection {
    pub id: Uuid,
    pub current_path: PathBuf,
    pub corrected_path: PathBuf,
    pub series_name: String,
}

pub struct FileCorrectionRepository<'a> {
    db: &'a Database,
}

impl<'a> FileCorrectionRepository<'a> {
    pub(super) fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn get(&self, id: Uuid) -> Option<FileCorrection> {
        self.db.read(|state| state.corrections.get(&id).cloned())
    }

    pub fn get_page(&self, start_index: usize, limit: Option<usize>) -> QueryResult<FileCorrection> {
        let mut all: Vec<FileCorrection> =
            self.db.read(|state| state.corrections.values().cloned().collect());
        all.sort_by(|a, b| {
            a.series_name
                .cmp(&b.series_name)
                .then_with(|| a.current_path.cmp(&b.current_path))
        });
        let total_record_count = all.len();
        let items = all
            .into_iter()
            .skip(start_index)
            .take(limit.unwrap_or(usize::MAX))
            .collect();
        QueryResult {
            items,
            total_record_count,
        }
    }

    /// Replace the stored corrections with a fresh audit
    pub async fn replace_all(&self, corrections: &[FileCorrection]) -> Result<()> {
        self.db
            .mutate(|state| {
                state.corrections.clear();
                for c in corrections {
                    state.corrections.insert(c.id, c.clone());
                }
            })
            .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut removed = false;
        self.db
            .mutate(|state| removed = state.corrections.remove(&id).is_some())
            .await?;
        Ok(removed)
    }
}
