//! Episode naming audit
//!
//! Compares episode files already in the TV library against the names the
//! current templates produce, and renames the ones a user selects.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::FileCorrection;
use crate::services::catalog::{CatalogFilter, CatalogItem, CatalogKind, NameMatch};
use crate::services::file_utils::extension_of;
use crate::services::naming::{EpisodeNaming, render_episode_file, render_season_folder};
use crate::services::organizer::OrganizationEngine;

#[derive(Clone)]
pub struct FileCorrectionAuditor {
    engine: OrganizationEngine,
}

impl FileCorrectionAuditor {
    pub fn new(engine: OrganizationEngine) -> Self {
        Self { engine }
    }

    /// Re-run the audit and replace the stored corrections
    pub async fn audit(&self) -> Result<Vec<FileCorrection>> {
        let ctx = self.engine.context();
        let filter = CatalogFilter {
            kind: CatalogKind::Series,
            name: None,
            name_match: NameMatch::Exact,
            year: None,
        };
        let series = ctx
            .matcher
            .catalog()
            .find_items(&filter)
            .await
            .context("Failed to list series for audit")?;

        let mut corrections = Vec::new();
        for item in &series {
            corrections.extend(self.audit_series(item));
        }

        ctx.db.file_corrections().replace_all(&corrections).await?;
        info!(
            series = series.len(),
            corrections = corrections.len(),
            "File name audit complete"
        );
        Ok(corrections)
    }

    fn audit_series(&self, item: &CatalogItem) -> Vec<FileCorrection> {
        let mut corrections = Vec::new();
        for file in &item.files {
            let (Some(season), Some(episode)) = (file.season, file.episode) else {
                continue;
            };
            let Some(expected) = self.expected_path(item, &file.path, season, episode) else {
                continue;
            };
            if expected != file.path {
                debug!(current = %file.path.display(), corrected = %expected.display(), "File name differs from template");
                corrections.push(FileCorrection {
                    id: Uuid::new_v4(),
                    current_path: file.path.clone(),
                    corrected_path: expected,
                    series_name: item.name.clone(),
                });
            }
        }
        corrections
    }

    fn expected_path(
        &self,
        item: &CatalogItem,
        current: &Path,
        season: u32,
        episode: u32,
    ) -> Option<PathBuf> {
        let ctx = self.engine.context();
        let tv = &ctx.options.tv;
        let file_name = current.file_name()?.to_string_lossy().to_string();
        let info = ctx.parser.parse_episode(&file_name);
        let extension = extension_of(current).unwrap_or_default();
        let stem = current.file_stem()?.to_string_lossy().to_string();

        let naming = EpisodeNaming {
            series_name: &item.name,
            series_year: item.year,
            season,
            episode,
            ending_episode: info.ending_episode_number,
            episode_name: info.episode_name.as_deref(),
            resolution: &info.resolution.name,
            extension: &extension,
            original_stem: &stem,
        };
        let file = render_episode_file(
            &tv.episode_name_pattern,
            &tv.multi_episode_name_pattern,
            &naming,
        )
        .ok()?;
        let season_folder = render_season_folder(
            &tv.season_folder_pattern,
            &tv.season_zero_folder_name,
            &item.name,
            season,
        )
        .ok()?;
        Some(item.path.join(season_folder).join(file))
    }

    /// Rename the selected corrections. Returns how many were applied.
    pub async fn apply(&self, ids: &[Uuid]) -> Result<usize> {
        let ctx = self.engine.context();
        let mut applied = 0;
        for id in ids {
            let Some(correction) = ctx.db.file_corrections().get(*id) else {
                warn!(correction_id = %id, "File correction not found");
                continue;
            };
            if ctx.fs.exists(&correction.corrected_path).await {
                warn!(
                    path = %correction.corrected_path.display(),
                    "Corrected file name already exists, skipping"
                );
                continue;
            }

            let directory = correction
                .corrected_path
                .parent()
                .unwrap_or(&correction.corrected_path)
                .to_path_buf();
            ctx.fs.begin_change(&directory);
            let renamed = self.rename(&correction).await;
            ctx.fs.complete_change(&directory);
            renamed?;
            ctx.db.file_corrections().delete(*id).await?;

            info!(
                original = %correction.current_path.display(),
                new = %correction.corrected_path.display(),
                "Applied file correction"
            );
            applied += 1;
        }
        Ok(applied)
    }

    async fn rename(&self, correction: &FileCorrection) -> Result<()> {
        let fs = &self.engine.context().fs;
        if let Some(parent) = correction.corrected_path.parent() {
            fs.create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create folder {}", parent.display()))?;
        }
        fs.rename(&correction.current_path, &correction.corrected_path)
            .await
            .with_context(|| format!("Failed to rename {}", correction.current_path.display()))
    }
}
