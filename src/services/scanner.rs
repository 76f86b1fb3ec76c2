//! Watch location scanner
//!
//! Walks the watch folders, picks out the files worth organizing, hands
//! them to the engine one at a time and tidies the folders afterwards.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::Result;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::db::{OrganizationStatus, OrganizerType};
use crate::services::classifier::{classify_path, subtitle_companion_type};
use crate::services::error::OrganizationError;
use crate::services::file_utils::{format_bytes, has_extension};
use crate::services::organizer::{OrganizationEngine, OrganizationEvent, OrganizeRequest};

/// What one scan did
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanSummary {
    pub files_seen: usize,
    pub processed: usize,
    /// Skipped because organization is disabled for their type
    pub skipped_disabled: usize,
    /// Skipped because a previous run already organized them
    pub already_organized: usize,
    /// Skipped because another attempt holds them
    pub in_progress: usize,
    /// Results dropped because their source file is gone
    pub pruned: usize,
    pub statuses: HashMap<OrganizationStatus, usize>,
    pub cancelled: bool,
}

impl ScanSummary {
    pub fn count(&self, status: OrganizationStatus) -> usize {
        self.statuses.get(&status).copied().unwrap_or(0)
    }
}

struct Candidate {
    path: PathBuf,
    created: SystemTime,
    is_subtitle: bool,
}

#[derive(Clone)]
pub struct WatchLocationScanner {
    engine: OrganizationEngine,
}

impl WatchLocationScanner {
    pub fn new(engine: OrganizationEngine) -> Self {
        Self { engine }
    }

    /// Files under `root` that qualify for organization, oldest first with
    /// subtitles after media
    pub async fn eligible_files(&self, root: &Path) -> Vec<PathBuf> {
        let ctx = self.engine.context();
        let options = &ctx.options;
        let min_size = options.min_file_size_bytes();
        let ignored: Vec<String> = options
            .ignored_file_name_contains
            .iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.to_lowercase())
            .collect();

        let files = match ctx.fs.walk_files(root).await {
            Ok(files) => files,
            Err(e) => {
                warn!(path = %root.display(), error = %e, "Unable to enumerate watch location");
                return Vec::new();
            }
        };

        let catalog = ctx.matcher.catalog();
        let mut candidates = Vec::new();
        for path in files {
            let is_video = catalog.is_video_file(&path);
            let is_subtitle = catalog.is_subtitle_file(&path);
            if !is_video && !is_subtitle {
                continue;
            }

            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            if let Some(term) = ignored.iter().find(|term| file_name.contains(term.as_str())) {
                debug!(path = %path.display(), term = %term, "Ignoring file");
                continue;
            }

            let Ok(metadata) = ctx.fs.metadata(&path).await else {
                continue;
            };
            if is_video && metadata.len < min_size {
                debug!(
                    path = %path.display(),
                    size = %format_bytes(metadata.len),
                    "File below minimum size"
                );
                continue;
            }

            candidates.push(Candidate {
                path,
                created: metadata.created_or_modified().unwrap_or(SystemTime::UNIX_EPOCH),
                is_subtitle,
            });
        }

        candidates.sort_by_key(|c| c.created);
        candidates.sort_by_key(|c| c.is_subtitle);
        candidates.into_iter().map(|c| c.path).collect()
    }

    /// Scan every watch location once
    pub async fn scan(&self, cancel: &CancellationToken) -> Result<ScanSummary> {
        let ctx = self.engine.context();
        let mut summary = ScanSummary {
            pruned: self.prune_missing_sources().await?,
            ..Default::default()
        };

        'locations: for location in ctx.options.scan_locations() {
            if !ctx.fs.exists(&location).await {
                warn!(path = %location.display(), "Watch location does not exist, skipping");
                continue;
            }

            let files = self.eligible_files(&location).await;
            info!(path = %location.display(), files = files.len(), "Scanning watch location");

            for file in files {
                if cancel.is_cancelled() {
                    summary.cancelled = true;
                    break 'locations;
                }
                summary.files_seen += 1;
                self.process_file(&file, &mut summary).await;
            }

            self.clean_location(&location).await;
        }

        info!(
            files_seen = summary.files_seen,
            processed = summary.processed,
            succeeded = summary.count(OrganizationStatus::Success),
            failed = summary.count(OrganizationStatus::Failure),
            skipped_disabled = summary.skipped_disabled,
            pruned = summary.pruned,
            cancelled = summary.cancelled,
            "Watch location scan complete"
        );
        Ok(summary)
    }

    async fn process_file(&self, path: &Path, summary: &mut ScanSummary) {
        let ctx = self.engine.context();
        let options = &ctx.options;
        let organizer_type = classify_path(path, &options.subtitle_extensions);

        let enabled_type = match organizer_type {
            OrganizerType::Subtitle => {
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                subtitle_companion_type(&file_name)
            }
            other => other,
        };
        let enabled = match enabled_type {
            OrganizerType::Episode => options.tv.enabled,
            OrganizerType::Movie => options.movie.enabled,
            _ => true,
        };
        if !enabled {
            debug!(path = %path.display(), organizer = %enabled_type, "Organization disabled for type");
            summary.skipped_disabled += 1;
            return;
        }

        if let Some(existing) = ctx.db.results().get_by_path(path) {
            if existing.status == OrganizationStatus::Success {
                summary.already_organized += 1;
                return;
            }
        }

        match self
            .engine
            .organize_file(path, organizer_type, &OrganizeRequest::default())
            .await
        {
            Ok(result) => {
                summary.processed += 1;
                *summary.statuses.entry(result.status).or_insert(0) += 1;
            }
            Err(OrganizationError::InProgress { id }) => {
                debug!(file_id = %id, "File already being organized, skipping");
                summary.in_progress += 1;
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to organize file"),
        }
    }

    /// Drop unfinished results whose source file no longer exists
    async fn prune_missing_sources(&self) -> Result<usize> {
        let ctx = self.engine.context();
        let mut pruned = 0;
        for result in ctx.db.results().list() {
            if result.status == OrganizationStatus::Success
                || self.engine.registry().contains(&result.id)
                || ctx.fs.exists(&result.original_path).await
            {
                continue;
            }
            if ctx.db.results().delete(&result.id).await? {
                debug!(file_id = %result.id, path = %result.original_path.display(), "Pruned result for missing file");
                ctx.events.emit(OrganizationEvent::ItemRemoved(result.id));
                pruned += 1;
            }
        }
        Ok(pruned)
    }

    /// Once nothing organizable is left, delete leftovers and empty folders
    async fn clean_location(&self, root: &Path) {
        let ctx = self.engine.context();
        let options = &ctx.options;
        if !self.eligible_files(root).await.is_empty() {
            return;
        }

        if !options.left_over_file_extensions_to_delete.is_empty() {
            if let Ok(files) = ctx.fs.walk_files(root).await {
                for file in files
                    .iter()
                    .filter(|f| has_extension(f, &options.left_over_file_extensions_to_delete))
                {
                    match ctx.fs.delete_file(file).await {
                        Ok(()) => debug!(path = %file.display(), "Deleted leftover file"),
                        Err(e) => warn!(path = %file.display(), error = %e, "Failed to delete leftover file"),
                    }
                }
            }
        }

        if options.delete_empty_folders {
            self.remove_empty_folders(root).await;
        }
    }

    /// Remove empty directories below `root`, deepest first; never `root`
    async fn remove_empty_folders(&self, root: &Path) {
        let ctx = self.engine.context();
        let roots = ctx.options.scan_locations();

        let mut directories = Vec::new();
        let mut pending = vec![root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            let Ok(children) = ctx.fs.read_dir(&dir).await else {
                continue;
            };
            for child in children {
                if ctx.fs.metadata(&child).await.map(|m| m.is_dir).unwrap_or(false) {
                    pending.push(child.clone());
                    directories.push(child);
                }
            }
        }

        directories.sort_by_key(|d| std::cmp::Reverse(d.components().count()));
        for dir in directories {
            if roots.iter().any(|r| r == &dir) {
                continue;
            }
            let empty = ctx
                .fs
                .read_dir(&dir)
                .await
                .map(|c| c.is_empty())
                .unwrap_or(false);
            if empty {
                match ctx.fs.delete_dir(&dir).await {
                    Ok(()) => debug!(path = %dir.display(), "Removed empty folder"),
                    Err(e) => warn!(path = %dir.display(), error = %e, "Failed to remove empty folder"),
                }
            }
        }
    }
}
