//! Organization engine
//!
//! Runs the per-file state machine: classify and parse, match against the
//! catalog, render the target path, apply the conflict policy, then move or
//! copy. Each file is organized by an [`Organizer`] variant sharing one
//! [`OrganizerContext`]. Only one attempt per result id runs at a time.
//!
//! ```text
//! Checking -> InUse | Failure | Waiting | NewMedia | NewEdition
//!           | NewResolution | SkippedExisting
//!           | Processing -> Success | Failure | InUse | NotEnoughDiskSpace
//! ```

pub mod episode;
pub mod events;
pub mod movie;
pub mod progress;
pub mod subtitle;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::config::OrganizeOptions;
use crate::db::{
    Database, ExtractedInfo, OrganizationResult, OrganizationStatus, OrganizerType, result_id,
};
use crate::services::conflict::ConflictDecision;
use crate::services::error::{OrganizationError, OrganizationOutcome};
use crate::services::file_utils::has_extension;
use crate::services::filename_parser::{NameParser, resolution_from_dimensions};
use crate::services::filesystem::FileSystem;
use crate::services::matcher::CatalogMatcher;
use crate::services::probe::MediaProbe;

pub use episode::{EpisodeCorrection, EpisodeOrganizer};
pub use events::{EventSink, OrganizationEvent};
pub use movie::{MovieCorrection, MovieOrganizer};
pub use progress::{InProgressGuard, InProgressRegistry};
pub use subtitle::SubtitleOrganizer;

/// Identity supplied by a user instead of the parsed one
#[derive(Debug, Clone)]
pub enum Correction {
    Episode(EpisodeCorrection),
    Movie(MovieCorrection),
}

#[derive(Debug, Clone, Default)]
pub struct OrganizeRequest {
    /// Confirmed by a user; overrides new-media/edition/resolution holds
    pub request_to_move: bool,
    pub correction: Option<Correction>,
}

impl OrganizeRequest {
    pub fn confirmed() -> Self {
        Self {
            request_to_move: true,
            correction: None,
        }
    }

    pub fn bypasses_holds(&self) -> bool {
        self.request_to_move || self.correction.is_some()
    }
}

/// Collaborators shared by every organizer
pub struct OrganizerContext {
    pub db: Database,
    pub options: Arc<OrganizeOptions>,
    pub parser: NameParser,
    pub matcher: CatalogMatcher,
    pub fs: Arc<dyn FileSystem>,
    pub probe: Arc<dyn MediaProbe>,
    pub events: EventSink,
}

/// One organizer per media kind
#[derive(Debug, Clone, Copy)]
pub enum Organizer {
    Episode(EpisodeOrganizer),
    Movie(MovieOrganizer),
    Subtitle(SubtitleOrganizer),
}

impl Organizer {
    pub fn for_type(organizer_type: OrganizerType) -> Option<Self> {
        match organizer_type {
            OrganizerType::Episode => Some(Self::Episode(EpisodeOrganizer)),
            OrganizerType::Movie => Some(Self::Movie(MovieOrganizer)),
            OrganizerType::Subtitle => Some(Self::Subtitle(SubtitleOrganizer)),
            OrganizerType::Unknown => None,
        }
    }

    /// Drive `result` to a final status
    pub async fn organize(
        &self,
        ctx: &OrganizerContext,
        result: &mut OrganizationResult,
        request: &OrganizeRequest,
    ) -> Result<()> {
        match self {
            Self::Episode(o) => o.organize(ctx, result, request).await,
            Self::Movie(o) => o.organize(ctx, result, request).await,
            Self::Subtitle(o) => o.organize(ctx, result, request).await,
        }
    }
}

/// Failure status for an IO error raised while moving or copying
pub fn classify_io_error(err: &io::Error) -> OrganizationStatus {
    let message = err.to_string().to_lowercase();
    if err.kind() == io::ErrorKind::StorageFull || message.contains("disk space") {
        OrganizationStatus::NotEnoughDiskSpace
    } else if matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::ResourceBusy
    ) || message.contains("used by another process")
    {
        OrganizationStatus::InUse
    } else {
        OrganizationStatus::Failure
    }
}

/// Whether a filename carries one of the overwrite keywords
pub fn has_overwrite_keyword(file_name: &str, keywords: &[String]) -> bool {
    let lower = file_name.to_lowercase();
    keywords
        .iter()
        .filter(|k| !k.trim().is_empty())
        .any(|k| lower.contains(&k.to_lowercase()))
}

impl OrganizerContext {
    /// Save and announce `result` unless nothing visible changed.
    ///
    /// Returns the record as stored; for an unchanged result that is the
    /// previous record, timestamp included.
    pub async fn persist(&self, result: &OrganizationResult) -> Result<OrganizationResult> {
        let stored = self.db.results().get(&result.id);
        if let Some(previous) = &stored {
            if result.is_unchanged_from(previous) {
                debug!(file_id = %result.id, status = %result.status, "Result unchanged, not saving");
                return Ok(previous.clone());
            }
        }

        self.db.results().save(result).await?;
        let mut announced = result.clone();
        announced.is_in_progress = false;
        self.events.emit(match stored {
            Some(_) => OrganizationEvent::ItemUpdated(announced.clone()),
            None => OrganizationEvent::ItemAdded(announced.clone()),
        });
        Ok(announced)
    }

    /// Record the source size and the stream details a probe can supply
    pub async fn inspect_source(&self, result: &mut OrganizationResult, info: &mut ExtractedInfo) {
        match self.fs.metadata(&result.original_path).await {
            Ok(metadata) => result.file_size = metadata.len,
            Err(e) => debug!(path = %result.original_path.display(), error = %e, "Unable to read source metadata"),
        }

        match self.probe.probe(&result.original_path).await {
            Ok(Some(probe)) => {
                if let (Some(w), Some(h)) = (probe.width, probe.height) {
                    info.resolution.name = resolution_from_dimensions(w, h).to_string();
                    info.resolution.width = Some(w);
                    info.resolution.height = Some(h);
                }
                if !probe.video_codecs.is_empty() {
                    info.video_codecs = probe.video_codecs;
                }
                if !probe.audio_codecs.is_empty() {
                    info.audio_codecs = probe.audio_codecs;
                }
                info.subtitle_languages = probe.subtitle_languages;
            }
            Ok(None) => {}
            Err(e) => warn!(path = %result.original_path.display(), error = %e, "Media probe failed"),
        }
    }

    /// Mark the result `InUse` when the source can't be read. Returns true if so.
    pub async fn source_in_use(&self, result: &mut OrganizationResult) -> bool {
        if self.fs.is_locked(&result.original_path).await {
            result.set_status(
                OrganizationStatus::InUse,
                "Source file is in use by another process",
            );
            return true;
        }
        false
    }

    /// Subtitle files next to the source that share its name
    pub async fn sibling_subtitles(&self, source: &Path) -> Vec<PathBuf> {
        let (Some(parent), Some(stem)) = (source.parent(), source.file_stem()) else {
            return Vec::new();
        };
        let stem = stem.to_string_lossy().to_lowercase();
        let mut siblings: Vec<PathBuf> = match self.fs.read_dir(parent).await {
            Ok(entries) => entries
                .into_iter()
                .filter(|p| has_extension(p, &self.options.subtitle_extensions))
                .filter(|p| {
                    p.file_name()
                        .map(|n| n.to_string_lossy().to_lowercase().starts_with(&stem))
                        .unwrap_or(false)
                })
                .collect(),
            Err(_) => Vec::new(),
        };
        siblings.sort();
        siblings
    }

    /// Turn a conflict decision into a final status, moving the file when allowed.
    ///
    /// Files the overwrite policy removes are always deleted; duplicates a
    /// confirmed move supersedes only when `delete_superseded` is set.
    pub async fn apply_decision(
        &self,
        result: &mut OrganizationResult,
        decision: ConflictDecision,
        target: &Path,
        target_exists: bool,
        delete_superseded: bool,
    ) {
        match decision {
            ConflictDecision::Proceed {
                mut remove,
                superseded,
            } => {
                if delete_superseded {
                    remove.extend(superseded);
                }
                self.transfer(result, target, &remove, target_exists).await;
            }
            ConflictDecision::Hold { status, message } => {
                info!(file_id = %result.id, status = %status, "Holding file for review");
                result.set_status(status, message);
            }
            ConflictDecision::Skip {
                message,
                duplicates,
            } => {
                info!(
                    file_id = %result.id,
                    duplicates = duplicates.len(),
                    "Skipping file, an equivalent already exists"
                );
                result.duplicate_paths = duplicates;
                result.set_status(OrganizationStatus::SkippedExisting, message);
            }
            ConflictDecision::Reject { status, message } => {
                result.set_status(status, message);
            }
        }
    }

    /// Move or copy the source to `target`.
    ///
    /// The result is saved as `Processing` first. `remove` lists files to
    /// delete before the transfer; an existing target is replaced when
    /// `replace_target` is set.
    pub async fn transfer(
        &self,
        result: &mut OrganizationResult,
        target: &Path,
        remove: &[PathBuf],
        replace_target: bool,
    ) {
        result.target_path = Some(target.to_path_buf());
        result.set_status(OrganizationStatus::Processing, "");
        if let Err(e) = self.persist(result).await {
            warn!(file_id = %result.id, error = %e, "Failed to save processing status");
        }

        let copy = self.options.copy_original_file;
        let action = if copy { "copy" } else { "move" };
        let source = result.original_path.clone();
        let directory = target.parent().unwrap_or(target).to_path_buf();

        self.fs.begin_change(&directory);
        let outcome = self
            .transfer_file(&source, target, remove, replace_target, copy)
            .await;
        self.fs.complete_change(&directory);

        match outcome {
            Ok(()) => {
                info!(
                    file_id = %result.id,
                    action = %action,
                    original = %source.display(),
                    new = %target.display(),
                    "File organized"
                );
                result.set_status(OrganizationStatus::Success, "");
            }
            Err(e) => {
                let status = classify_io_error(&e);
                warn!(
                    file_id = %result.id,
                    action = %action,
                    status = %status,
                    error = %e,
                    "File transfer failed"
                );
                result.set_status(status, format!("Failed to {} file: {}", action, e));
            }
        }
    }

    async fn transfer_file(
        &self,
        source: &Path,
        target: &Path,
        remove: &[PathBuf],
        replace_target: bool,
        copy: bool,
    ) -> io::Result<()> {
        if let Some(parent) = target.parent() {
            self.fs.create_dir_all(parent).await?;
        }

        for path in remove.iter().filter(|p| *p != source && *p != target) {
            match self.fs.delete_file(path).await {
                Ok(()) => info!(path = %path.display(), "Removed duplicate file"),
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove duplicate file"),
            }
        }

        let target_existed = self.fs.exists(target).await;
        if target_existed && replace_target {
            self.fs.delete_file(target).await?;
        }

        let transferred = if copy {
            self.fs.copy(source, target).await.map(|_| ())
        } else {
            self.fs.rename(source, target).await
        };

        if transferred.is_err() && !target_existed && self.fs.exists(target).await {
            // Drop a partial copy
            if let Err(e) = self.fs.delete_file(target).await {
                warn!(path = %target.display(), error = %e, "Failed to remove partial target file");
            }
        }
        transferred
    }
}

/// Runs organizers with per-item mutual exclusion
#[derive(Clone)]
pub struct OrganizationEngine {
    ctx: Arc<OrganizerContext>,
    registry: InProgressRegistry,
}

impl OrganizationEngine {
    pub fn new(ctx: OrganizerContext, registry: InProgressRegistry) -> Self {
        Self {
            ctx: Arc::new(ctx),
            registry,
        }
    }

    pub fn context(&self) -> &OrganizerContext {
        &self.ctx
    }

    pub fn registry(&self) -> &InProgressRegistry {
        &self.registry
    }

    /// Organize one file.
    ///
    /// Fails with [`OrganizationError::InProgress`] when the same path is
    /// already being organized. Every other outcome is a status on the
    /// returned result.
    pub async fn organize_file(
        &self,
        path: &Path,
        organizer_type: OrganizerType,
        request: &OrganizeRequest,
    ) -> OrganizationOutcome<OrganizationResult> {
        let id = result_id(path);
        let _guard = self
            .registry
            .try_acquire(&id)
            .ok_or_else(|| OrganizationError::InProgress { id: id.clone() })?;

        let mut result = OrganizationResult::new(path, organizer_type);
        result.is_in_progress = true;
        self.ctx
            .events
            .emit(OrganizationEvent::ItemUpdated(result.clone()));

        debug!(file_id = %id, path = %path.display(), organizer = %organizer_type, "Organizing file");

        match Organizer::for_type(organizer_type) {
            Some(organizer) => {
                if let Err(e) = organizer.organize(&self.ctx, &mut result, request).await {
                    warn!(file_id = %id, error = %e, "Organization failed");
                    result.set_status(OrganizationStatus::Failure, e.to_string());
                }
            }
            None => result.set_status(
                OrganizationStatus::Failure,
                "Unable to determine the media type of this file",
            ),
        }

        result.is_in_progress = false;
        let stored = self.ctx.persist(&result).await?;

        info!(
            file_id = %id,
            status = %stored.status,
            message = %stored.status_message,
            "Organization attempt finished"
        );
        Ok(stored)
    }
}
