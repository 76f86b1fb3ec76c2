//! Organization service
//!
//! Entry points used by the binary and by any front end: reviewing results,
//! re-running or correcting a single file, managing smart matches, and the
//! naming audit.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{
    FileCorrection, OrganizationResult, OrganizationStatus, OrganizerType, QueryResult,
    ResultQuery, SmartMatchEntry,
};
use crate::services::audit::FileCorrectionAuditor;
use crate::services::classifier::classify_path;
use crate::services::error::{OrganizationError, OrganizationOutcome};
use crate::services::organizer::{
    Correction, EpisodeCorrection, MovieCorrection, OrganizationEngine, OrganizationEvent,
    OrganizeRequest,
};
use crate::services::scanner::{ScanSummary, WatchLocationScanner};

#[derive(Clone)]
pub struct OrganizationService {
    engine: OrganizationEngine,
    scanner: WatchLocationScanner,
    auditor: FileCorrectionAuditor,
    scan_lock: Arc<Mutex<()>>,
}

fn ensure_success(result: OrganizationResult) -> OrganizationOutcome<OrganizationResult> {
    if result.status == OrganizationStatus::Success {
        Ok(result)
    } else {
        Err(OrganizationError::Failed {
            status: result.status,
            message: result.status_message,
        })
    }
}

impl OrganizationService {
    pub fn new(engine: OrganizationEngine) -> Self {
        Self {
            scanner: WatchLocationScanner::new(engine.clone()),
            auditor: FileCorrectionAuditor::new(engine.clone()),
            engine,
            scan_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn engine(&self) -> &OrganizationEngine {
        &self.engine
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrganizationEvent> {
        self.engine.context().events.subscribe()
    }

    /// One page of results, newest first, with the live in-progress flag
    pub fn get_results(&self, query: &ResultQuery) -> QueryResult<OrganizationResult> {
        let mut page = self.engine.context().db.results().get_page(query);
        for item in &mut page.items {
            item.is_in_progress = self.engine.registry().contains(&item.id);
        }
        page
    }

    pub fn get_result(&self, id: &str) -> OrganizationOutcome<OrganizationResult> {
        let mut result = self
            .engine
            .context()
            .db
            .results()
            .get(id)
            .ok_or_else(|| OrganizationError::NotFound(id.to_string()))?;
        result.is_in_progress = self.engine.registry().contains(id);
        Ok(result)
    }

    pub async fn delete_result(&self, id: &str) -> OrganizationOutcome<()> {
        let ctx = self.engine.context();
        if !ctx.db.results().delete(id).await? {
            return Err(OrganizationError::NotFound(id.to_string()));
        }
        ctx.events.emit(OrganizationEvent::ItemRemoved(id.to_string()));
        Ok(())
    }

    /// Delete the source file of a result, then the result itself
    pub async fn delete_original_file(&self, id: &str) -> OrganizationOutcome<()> {
        let ctx = self.engine.context();
        let result = self.get_result(id)?;
        let _guard = self
            .engine
            .registry()
            .try_acquire(id)
            .ok_or_else(|| OrganizationError::InProgress { id: id.to_string() })?;

        if ctx.fs.exists(&result.original_path).await {
            ctx.fs
                .delete_file(&result.original_path)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to delete {}: {}", result.original_path.display(), e))?;
            info!(file_id = %id, path = %result.original_path.display(), "Deleted original file");
        }
        self.delete_result(id).await
    }

    pub async fn clear_log(&self) -> OrganizationOutcome<()> {
        let ctx = self.engine.context();
        ctx.db.results().delete_all().await?;
        ctx.events.emit(OrganizationEvent::LogReset);
        Ok(())
    }

    pub async fn clear_completed(&self) -> OrganizationOutcome<usize> {
        let ctx = self.engine.context();
        let removed = ctx.db.results().delete_completed().await?;
        ctx.events.emit(OrganizationEvent::LogReset);
        Ok(removed)
    }

    /// Organize a stored result again, overriding policy holds
    pub async fn perform_organization(&self, id: &str) -> OrganizationOutcome<OrganizationResult> {
        let result = self.get_result(id)?;
        let organizer_type = match result.organizer_type {
            OrganizerType::Unknown => classify_path(
                &result.original_path,
                &self.engine.context().options.subtitle_extensions,
            ),
            other => other,
        };
        let outcome = self
            .engine
            .organize_file(&result.original_path, organizer_type, &OrganizeRequest::confirmed())
            .await?;
        ensure_success(outcome)
    }

    /// Organize a result as the episode the user identified
    pub async fn perform_episode_organization(
        &self,
        id: &str,
        mut correction: EpisodeCorrection,
    ) -> OrganizationOutcome<OrganizationResult> {
        if correction.series_name.trim().is_empty() {
            return Err(OrganizationError::InvalidRequest(
                "A series name is required".to_string(),
            ));
        }
        if correction.series_year.is_none() {
            let (name, year) = self.split_year(&correction.series_name);
            correction.series_name = name;
            correction.series_year = year;
        }
        let result = self.get_result(id)?;
        let request = OrganizeRequest {
            request_to_move: true,
            correction: Some(Correction::Episode(correction.clone())),
        };
        let outcome = self
            .engine
            .organize_file(&result.original_path, OrganizerType::Episode, &request)
            .await?;
        let outcome = ensure_success(outcome)?;

        if correction.remember_match {
            let fragment = self.raw_name(&result.original_path, OrganizerType::Episode);
            self.remember(
                &correction.series_name,
                OrganizerType::Episode,
                &fragment,
                correction.series_folder.clone(),
            )
            .await;
        }
        Ok(outcome)
    }

    /// Organize a result as the movie the user identified
    pub async fn perform_movie_organization(
        &self,
        id: &str,
        mut correction: MovieCorrection,
    ) -> OrganizationOutcome<OrganizationResult> {
        if correction.name.trim().is_empty() {
            return Err(OrganizationError::InvalidRequest(
                "A movie name is required".to_string(),
            ));
        }
        if correction.year.is_none() {
            let (name, year) = self.split_year(&correction.name);
            correction.name = name;
            correction.year = year;
        }
        let result = self.get_result(id)?;
        let request = OrganizeRequest {
            request_to_move: true,
            correction: Some(Correction::Movie(correction.clone())),
        };
        let outcome = self
            .engine
            .organize_file(&result.original_path, OrganizerType::Movie, &request)
            .await?;
        let outcome = ensure_success(outcome)?;

        if correction.remember_match {
            let fragment = self.raw_name(&result.original_path, OrganizerType::Movie);
            self.remember(
                &correction.name,
                OrganizerType::Movie,
                &fragment,
                correction.movie_folder.clone(),
            )
            .await;
        }
        Ok(outcome)
    }

    /// "Name (2019)" typed by a user becomes the name and the year
    fn split_year(&self, value: &str) -> (String, Option<i32>) {
        match self.engine.context().matcher.catalog().parse_name(value) {
            (name, Some(year)) if !name.trim().is_empty() => (name, Some(year)),
            _ => (value.trim().to_string(), None),
        }
    }

    /// The name as parsed from the file, before any correction
    fn raw_name(&self, path: &Path, organizer_type: OrganizerType) -> String {
        let parser = &self.engine.context().parser;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let info = match organizer_type {
            OrganizerType::Episode => parser.parse_episode(&file_name),
            _ => parser.parse_movie(&file_name),
        };
        info.name.unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default()
        })
    }

    async fn remember(
        &self,
        canonical_name: &str,
        organizer_type: OrganizerType,
        fragment: &str,
        target_folder: Option<std::path::PathBuf>,
    ) {
        let smart_matches = self.engine.context().db.smart_matches();
        match smart_matches
            .remember(canonical_name, organizer_type, fragment, target_folder)
            .await
        {
            Ok(entry) => info!(
                canonical = %entry.canonical_name,
                fragment = %fragment,
                "Remembered smart match"
            ),
            Err(e) => warn!(canonical = %canonical_name, error = %e, "Failed to save smart match"),
        }
    }

    pub fn get_smart_matches(&self, organizer_type: Option<OrganizerType>) -> Vec<SmartMatchEntry> {
        self.engine.context().db.smart_matches().list(organizer_type)
    }

    pub async fn delete_smart_match(&self, id: Uuid) -> OrganizationOutcome<()> {
        if !self.engine.context().db.smart_matches().delete(id).await? {
            return Err(OrganizationError::NotFound(id.to_string()));
        }
        Ok(())
    }

    pub async fn delete_smart_match_string(
        &self,
        id: Uuid,
        match_string: &str,
    ) -> OrganizationOutcome<()> {
        let smart_matches = self.engine.context().db.smart_matches();
        if smart_matches.get(id).is_none() {
            return Err(OrganizationError::NotFound(id.to_string()));
        }
        smart_matches.delete_match_string(id, match_string).await?;
        Ok(())
    }

    /// Re-audit the TV library
    pub async fn find_file_corrections(&self) -> OrganizationOutcome<Vec<FileCorrection>> {
        Ok(self.auditor.audit().await?)
    }

    pub fn get_file_corrections(
        &self,
        start_index: usize,
        limit: Option<usize>,
    ) -> QueryResult<FileCorrection> {
        self.engine
            .context()
            .db
            .file_corrections()
            .get_page(start_index, limit)
    }

    pub async fn apply_file_corrections(&self, ids: &[Uuid]) -> OrganizationOutcome<usize> {
        Ok(self.auditor.apply(ids).await?)
    }

    /// Scan the watch locations; `None` when a scan is already running
    pub async fn run_scan(&self, cancel: &CancellationToken) -> OrganizationOutcome<Option<ScanSummary>> {
        let Ok(_running) = self.scan_lock.try_lock() else {
            info!("Watch location scan already running, skipping");
            return Ok(None);
        };
        Ok(Some(self.scanner.scan(cancel).await?))
    }
}
