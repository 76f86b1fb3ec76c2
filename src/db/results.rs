//! Organization result records
//!
//! One record per distinct source path. The record id is a stable hash of the
//! original absolute path, so re-processing a file always replaces its row.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::Database;

/// What kind of organizer handles a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizerType {
    Episode,
    Movie,
    Subtitle,
    Unknown,
}

impl OrganizerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Episode => "episode",
            Self::Movie => "movie",
            Self::Subtitle => "subtitle",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for OrganizerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of an organization attempt
///
/// `Checking` and `Processing` are intermediate; everything else is where a
/// single attempt ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationStatus {
    Checking,
    Processing,
    Success,
    Failure,
    SkippedExisting,
    NewMedia,
    NewEdition,
    NewResolution,
    UserInputRequired,
    Waiting,
    InUse,
    NotEnoughDiskSpace,
}

/// Error class of a status, used to decide who has to act on it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    /// Locked or in-use file; retried on the next scan
    TransientIo,
    /// Disk full; needs operator action
    CapacityExhausted,
    /// Several catalog candidates; needs a correction
    AmbiguousIdentity,
    /// Terminal failure with a message
    NotFound,
    /// Paused awaiting a decision
    PolicyHold,
    /// An equivalent file already exists
    DuplicateExists,
}

impl OrganizationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Checking => "checking",
            Self::Processing => "processing",
            Self::Success => "success",
            Self::Failure => "failure",
            Self::SkippedExisting => "skipped_existing",
            Self::NewMedia => "new_media",
            Self::NewEdition => "new_edition",
            Self::NewResolution => "new_resolution",
            Self::UserInputRequired => "user_input_required",
            Self::Waiting => "waiting",
            Self::InUse => "in_use",
            Self::NotEnoughDiskSpace => "not_enough_disk_space",
        }
    }

    pub fn class(&self) -> Option<StatusClass> {
        match self {
            Self::Checking | Self::Processing | Self::Success => None,
            Self::InUse => Some(StatusClass::TransientIo),
            Self::NotEnoughDiskSpace => Some(StatusClass::CapacityExhausted),
            Self::Waiting => Some(StatusClass::AmbiguousIdentity),
            Self::Failure => Some(StatusClass::NotFound),
            Self::NewMedia | Self::NewEdition | Self::NewResolution | Self::UserInputRequired => {
                Some(StatusClass::PolicyHold)
            }
            Self::SkippedExisting => Some(StatusClass::DuplicateExists),
        }
    }
}

impl fmt::Display for OrganizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolution label plus the dimensions it came from, when known
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionInfo {
    pub name: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Identity and quality information extracted for a file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedInfo {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub season_number: Option<u32>,
    pub episode_number: Option<u32>,
    pub ending_episode_number: Option<u32>,
    pub episode_name: Option<String>,
    pub air_date: Option<NaiveDate>,
    pub edition: Option<String>,
    pub resolution: ResolutionInfo,
    pub source_quality: Option<String>,
    pub video_codecs: Vec<String>,
    pub audio_codecs: Vec<String>,
    pub subtitle_languages: Vec<String>,
}

/// Outcome of organizing a single source file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationResult {
    pub id: String,
    pub original_path: PathBuf,
    pub original_file_name: String,
    pub target_path: Option<PathBuf>,
    #[serde(rename = "type")]
    pub organizer_type: OrganizerType,
    pub status: OrganizationStatus,
    pub status_message: String,
    pub extracted: ExtractedInfo,
    pub duplicate_paths: Vec<PathBuf>,
    pub external_subtitle_paths: Vec<PathBuf>,
    pub file_size: u64,
    pub existing_catalog_id: i64,
    pub date: DateTime<Utc>,
    #[serde(skip)]
    pub is_in_progress: bool,
}

impl OrganizationResult {
    pub fn new(path: &Path, organizer_type: OrganizerType) -> Self {
        Self {
            id: result_id(path),
            original_path: path.to_path_buf(),
            original_file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            target_path: None,
            organizer_type,
            status: OrganizationStatus::Checking,
            status_message: String::new(),
            extracted: ExtractedInfo::default(),
            duplicate_paths: Vec::new(),
            external_subtitle_paths: Vec::new(),
            file_size: 0,
            existing_catalog_id: 0,
            date: Utc::now(),
            is_in_progress: false,
        }
    }

    /// Set the status and message in one step
    pub fn set_status(&mut self, status: OrganizationStatus, message: impl Into<String>) {
        self.status = status;
        self.status_message = message.into();
    }

    /// True when nothing a reviewer could see differs from `previous`.
    ///
    /// The timestamp and the transient in-progress flag are ignored.
    pub fn is_unchanged_from(&self, previous: &OrganizationResult) -> bool {
        self.id == previous.id
            && self.status == previous.status
            && self.status_message == previous.status_message
            && self.target_path == previous.target_path
            && self.organizer_type == previous.organizer_type
            && self.extracted == previous.extracted
            && self.duplicate_paths == previous.duplicate_paths
            && self.external_subtitle_paths == previous.external_subtitle_paths
            && self.file_size == previous.file_size
            && self.existing_catalog_id == previous.existing_catalog_id
    }
}

/// Stable id for a source path: SHA-256 of the path string, hex encoded
pub fn result_id(path: &Path) -> String {
    let digest = Sha256::digest(path.to_string_lossy().as_bytes());
    format!("{:x}", digest)
}

/// Paging parameters for result queries
#[derive(Debug, Clone, Default)]
pub struct ResultQuery {
    pub start_index: usize,
    pub limit: Option<usize>,
    pub status: Option<OrganizationStatus>,
}

/// One page of records plus the total count before paging
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult<T> {
    pub items: Vec<T>,
    pub total_record_count: usize,
}

/// Repository for organization results
pub struct ResultRepository<'a> {
    db: &'a Database,
}

impl<'a> ResultRepository<'a> {
    pub(super) fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert or replace the record with the same id
    pub async fn save(&self, result: &OrganizationResult) -> Result<()> {
        self.db
            .mutate(|state| {
                let mut stored = result.clone();
                stored.is_in_progress = false;
                state.results.insert(stored.id.clone(), stored);
            })
            .await
    }

    pub fn get(&self, id: &str) -> Option<OrganizationResult> {
        self.db.read(|state| state.results.get(id).cloned())
    }

    pub fn get_by_path(&self, path: &Path) -> Option<OrganizationResult> {
        self.get(&result_id(path))
    }

    /// All records, newest first
    pub fn list(&self) -> Vec<OrganizationResult> {
        let mut results: Vec<OrganizationResult> =
            self.db.read(|state| state.results.values().cloned().collect());
        results.sort_by(|a, b| b.date.cmp(&a.date));
        results
    }

    /// One page of records, newest first
    pub fn get_page(&self, query: &ResultQuery) -> QueryResult<OrganizationResult> {
        let filtered: Vec<OrganizationResult> = self
            .list()
            .into_iter()
            .filter(|r| query.status.is_none_or(|s| r.status == s))
            .collect();
        let total_record_count = filtered.len();
        let items = filtered
            .into_iter()
            .skip(query.start_index)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();

        QueryResult {
            items,
            total_record_count,
        }
    }

    /// Delete one record. Returns whether it existed.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let mut removed = false;
        self.db
            .mutate(|state| removed = state.results.remove(id).is_some())
            .await?;
        Ok(removed)
    }

    pub async fn delete_all(&self) -> Result<()> {
        self.db.mutate(|state| state.results.clear()).await
    }

    /// Delete every record that ended in `Success`
    pub async fn delete_completed(&self) -> Result<usize> {
        let mut removed = 0;
        self.db
            .mutate(|state| {
                let before = state.results.len();
                state
                    .results
                    .retain(|_, r| r.status != OrganizationStatus::Success);
                removed = before - state.results.len();
            })
            .await?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_id_is_stable_per_path() {
        let a = result_id(Path::new("/watch/Show.S01E01.mkv"));
        let b = result_id(Path::new("/watch/Show.S01E01.mkv"));
        let c = result_id(Path::new("/watch/Show.S01E02.mkv"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_status_classes() {
        assert_eq!(
            OrganizationStatus::InUse.class(),
            Some(StatusClass::TransientIo)
        );
        assert_eq!(
            OrganizationStatus::NotEnoughDiskSpace.class(),
            Some(StatusClass::CapacityExhausted)
        );
        assert_eq!(
            OrganizationStatus::Waiting.class(),
            Some(StatusClass::AmbiguousIdentity)
        );
        assert_eq!(
            OrganizationStatus::UserInputRequired.class(),
            Some(StatusClass::PolicyHold)
        );
        assert_eq!(
            OrganizationStatus::SkippedExisting.class(),
            Some(StatusClass::DuplicateExists)
        );
        assert_eq!(OrganizationStatus::Success.class(), None);
    }

    #[test]
    fn test_unchanged_ignores_date_and_progress_flag() {
        let path = Path::new("/watch/Movie.2020.mkv");
        let mut first = OrganizationResult::new(path, OrganizerType::Movie);
        first.set_status(OrganizationStatus::SkippedExisting, "exists");

        let mut second = first.clone();
        second.date = first.date + chrono::Duration::seconds(30);
        second.is_in_progress = true;
        assert!(second.is_unchanged_from(&first));

        second.status_message = "different".to_string();
        assert!(!second.is_unchanged_from(&first));
    }

    #[test]
    fn test_in_progress_flag_is_not_serialized() {
        let mut result =
            OrganizationResult::new(Path::new("/watch/a.mkv"), OrganizerType::Movie);
        result.is_in_progress = true;
        let json = serde_json::to_string(&result).unwrap();
        assert!(!json.contains("is_in_progress"));
        let back: OrganizationResult = serde_json::from_str(&json).unwrap();
        assert!(!back.is_in_progress);
    }
}
