//! Organize options
//!
//! Read-only settings for watch folders, naming patterns and the conflict
//! policy. Loaded from a JSON file; every section falls back to defaults for
//! missing fields.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::services::file_utils::{SUBTITLE_EXTENSIONS, VIDEO_EXTENSIONS};
use crate::services::filename_parser::ParserVocabulary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizeOptions {
    pub watch_locations: Vec<PathBuf>,
    /// Scanned after the watch locations, like one more watch folder
    pub pre_processing_folder: Option<PathBuf>,
    pub min_file_size_mb: u64,
    /// Case-insensitive substrings; matching files are never organized
    pub ignored_file_name_contains: Vec<String>,
    pub left_over_file_extensions_to_delete: Vec<String>,
    pub delete_empty_folders: bool,
    /// Copy instead of move, leaving the source in place
    pub copy_original_file: bool,
    pub video_extensions: Vec<String>,
    pub subtitle_extensions: Vec<String>,
    /// Edition flags stripped from movie names
    pub edition_flags: Vec<String>,
    /// Cron expression (with seconds) for the periodic scan
    pub scan_schedule: String,
    pub tv: TvOptions,
    pub movie: MovieOptions,
}

impl Default for OrganizeOptions {
    fn default() -> Self {
        Self {
            watch_locations: Vec::new(),
            pre_processing_folder: None,
            min_file_size_mb: 50,
            ignored_file_name_contains: vec!["sample".to_string()],
            left_over_file_extensions_to_delete: vec![
                "nfo".to_string(),
                "txt".to_string(),
                "jpg".to_string(),
                "url".to_string(),
            ],
            delete_empty_folders: true,
            copy_original_file: false,
            video_extensions: VIDEO_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            subtitle_extensions: SUBTITLE_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            edition_flags: ParserVocabulary::default().edition_flags,
            scan_schedule: "0 */5 * * * *".to_string(),
            tv: TvOptions::default(),
            movie: MovieOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TvOptions {
    pub enabled: bool,
    /// Library folder new series are created under
    pub library_path: Option<PathBuf>,
    pub series_folder_pattern: String,
    pub season_folder_pattern: String,
    pub season_zero_folder_name: String,
    pub episode_name_pattern: String,
    pub multi_episode_name_pattern: String,
    pub overwrite_existing: bool,
    /// Filename substrings (e.g. "PROPER") that allow overwriting
    pub overwrite_keywords: Vec<String>,
    pub auto_detect: bool,
    /// Hold files for series that aren't in the catalog yet
    pub match_existing_only: bool,
    /// Remove older files of the same episode when a confirmed move supersedes them
    pub delete_duplicates: bool,
}

impl Default for TvOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            library_path: None,
            series_folder_pattern: "%fn".to_string(),
            season_folder_pattern: "Season %s".to_string(),
            season_zero_folder_name: "Specials".to_string(),
            episode_name_pattern: "%sn - %sx%0e - %en.%ext".to_string(),
            multi_episode_name_pattern: "%sn - %sx%0e-x%0ed - %en.%ext".to_string(),
            overwrite_existing: false,
            overwrite_keywords: vec!["PROPER".to_string(), "REPACK".to_string()],
            auto_detect: true,
            match_existing_only: false,
            delete_duplicates: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovieOptions {
    pub enabled: bool,
    pub library_path: Option<PathBuf>,
    pub folder_pattern: String,
    pub file_pattern: String,
    pub overwrite_existing: bool,
    pub overwrite_keywords: Vec<String>,
    pub auto_detect: bool,
    pub match_existing_only: bool,
}

impl Default for MovieOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            library_path: None,
            folder_pattern: "%fn".to_string(),
            file_pattern: "%fn.%ext".to_string(),
            overwrite_existing: false,
            overwrite_keywords: vec!["PROPER".to_string(), "REPACK".to_string()],
            auto_detect: true,
            match_existing_only: false,
        }
    }
}

impl OrganizeOptions {
    /// Load options from a JSON file, falling back to defaults when absent
    pub async fn load(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            warn!(path = %path.display(), "Options file not found, using defaults");
            return Ok(Self::default());
        }

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read options from {}", path.display()))?;
        let options: Self = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse options in {}", path.display()))?;

        info!(
            path = %path.display(),
            watch_locations = options.watch_locations.len(),
            tv_enabled = options.tv.enabled,
            movie_enabled = options.movie.enabled,
            "Organize options loaded"
        );

        Ok(options)
    }

    /// Minimum size in bytes for media files
    pub fn min_file_size_bytes(&self) -> u64 {
        self.min_file_size_mb * 1024 * 1024
    }

    /// Parser vocabulary with the configured edition flags
    pub fn parser_vocabulary(&self) -> ParserVocabulary {
        ParserVocabulary {
            edition_flags: self.edition_flags.clone(),
            ..ParserVocabulary::default()
        }
    }

    /// Watch locations followed by the pre-processing folder, if any
    pub fn scan_locations(&self) -> Vec<PathBuf> {
        let mut locations = self.watch_locations.clone();
        if let Some(folder) = &self.pre_processing_folder {
            if !locations.contains(folder) {
                locations.push(folder.clone());
            }
        }
        locations
    }
}
