//! Application configuration management

pub mod options;

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub use options::{MovieOptions, OrganizeOptions, TvOptions};

/// Process configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// JSON settings file with the organize options
    pub options_path: PathBuf,

    /// JSON file backing the result store
    pub store_path: PathBuf,

    /// Use TVMaze as the remote lookup for series
    pub tvmaze_enabled: bool,

    /// TVMaze API base URL
    pub tvmaze_base_url: String,
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("librarian-organizer"))
        .unwrap_or_else(|| PathBuf::from("./data"))
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let data_dir = env::var("ORGANIZER_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir());

        let options_path = env::var("ORGANIZER_OPTIONS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("autoorganize.json"));

        let store_path = env::var("ORGANIZER_STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("organizer-results.json"));

        let tvmaze_enabled = match env::var("TVMAZE_ENABLED") {
            Ok(v) => v
                .parse::<bool>()
                .or_else(|_| match v.as_str() {
                    "1" => Ok(true),
                    "0" => Ok(false),
                    _ => Err(v.clone()),
                })
                .map_err(|v| anyhow::anyhow!("Invalid boolean '{}'", v))
                .context("Invalid TVMAZE_ENABLED")?,
            Err(_) => true,
        };

        Ok(Self {
            options_path,
            store_path,
            tvmaze_enabled,
            tvmaze_base_url: env::var("TVMAZE_BASE_URL")
                .unwrap_or_else(|_| "https://api.tvmaze.com".to_string()),
        })
    }
}
