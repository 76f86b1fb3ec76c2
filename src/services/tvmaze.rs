//! TVMaze API client for series lookup
//!
//! TVMaze is a free API that doesn't require authentication.
//! Base URL: https://api.tvmaze.com

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::services::catalog::CatalogKind;
use crate::services::metadata::{RemoteCandidate, RemoteEpisode, RemoteLookup, RemoteQuery};

/// TVMaze API client
pub struct TvMazeClient {
    client: Client,
    base_url: String,
}

/// Show search result from TVMaze
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TvMazeSearchResult {
    pub score: f64,
    pub show: TvMazeShow,
}

/// Show details from TVMaze
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TvMazeShow {
    pub id: u32,
    pub name: String,
    pub premiered: Option<String>,
}

/// Episode from TVMaze
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TvMazeEpisode {
    pub id: u32,
    pub name: String,
    pub season: u32,
    pub number: Option<u32>,
    pub airdate: Option<String>,
}

impl TvMazeClient {
    pub fn new() -> Self {
        Self::with_base_url("https://api.tvmaze.com")
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Search for shows by name
    pub async fn search_shows(&self, query: &str) -> Result<Vec<TvMazeSearchResult>> {
        info!(query = %query, "Searching TVMaze for shows");

        let url = format!("{}/search/shows", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("q", query)])
            .send()
            .await
            .context("Failed to search TVMaze")?;

        if !response.status().is_success() {
            anyhow::bail!("TVMaze search failed with status: {}", response.status());
        }

        let results: Vec<TvMazeSearchResult> = response
            .json()
            .await
            .context("Failed to parse TVMaze search results")?;

        debug!(count = results.len(), "TVMaze search returned results");
        Ok(results)
    }

    /// Get a single episode by season and number; `None` when TVMaze has no such episode
    pub async fn episode_by_number(
        &self,
        tvmaze_id: u32,
        season: u32,
        number: u32,
    ) -> Result<Option<TvMazeEpisode>> {
        let url = format!("{}/shows/{}/episodebynumber", self.base_url, tvmaze_id);
        let response = self
            .client
            .get(&url)
            .query(&[("season", season), ("number", number)])
            .send()
            .await
            .context("Failed to fetch episode from TVMaze")?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            anyhow::bail!(
                "TVMaze episode lookup failed with status: {}",
                response.status()
            );
        }

        let episode: TvMazeEpisode = response
            .json()
            .await
            .context("Failed to parse TVMaze episode")?;
        Ok(Some(episode))
    }

    /// Episodes that aired on a date
    pub async fn episodes_by_date(
        &self,
        tvmaze_id: u32,
        date: NaiveDate,
    ) -> Result<Vec<TvMazeEpisode>> {
        let url = format!("{}/shows/{}/episodesbydate", self.base_url, tvmaze_id);
        let response = self
            .client
            .get(&url)
            .query(&[("date", date.format("%Y-%m-%d").to_string())])
            .send()
            .await
            .context("Failed to fetch episodes by date from TVMaze")?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            anyhow::bail!(
                "TVMaze episodes by date failed with status: {}",
                response.status()
            );
        }

        response
            .json()
            .await
            .context("Failed to parse TVMaze episodes")
    }
}

impl Default for TvMazeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl TvMazeShow {
    /// Get the premiere year from the premiered date
    pub fn premiere_year(&self) -> Option<i32> {
        self.premiered
            .as_ref()
            .and_then(|p| p.split('-').next().and_then(|y| y.parse().ok()))
    }
}

fn show_id(candidate: &RemoteCandidate) -> Result<u32> {
    candidate
        .provider_id
        .parse()
        .with_context(|| format!("Invalid TVMaze id '{}'", candidate.provider_id))
}

#[async_trait]
impl RemoteLookup for TvMazeClient {
    fn provider_name(&self) -> &str {
        "tvmaze"
    }

    fn supports(&self, kind: CatalogKind) -> bool {
        kind == CatalogKind::Series
    }

    async fn search(&self, query: &RemoteQuery) -> Result<Vec<RemoteCandidate>> {
        let mut results = self.search_shows(&query.name).await?;
        results.sort_by(|a, b| b.score.total_cmp(&a.score));

        Ok(results
            .into_iter()
            .map(|r| RemoteCandidate {
                provider: "tvmaze".to_string(),
                provider_id: r.show.id.to_string(),
                year: r.show.premiere_year(),
                name: r.show.name,
                score: r.score,
            })
            .filter(|c| match (query.year, c.year) {
                (Some(wanted), Some(year)) => wanted == year,
                _ => true,
            })
            .collect())
    }

    async fn episode_name(
        &self,
        candidate: &RemoteCandidate,
        season: u32,
        episode: u32,
    ) -> Result<Option<String>> {
        let episode = self
            .episode_by_number(show_id(candidate)?, season, episode)
            .await?;
        Ok(episode.map(|e| e.name).filter(|n| !n.is_empty()))
    }

    async fn episode_by_air_date(
        &self,
        candidate: &RemoteCandidate,
        air_date: NaiveDate,
    ) -> Result<Option<RemoteEpisode>> {
        let episodes = self.episodes_by_date(show_id(candidate)?, air_date).await?;
        Ok(episodes.into_iter().find_map(|e| {
            e.number.map(|number| RemoteEpisode {
                season: e.season,
                episode: number,
                name: Some(e.name).filter(|n| !n.is_empty()),
            })
        }))
    }
}
