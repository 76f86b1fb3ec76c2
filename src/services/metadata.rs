//! Remote metadata lookup
//!
//! Consulted only when a parsed name isn't in the catalog and auto-detection
//! is enabled. Candidates come back ranked; the matcher picks the first one
//! whose name agrees with the query.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::services::catalog::CatalogKind;

#[derive(Debug, Clone)]
pub struct RemoteQuery {
    pub kind: CatalogKind,
    pub name: String,
    pub year: Option<i32>,
}

/// A ranked search hit from a remote provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCandidate {
    pub provider: String,
    pub provider_id: String,
    pub name: String,
    pub year: Option<i32>,
    pub score: f64,
}

/// Episode numbering resolved from an air date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEpisode {
    pub season: u32,
    pub episode: u32,
    pub name: Option<String>,
}

#[async_trait]
pub trait RemoteLookup: Send + Sync {
    fn provider_name(&self) -> &str;

    fn supports(&self, kind: CatalogKind) -> bool;

    async fn search(&self, query: &RemoteQuery) -> Result<Vec<RemoteCandidate>>;

    async fn episode_name(
        &self,
        _candidate: &RemoteCandidate,
        _season: u32,
        _episode: u32,
    ) -> Result<Option<String>> {
        Ok(None)
    }

    async fn episode_by_air_date(
        &self,
        _candidate: &RemoteCandidate,
        _air_date: NaiveDate,
    ) -> Result<Option<RemoteEpisode>> {
        Ok(None)
    }
}

/// Lookup that never finds anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRemoteLookup;

#[async_trait]
impl RemoteLookup for NoRemoteLookup {
    fn provider_name(&self) -> &str {
        "none"
    }

    fn supports(&self, _kind: CatalogKind) -> bool {
        false
    }

    async fn search(&self, _query: &RemoteQuery) -> Result<Vec<RemoteCandidate>> {
        Ok(Vec::new())
    }
}

/// Routes series queries to one provider and movie queries to another
pub struct RemoteLookups {
    series: Box<dyn RemoteLookup>,
    movies: Box<dyn RemoteLookup>,
}

impl RemoteLookups {
    pub fn new(series: Box<dyn RemoteLookup>, movies: Box<dyn RemoteLookup>) -> Self {
        Self { series, movies }
    }

    pub fn none() -> Self {
        Self::new(Box::new(NoRemoteLookup), Box::new(NoRemoteLookup))
    }

    pub fn for_kind(&self, kind: CatalogKind) -> &dyn RemoteLookup {
        match kind {
            CatalogKind::Series => self.series.as_ref(),
            CatalogKind::Movie => self.movies.as_ref(),
        }
    }
}
