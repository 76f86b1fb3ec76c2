//! Catalog matching
//!
//! Resolves a parsed series or movie name to the catalog: exact normalized
//! matches first, then containment. With no hit the smart-match memory is
//! consulted, then (when auto-detection is on) the remote lookup.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::db::{Database, OrganizerType, SmartMatchEntry};
use crate::services::catalog::{Catalog, CatalogFilter, CatalogItem, CatalogKind, NameMatch};
use crate::services::metadata::{RemoteCandidate, RemoteLookups, RemoteQuery};
use crate::services::text_utils::normalize_for_comparison;

#[derive(Debug, Clone)]
pub enum MatchOutcome {
    /// Exactly one catalog item matched the parsed name
    Existing(CatalogItem),
    /// A remembered match string led to a catalog item
    SmartMatch {
        item: CatalogItem,
        entry: SmartMatchEntry,
    },
    /// A remembered match whose item isn't in the catalog yet
    Remembered(SmartMatchEntry),
    /// New item identified by the remote lookup
    Remote(RemoteCandidate),
    /// Several catalog items fit
    Ambiguous(Vec<CatalogItem>),
    NotFound,
}

pub fn organizer_type_for(kind: CatalogKind) -> OrganizerType {
    match kind {
        CatalogKind::Series => OrganizerType::Episode,
        CatalogKind::Movie => OrganizerType::Movie,
    }
}

#[derive(Clone)]
pub struct CatalogMatcher {
    db: Database,
    catalog: Arc<dyn Catalog>,
    remote: Arc<RemoteLookups>,
}

impl CatalogMatcher {
    pub fn new(db: Database, catalog: Arc<dyn Catalog>, remote: Arc<RemoteLookups>) -> Self {
        Self {
            db,
            catalog,
            remote,
        }
    }

    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    /// Catalog items for a name: exact matches, else containment matches
    pub async fn find_candidates(
        &self,
        kind: CatalogKind,
        name: &str,
        year: Option<i32>,
    ) -> Result<Vec<CatalogItem>> {
        let mut filter = CatalogFilter::named(kind, name, NameMatch::Exact);
        filter.year = year;
        let exact = self.catalog.find_items(&filter).await?;
        if !exact.is_empty() {
            return Ok(exact);
        }

        filter.name_match = NameMatch::Contains;
        self.catalog.find_items(&filter).await
    }

    /// Resolve a parsed identity.
    ///
    /// `source_file_name` is checked against remembered match strings.
    pub async fn resolve(
        &self,
        kind: CatalogKind,
        name: &str,
        year: Option<i32>,
        source_file_name: &str,
        auto_detect: bool,
    ) -> Result<MatchOutcome> {
        let mut candidates = self.find_candidates(kind, name, year).await?;
        if candidates.len() > 1 {
            info!(name = %name, candidates = candidates.len(), "Ambiguous catalog match");
            return Ok(MatchOutcome::Ambiguous(candidates));
        }
        if let Some(item) = candidates.pop() {
            debug!(name = %name, matched = %item.name, "Matched catalog item");
            return Ok(MatchOutcome::Existing(item));
        }

        if let Some(outcome) = self.resolve_smart_match(kind, source_file_name).await? {
            return Ok(outcome);
        }

        if auto_detect {
            if let Some(candidate) = self.remote_candidate(kind, name, year).await {
                info!(
                    name = %name,
                    provider = %candidate.provider,
                    matched = %candidate.name,
                    "Identified new item through remote lookup"
                );
                return Ok(MatchOutcome::Remote(candidate));
            }
        }

        Ok(MatchOutcome::NotFound)
    }

    /// Look for a remembered fragment contained in the source filename
    async fn resolve_smart_match(
        &self,
        kind: CatalogKind,
        source_file_name: &str,
    ) -> Result<Option<MatchOutcome>> {
        let normalized_source = normalize_for_comparison(source_file_name);
        let entries = self.db.smart_matches().list(Some(organizer_type_for(kind)));

        for entry in entries {
            let hit = entry.match_strings.iter().any(|s| {
                let needle = normalize_for_comparison(s);
                !needle.is_empty() && normalized_source.contains(&needle)
            });
            if !hit {
                continue;
            }

            debug!(
                source = %source_file_name,
                canonical = %entry.canonical_name,
                "Smart match hit"
            );
            let items = self
                .find_candidates(kind, &entry.canonical_name, None)
                .await?;
            match items.len() {
                0 => {
                    if entry.target_folder.is_some() {
                        return Ok(Some(MatchOutcome::Remembered(entry)));
                    }
                }
                1 => {
                    if let Some(item) = items.into_iter().next() {
                        return Ok(Some(MatchOutcome::SmartMatch { item, entry }));
                    }
                }
                _ => return Ok(Some(MatchOutcome::Ambiguous(items))),
            }
        }

        Ok(None)
    }

    /// First remote candidate whose name contains the query name
    pub async fn remote_candidate(
        &self,
        kind: CatalogKind,
        name: &str,
        year: Option<i32>,
    ) -> Option<RemoteCandidate> {
        let lookup = self.remote.for_kind(kind);
        if !lookup.supports(kind) {
            return None;
        }

        let query = RemoteQuery {
            kind,
            name: name.to_string(),
            year,
        };
        let candidates = match lookup.search(&query).await {
            Ok(c) => c,
            Err(e) => {
                warn!(name = %name, provider = %lookup.provider_name(), error = %e, "Remote lookup failed");
                return None;
            }
        };

        let wanted = normalize_for_comparison(name);
        candidates
            .into_iter()
            .find(|c| !wanted.is_empty() && normalize_for_comparison(&c.name).contains(&wanted))
    }

    /// Episode title from the remote provider, if it has one
    pub async fn remote_episode_name(
        &self,
        series_name: &str,
        year: Option<i32>,
        season: u32,
        episode: u32,
    ) -> Option<String> {
        let candidate = self
            .remote_candidate(CatalogKind::Series, series_name, year)
            .await?;
        let lookup = self.remote.for_kind(CatalogKind::Series);
        match lookup.episode_name(&candidate, season, episode).await {
            Ok(name) => name,
            Err(e) => {
                warn!(series = %series_name, season, episode, error = %e, "Episode name lookup failed");
                None
            }
        }
    }

    pub fn remote(&self) -> &RemoteLookups {
        &self.remote
    }
}
