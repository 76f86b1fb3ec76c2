//! Episode organizer

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, info, warn};

use super::{Correction, OrganizeRequest, OrganizerContext, has_overwrite_keyword};
use crate::db::{ExtractedInfo, OrganizationResult, OrganizationStatus, OrganizerType};
use crate::services::catalog::{CatalogItem, CatalogKind};
use crate::services::conflict::{self, ConflictInput};
use crate::services::file_utils::extension_of;
use crate::services::matcher::MatchOutcome;
use crate::services::metadata::RemoteCandidate;
use crate::services::naming::{
    EpisodeNaming, render_episode_file, render_season_folder, render_series_folder,
};

/// User-confirmed identity for an episode file
#[derive(Debug, Clone, Default)]
pub struct EpisodeCorrection {
    pub series_name: String,
    pub series_year: Option<i32>,
    /// Existing series folder, when the user picked one
    pub series_folder: Option<PathBuf>,
    pub season: u32,
    pub episode: u32,
    pub ending_episode: Option<u32>,
    pub remember_match: bool,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EpisodeOrganizer;

/// Where the series lives, or will live
struct SeriesTarget {
    name: String,
    year: Option<i32>,
    folder: Option<PathBuf>,
    item: Option<CatalogItem>,
    remote: Option<RemoteCandidate>,
}

impl SeriesTarget {
    fn from_item(item: CatalogItem) -> Self {
        Self {
            name: item.name.clone(),
            year: item.year,
            folder: Some(item.path.clone()),
            item: Some(item),
            remote: None,
        }
    }

    fn new_series(name: &str, year: Option<i32>) -> Self {
        Self {
            name: name.to_string(),
            year,
            folder: None,
            item: None,
            remote: None,
        }
    }
}

impl EpisodeOrganizer {
    pub async fn organize(
        &self,
        ctx: &OrganizerContext,
        result: &mut OrganizationResult,
        request: &OrganizeRequest,
    ) -> Result<()> {
        let tv = &ctx.options.tv;
        let file_name = result.original_file_name.clone();

        let mut info = ctx.parser.parse_episode(&file_name);
        ctx.inspect_source(result, &mut info).await;
        result.extracted = info.clone();

        if ctx.source_in_use(result).await {
            return Ok(());
        }

        let correction = match &request.correction {
            Some(Correction::Episode(c)) => Some(c),
            _ => None,
        };
        if let Some(c) = correction {
            info.name = Some(c.series_name.clone());
            info.year = c.series_year;
            info.season_number = Some(c.season);
            info.episode_number = Some(c.episode);
            info.ending_episode_number = c.ending_episode.filter(|end| *end > c.episode);
        }

        let Some(series_name) = info.name.clone().filter(|n| !n.trim().is_empty()) else {
            result.set_status(
                OrganizationStatus::Failure,
                "Unable to determine series name from file name",
            );
            return Ok(());
        };

        let mut series = match correction {
            Some(c) => self.series_from_correction(ctx, c).await?,
            None => {
                let outcome = ctx
                    .matcher
                    .resolve(
                        CatalogKind::Series,
                        &series_name,
                        info.year,
                        &file_name,
                        tv.auto_detect,
                    )
                    .await?;
                match outcome {
                    MatchOutcome::Existing(item) | MatchOutcome::SmartMatch { item, .. } => {
                        SeriesTarget::from_item(item)
                    }
                    MatchOutcome::Remembered(entry) => SeriesTarget {
                        name: entry.canonical_name,
                        year: None,
                        folder: entry.target_folder,
                        item: None,
                        remote: None,
                    },
                    MatchOutcome::Remote(candidate) => SeriesTarget {
                        name: candidate.name.clone(),
                        year: candidate.year.or(info.year),
                        folder: None,
                        item: None,
                        remote: Some(candidate),
                    },
                    MatchOutcome::Ambiguous(items) => {
                        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
                        result.set_status(
                            OrganizationStatus::Waiting,
                            format!(
                                "Multiple series match '{}': {}",
                                series_name,
                                names.join(", ")
                            ),
                        );
                        return Ok(());
                    }
                    MatchOutcome::NotFound => SeriesTarget::new_series(&series_name, info.year),
                }
            }
        };

        if info.season_number.is_none() || info.episode_number.is_none() {
            self.number_from_air_date(ctx, &mut series, &mut info).await;
        }
        let (Some(season), Some(episode)) = (info.season_number, info.episode_number) else {
            result.extracted = info.clone();
            match info.air_date {
                // Daily show nobody could number; a correction supplies it
                Some(air_date) => result.set_status(
                    OrganizationStatus::UserInputRequired,
                    format!(
                        "No episode found for air date {}; enter the season and episode number",
                        air_date
                    ),
                ),
                None => result.set_status(
                    OrganizationStatus::Failure,
                    "Unable to determine season and episode number from file name",
                ),
            }
            return Ok(());
        };

        if info.episode_name.is_none() && tv.auto_detect {
            info.episode_name = self
                .remote_episode_name(ctx, &series, season, episode)
                .await;
        }

        info.name = Some(series.name.clone());
        info.year = series.year;
        result.extracted = info.clone();
        result.existing_catalog_id = series.item.as_ref().map(|i| i.id).unwrap_or(0);

        let target = match self.target_path(ctx, result, &series, &info, season, episode) {
            Ok(Some(target)) => target,
            Ok(None) => return Ok(()),
            Err(message) => {
                result.set_status(OrganizationStatus::Failure, message);
                return Ok(());
            }
        };
        result.target_path = Some(target.clone());
        result.external_subtitle_paths = ctx.sibling_subtitles(&result.original_path).await;

        let target_exists = ctx.fs.exists(&target).await;
        let last_episode = info.ending_episode_number.unwrap_or(episode).max(episode);
        let mut duplicates: Vec<PathBuf> = series
            .item
            .iter()
            .flat_map(|item| item.files.iter())
            .filter(|f| (episode..=last_episode).any(|e| f.covers_episode(season, e)))
            .map(|f| f.path.clone())
            .filter(|p| *p != result.original_path)
            .collect();
        if target_exists && !duplicates.contains(&target) {
            duplicates.push(target.clone());
        }
        duplicates.sort();
        duplicates.dedup();

        debug!(
            file_id = %result.id,
            series = %series.name,
            season,
            episode,
            target = %target.display(),
            duplicates = duplicates.len(),
            "Episode target resolved"
        );

        let input = ConflictInput {
            organizer_type: Some(OrganizerType::Episode),
            source_locked: false,
            source_equals_target: target == result.original_path,
            target_exists,
            overwrite_enabled: tv.overwrite_existing,
            overwrite_keyword_present: has_overwrite_keyword(&file_name, &tv.overwrite_keywords),
            auto_detect: tv.auto_detect,
            match_existing_only: tv.match_existing_only,
            in_catalog: series.item.is_some(),
            duplicates,
            existing_movie_file: None,
            request_to_move: request.bypasses_holds(),
        };
        let decision = conflict::resolve(&input);
        ctx.apply_decision(result, decision, &target, target_exists, tv.delete_duplicates)
            .await;
        Ok(())
    }

    /// Series chosen by the user: the picked folder, else the catalog by name
    async fn series_from_correction(
        &self,
        ctx: &OrganizerContext,
        correction: &EpisodeCorrection,
    ) -> Result<SeriesTarget> {
        if let Some(folder) = &correction.series_folder {
            if let Some(item) = ctx.matcher.catalog().find_folder_by_path(folder).await? {
                if item.kind == CatalogKind::Series {
                    return Ok(SeriesTarget::from_item(item));
                }
            }
            return Ok(SeriesTarget {
                folder: Some(folder.clone()),
                ..SeriesTarget::new_series(&correction.series_name, correction.series_year)
            });
        }

        let mut candidates = ctx
            .matcher
            .find_candidates(
                CatalogKind::Series,
                &correction.series_name,
                correction.series_year,
            )
            .await?;
        if candidates.len() == 1 {
            if let Some(item) = candidates.pop() {
                return Ok(SeriesTarget::from_item(item));
            }
        }
        Ok(SeriesTarget::new_series(
            &correction.series_name,
            correction.series_year,
        ))
    }

    /// Daily shows: ask the remote provider which episode aired on the date
    async fn number_from_air_date(
        &self,
        ctx: &OrganizerContext,
        series: &mut SeriesTarget,
        info: &mut ExtractedInfo,
    ) {
        let Some(air_date) = info.air_date else {
            return;
        };
        if series.remote.is_none() && ctx.options.tv.auto_detect {
            series.remote = ctx
                .matcher
                .remote_candidate(CatalogKind::Series, &series.name, series.year)
                .await;
        }
        let Some(candidate) = &series.remote else {
            return;
        };

        let lookup = ctx.matcher.remote().for_kind(CatalogKind::Series);
        match lookup.episode_by_air_date(candidate, air_date).await {
            Ok(Some(found)) => {
                info!(
                    series = %series.name,
                    air_date = %air_date,
                    season = found.season,
                    episode = found.episode,
                    "Resolved episode from air date"
                );
                info.season_number = Some(found.season);
                info.episode_number = Some(found.episode);
                if info.episode_name.is_none() {
                    info.episode_name = found.name;
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!(series = %series.name, error = %e, "Air date lookup failed");
            }
        }
    }

    async fn remote_episode_name(
        &self,
        ctx: &OrganizerContext,
        series: &SeriesTarget,
        season: u32,
        episode: u32,
    ) -> Option<String> {
        match &series.remote {
            Some(candidate) => {
                let lookup = ctx.matcher.remote().for_kind(CatalogKind::Series);
                lookup
                    .episode_name(candidate, season, episode)
                    .await
                    .ok()
                    .flatten()
            }
            None => {
                ctx.matcher
                    .remote_episode_name(&series.name, series.year, season, episode)
                    .await
            }
        }
    }

    /// Full target path.
    ///
    /// `Ok(None)` means the result already carries the reason it can't be built.
    fn target_path(
        &self,
        ctx: &OrganizerContext,
        result: &mut OrganizationResult,
        series: &SeriesTarget,
        info: &ExtractedInfo,
        season: u32,
        episode: u32,
    ) -> std::result::Result<Option<PathBuf>, String> {
        let tv = &ctx.options.tv;
        let series_folder = match &series.folder {
            Some(folder) => folder.clone(),
            None => {
                let Some(library) = &tv.library_path else {
                    result.set_status(
                        OrganizationStatus::Failure,
                        "No TV library folder is configured for new series",
                    );
                    return Ok(None);
                };
                let name = render_series_folder(&tv.series_folder_pattern, &series.name, series.year)
                    .map_err(|e| e.to_string())?;
                library.join(name)
            }
        };

        let season_folder = render_season_folder(
            &tv.season_folder_pattern,
            &tv.season_zero_folder_name,
            &series.name,
            season,
        )
        .map_err(|e| e.to_string())?;

        let path = Path::new(&result.original_file_name);
        let extension = extension_of(path).unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let naming = EpisodeNaming {
            series_name: &series.name,
            series_year: series.year,
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
        .map_err(|e| e.to_string())?;

        Ok(Some(series_folder.join(season_folder).join(file)))
    }
}
