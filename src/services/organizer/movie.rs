//! Movie organizer

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::debug;

use super::{Correction, OrganizeRequest, OrganizerContext, has_overwrite_keyword};
use crate::db::{ExtractedInfo, OrganizationResult, OrganizationStatus, OrganizerType};
use crate::services::catalog::{CatalogItem, CatalogKind};
use crate::services::conflict::{self, ConflictInput, ExistingMovieFile};
use crate::services::file_utils::extension_of;
use crate::services::matcher::MatchOutcome;
use crate::services::naming::{MovieNaming, render_movie_file, render_movie_folder};

/// User-confirmed identity for a movie file
#[derive(Debug, Clone, Default)]
pub struct MovieCorrection {
    pub name: String,
    pub year: Option<i32>,
    /// Existing movie folder, when the user picked one
    pub movie_folder: Option<PathBuf>,
    pub remember_match: bool,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MovieOrganizer;

struct MovieTarget {
    name: String,
    year: Option<i32>,
    folder: Option<PathBuf>,
    item: Option<CatalogItem>,
}

impl MovieTarget {
    fn from_item(item: CatalogItem, parsed_year: Option<i32>) -> Self {
        Self {
            name: item.name.clone(),
            year: item.year.or(parsed_year),
            folder: Some(item.path.clone()),
            item: Some(item),
        }
    }

    fn new_movie(name: &str, year: Option<i32>) -> Self {
        Self {
            name: name.to_string(),
            year,
            folder: None,
            item: None,
        }
    }
}

impl MovieOrganizer {
    pub async fn organize(
        &self,
        ctx: &OrganizerContext,
        result: &mut OrganizationResult,
        request: &OrganizeRequest,
    ) -> Result<()> {
        let movie_options = &ctx.options.movie;
        let file_name = result.original_file_name.clone();

        let mut info = ctx.parser.parse_movie(&file_name);
        ctx.inspect_source(result, &mut info).await;
        result.extracted = info.clone();

        if ctx.source_in_use(result).await {
            return Ok(());
        }

        let correction = match &request.correction {
            Some(Correction::Movie(c)) => Some(c),
            _ => None,
        };
        if let Some(c) = correction {
            info.name = Some(c.name.clone());
            info.year = c.year;
        }

        let Some(movie_name) = info.name.clone().filter(|n| !n.trim().is_empty()) else {
            result.set_status(
                OrganizationStatus::Failure,
                "Unable to determine movie name from file name",
            );
            return Ok(());
        };

        let movie = match correction {
            Some(c) => self.movie_from_correction(ctx, c).await?,
            None => {
                let outcome = ctx
                    .matcher
                    .resolve(
                        CatalogKind::Movie,
                        &movie_name,
                        info.year,
                        &file_name,
                        movie_options.auto_detect,
                    )
                    .await?;
                match outcome {
                    MatchOutcome::Existing(item) | MatchOutcome::SmartMatch { item, .. } => {
                        MovieTarget::from_item(item, info.year)
                    }
                    MatchOutcome::Remembered(entry) => MovieTarget {
                        name: entry.canonical_name,
                        year: info.year,
                        folder: entry.target_folder,
                        item: None,
                    },
                    MatchOutcome::Remote(candidate) => {
                        MovieTarget::new_movie(&candidate.name, candidate.year.or(info.year))
                    }
                    MatchOutcome::Ambiguous(items) => {
                        let names: Vec<String> = items
                            .iter()
                            .map(|i| match i.year {
                                Some(y) => format!("{} ({})", i.name, y),
                                None => i.name.clone(),
                            })
                            .collect();
                        result.set_status(
                            OrganizationStatus::Waiting,
                            format!(
                                "Multiple movies match '{}': {}",
                                movie_name,
                                names.join(", ")
                            ),
                        );
                        return Ok(());
                    }
                    MatchOutcome::NotFound => MovieTarget::new_movie(&movie_name, info.year),
                }
            }
        };

        info.name = Some(movie.name.clone());
        info.year = movie.year;
        result.extracted = info.clone();
        result.existing_catalog_id = movie.item.as_ref().map(|i| i.id).unwrap_or(0);

        let target = match self.target_path(ctx, result, &movie, &info) {
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
        let existing_movie_file = movie.item.as_ref().and_then(|item| {
            item.files
                .iter()
                .find(|f| f.path != result.original_path && f.path != target)
                .map(|f| ExistingMovieFile {
                    path: f.path.clone(),
                    resolution: f.resolution.clone(),
                    edition: f.edition.clone(),
                    new_resolution: Some(info.resolution.name.clone()).filter(|r| !r.is_empty()),
                    new_edition: info.edition.clone(),
                })
        });
        let duplicates = if target_exists {
            vec![target.clone()]
        } else {
            Vec::new()
        };

        debug!(
            file_id = %result.id,
            movie = %movie.name,
            target = %target.display(),
            existing_file = existing_movie_file.is_some(),
            "Movie target resolved"
        );

        let input = ConflictInput {
            organizer_type: Some(OrganizerType::Movie),
            source_locked: false,
            source_equals_target: target == result.original_path,
            target_exists,
            overwrite_enabled: movie_options.overwrite_existing,
            overwrite_keyword_present: has_overwrite_keyword(
                &file_name,
                &movie_options.overwrite_keywords,
            ),
            auto_detect: movie_options.auto_detect,
            match_existing_only: movie_options.match_existing_only,
            in_catalog: movie.item.is_some(),
            duplicates,
            existing_movie_file,
            request_to_move: request.bypasses_holds(),
        };
        let decision = conflict::resolve(&input);
        // A confirmed edition or resolution upgrade keeps the other file
        ctx.apply_decision(result, decision, &target, target_exists, false)
            .await;
        Ok(())
    }

    async fn movie_from_correction(
        &self,
        ctx: &OrganizerContext,
        correction: &MovieCorrection,
    ) -> Result<MovieTarget> {
        if let Some(folder) = &correction.movie_folder {
            if let Some(item) = ctx.matcher.catalog().find_folder_by_path(folder).await? {
                if item.kind == CatalogKind::Movie {
                    return Ok(MovieTarget::from_item(item, correction.year));
                }
            }
            return Ok(MovieTarget {
                folder: Some(folder.clone()),
                ..MovieTarget::new_movie(&correction.name, correction.year)
            });
        }

        let mut candidates = ctx
            .matcher
            .find_candidates(CatalogKind::Movie, &correction.name, correction.year)
            .await?;
        if candidates.len() == 1 {
            if let Some(item) = candidates.pop() {
                return Ok(MovieTarget::from_item(item, correction.year));
            }
        }
        Ok(MovieTarget::new_movie(&correction.name, correction.year))
    }

    fn target_path(
        &self,
        ctx: &OrganizerContext,
        result: &mut OrganizationResult,
        movie: &MovieTarget,
        info: &ExtractedInfo,
    ) -> std::result::Result<Option<PathBuf>, String> {
        let movie_options = &ctx.options.movie;

        let path = Path::new(&result.original_file_name);
        let extension = extension_of(path).unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let naming = MovieNaming {
            name: &movie.name,
            year: movie.year,
            resolution: &info.resolution.name,
            edition: info.edition.as_deref(),
            extension: &extension,
            original_stem: &stem,
        };

        let folder = match &movie.folder {
            Some(folder) => folder.clone(),
            None => {
                let Some(library) = &movie_options.library_path else {
                    result.set_status(
                        OrganizationStatus::Failure,
                        "No movie library folder is configured for new movies",
                    );
                    return Ok(None);
                };
                let name = render_movie_folder(&movie_options.folder_pattern, &naming)
                    .map_err(|e| e.to_string())?;
                library.join(name)
            }
        };

        let file = render_movie_file(&movie_options.file_pattern, &naming)
            .map_err(|e| e.to_string())?;
        Ok(Some(folder.join(file)))
    }
}
