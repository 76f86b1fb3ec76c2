//! Subtitle organizer
//!
//! A subtitle follows the media file it belongs to: the companion must have
//! been organized already, and the subtitle lands next to it with the
//! companion's new name plus the original language suffix.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::debug;

use super::{OrganizeRequest, OrganizerContext, has_overwrite_keyword};
use crate::db::{OrganizationResult, OrganizationStatus, OrganizerType};
use crate::services::conflict::{self, ConflictInput};
use crate::services::file_utils::extension_of;

const FLAG_TAGS: &[&str] = &["forced", "sdh", "cc", "hi", "default"];

#[derive(Debug, Default, Clone, Copy)]
pub struct SubtitleOrganizer;

fn is_subtitle_tag(segment: &str) -> bool {
    let lower = segment.to_lowercase();
    FLAG_TAGS.contains(&lower.as_str())
        || ((2..=3).contains(&lower.len()) && lower.chars().all(|c| c.is_ascii_alphabetic()))
}

/// Language/flag suffix of a subtitle stem, including the leading dot.
///
/// When the subtitle stem starts with the media stem, everything after it is
/// the suffix; otherwise trailing tag segments are collected.
pub fn subtitle_suffix(subtitle_stem: &str, media_stem: Option<&str>) -> String {
    if let Some(media_stem) = media_stem {
        let lower = subtitle_stem.to_lowercase();
        if !media_stem.is_empty() && lower.starts_with(&media_stem.to_lowercase()) {
            if let Some(rest) = subtitle_stem.get(media_stem.len()..) {
                let all_tags = rest
                    .split('.')
                    .filter(|s| !s.is_empty())
                    .all(is_subtitle_tag);
                if rest.starts_with('.') && all_tags {
                    return rest.to_string();
                }
                if rest.is_empty() {
                    return String::new();
                }
            }
        }
    }

    let segments: Vec<&str> = subtitle_stem.split('.').collect();
    let tags: Vec<&str> = segments
        .iter()
        .skip(1)
        .rev()
        .take_while(|s| is_subtitle_tag(s))
        .copied()
        .collect();
    if tags.is_empty() {
        return String::new();
    }
    let mut suffix = String::new();
    for tag in tags.iter().rev() {
        suffix.push('.');
        suffix.push_str(tag);
    }
    suffix
}

impl SubtitleOrganizer {
    pub async fn organize(
        &self,
        ctx: &OrganizerContext,
        result: &mut OrganizationResult,
        request: &OrganizeRequest,
    ) -> Result<()> {
        let mut info = ctx.parser.parse_quality(&result.original_file_name);
        ctx.inspect_source(result, &mut info).await;
        result.extracted = info;

        if ctx.source_in_use(result).await {
            return Ok(());
        }

        let Some(companion) = self.find_companion(ctx, &result.original_path) else {
            result.set_status(
                OrganizationStatus::Failure,
                "No organized media file found for this subtitle",
            );
            return Ok(());
        };
        let Some(media_target) = companion.target_path.clone() else {
            result.set_status(
                OrganizationStatus::Failure,
                "No organized media file found for this subtitle",
            );
            return Ok(());
        };

        let source_stem = result
            .original_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let companion_stem = companion
            .original_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string());
        let suffix = subtitle_suffix(&source_stem, companion_stem.as_deref());
        let extension = extension_of(&result.original_path).unwrap_or_default();
        let target_stem = media_target
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let target_name = format!("{}{}.{}", target_stem, suffix, extension);
        let target = media_target
            .parent()
            .map(|p| p.join(&target_name))
            .unwrap_or_else(|| PathBuf::from(&target_name));

        result.extracted.name = companion.extracted.name.clone();
        result.extracted.year = companion.extracted.year;
        result.extracted.season_number = companion.extracted.season_number;
        result.extracted.episode_number = companion.extracted.episode_number;
        result.existing_catalog_id = companion.existing_catalog_id;
        result.target_path = Some(target.clone());

        debug!(
            file_id = %result.id,
            companion = %companion.id,
            target = %target.display(),
            "Subtitle target resolved"
        );

        let (overwrite_enabled, keywords) = match companion.organizer_type {
            OrganizerType::Movie => (
                ctx.options.movie.overwrite_existing,
                &ctx.options.movie.overwrite_keywords,
            ),
            _ => (
                ctx.options.tv.overwrite_existing,
                &ctx.options.tv.overwrite_keywords,
            ),
        };
        let target_exists = ctx.fs.exists(&target).await;
        let input = ConflictInput {
            organizer_type: Some(OrganizerType::Subtitle),
            source_equals_target: target == result.original_path,
            target_exists,
            overwrite_enabled,
            overwrite_keyword_present: has_overwrite_keyword(&result.original_file_name, keywords),
            auto_detect: true,
            in_catalog: true,
            duplicates: if target_exists {
                vec![target.clone()]
            } else {
                Vec::new()
            },
            request_to_move: request.bypasses_holds(),
            ..Default::default()
        };
        let decision = conflict::resolve(&input);
        ctx.apply_decision(result, decision, &target, target_exists, false)
            .await;
        Ok(())
    }

    /// The organized media result this subtitle belongs to
    fn find_companion(&self, ctx: &OrganizerContext, source: &Path) -> Option<OrganizationResult> {
        let organized: Vec<OrganizationResult> = ctx
            .db
            .results()
            .list()
            .into_iter()
            .filter(|r| r.status == OrganizationStatus::Success)
            .filter(|r| matches!(r.organizer_type, OrganizerType::Episode | OrganizerType::Movie))
            .collect();

        if let Some(found) = organized
            .iter()
            .find(|r| r.external_subtitle_paths.iter().any(|p| p == source))
        {
            return Some(found.clone());
        }

        let source_dir = source.parent();
        let source_stem = source.file_stem()?.to_string_lossy().to_lowercase();
        organized
            .into_iter()
            .filter(|r| r.original_path.parent() == source_dir)
            .filter(|r| {
                r.original_path
                    .file_stem()
                    .map(|s| source_stem.starts_with(&s.to_string_lossy().to_lowercase()))
                    .unwrap_or(false)
            })
            .max_by_key(|r| {
                r.original_path
                    .file_stem()
                    .map(|s| s.len())
                    .unwrap_or(0)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_after_media_stem() {
        assert_eq!(
            subtitle_suffix("Show.S01E01.720p.en.forced", Some("Show.S01E01.720p")),
            ".en.forced"
        );
        assert_eq!(subtitle_suffix("Show.S01E01", Some("Show.S01E01")), "");
    }

    #[test]
    fn test_suffix_from_trailing_tags() {
        assert_eq!(subtitle_suffix("Other Name.eng.sdh", None), ".eng.sdh");
        assert_eq!(subtitle_suffix("Other Name.2019.1080p", None), "");
        assert_eq!(subtitle_suffix("en", None), "");
    }
}
