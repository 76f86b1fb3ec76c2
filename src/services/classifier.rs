//! Organizer type detection from filename shape

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::db::OrganizerType;
use crate::services::file_utils::has_extension;

static EPISODE_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\bS\d{1,3}[\s._]?E\d{1,4}\b|\b\d{1,2}x\d{2,3}\b|\bSeason[\s._-]*\d{1,3}[\s._-]*Episode[\s._-]*\d{1,4}\b)")
        .unwrap()
});

static YEAR_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:19|20|21)\d{2}\b").unwrap());

/// True when the name carries a season/episode marker
pub fn has_episode_marker(name: &str) -> bool {
    EPISODE_MARKER_RE.is_match(name)
}

/// True when the name carries a 19xx/20xx/21xx token
pub fn has_year_token(name: &str) -> bool {
    YEAR_TOKEN_RE.is_match(name)
}

/// Decide the organizer type for a media filename.
///
/// Markers dominate a year. Dates such as `2020.01.07` are not markers, so a
/// date-only name resolves to Movie. Names with no stem are Unknown.
pub fn classify(file_name: &str) -> OrganizerType {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    if stem.trim().is_empty() {
        return OrganizerType::Unknown;
    }

    if has_episode_marker(&stem) {
        OrganizerType::Episode
    } else {
        // With or without a year the default is Movie
        OrganizerType::Movie
    }
}

/// Classify a path, detecting subtitles by extension first
pub fn classify_path<S: AsRef<str>>(path: &Path, subtitle_extensions: &[S]) -> OrganizerType {
    if has_extension(path, subtitle_extensions) {
        return OrganizerType::Subtitle;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    classify(&file_name)
}

/// Whether a subtitle belongs to an episode or a movie, by its own filename
pub fn subtitle_companion_type(file_name: &str) -> OrganizerType {
    match classify(file_name) {
        OrganizerType::Unknown => OrganizerType::Unknown,
        OrganizerType::Episode => OrganizerType::Episode,
        _ => OrganizerType::Movie,
    }
}
