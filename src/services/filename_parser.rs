//! Filename parser for scene-style release names
//!
//! Parses filenames like:
//! - "Chicago Fire S14E08 1080p WEB h264-ETHEL"
//! - "The.Daily.Show.2026.01.07.Stephen.J.Dubner.720p.WEB.h264-EDITH"
//! - "Corner Gas - 6x12 - Super Sensitive.mkv"
//! - "Alien (1979) Director's Cut 2160p.mkv"
//!
//! The vocabularies (edition flags, resolution tokens, source and codec
//! tables) live in [`ParserVocabulary`] so callers and tests can swap them.

use std::path::Path;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::db::{ExtractedInfo, ResolutionInfo};
use crate::services::text_utils::{spaced, trim_separators};

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b((?:19|20|21)\d{2})\b").unwrap());

static SXXEXX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bS(\d{1,3})[\s._]?E(\d{1,4})(?:-?E(\d{1,4})|-(\d{1,4}))?\b").unwrap()
});

static NXNN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})x(\d{2,3})(?:-(?:\d{1,2}x)?(\d{2,3}))?\b").unwrap()
});

static VERBOSE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bSeason[\s._-]*(\d{1,3})[\s._-]*Episode[\s._-]*(\d{1,4})\b").unwrap()
});

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b((?:19|20)\d{2})[.\-_ ](\d{2})[.\-_ ](\d{2})\b").unwrap()
});

static RELEASE_GROUP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-[A-Za-z0-9]+$").unwrap());

/// A label plus the pattern that detects it in a filename
#[derive(Debug, Clone)]
pub struct TokenPattern {
    pub label: String,
    pub regex: Regex,
}

impl TokenPattern {
    /// Build a case-insensitive pattern
    pub fn new(label: &str, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            label: label.to_string(),
            regex: Regex::new(&format!("(?i){}", pattern))?,
        })
    }
}

/// Data tables the parser matches against
#[derive(Debug, Clone)]
pub struct ParserVocabulary {
    /// Edition flags, matched case-insensitively across separators
    pub edition_flags: Vec<String>,
    /// Resolution tokens, matched by containment
    pub resolution_tokens: Vec<String>,
    pub source_qualities: Vec<TokenPattern>,
    pub video_codecs: Vec<TokenPattern>,
    pub audio_codecs: Vec<TokenPattern>,
}

fn table(entries: &[(&str, &str)]) -> Vec<TokenPattern> {
    entries
        .iter()
        .map(|(label, pattern)| {
            TokenPattern::new(label, pattern).expect("valid built-in pattern")
        })
        .collect()
}

impl Default for ParserVocabulary {
    fn default() -> Self {
        Self {
            edition_flags: [
                "Director's Cut",
                "Extended Edition",
                "Extended Cut",
                "Extended",
                "Unrated",
                "Uncut",
                "Theatrical Cut",
                "Special Edition",
                "Ultimate Edition",
                "Collector's Edition",
                "Remastered",
                "Criterion",
                "IMAX",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            resolution_tokens: ["480p", "576p", "720p", "1080p", "1440p", "2160p", "4320p"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            source_qualities: table(&[
                ("WEB-DL", r"\bweb[\s._-]?dl\b"),
                ("WEBRip", r"\bweb[\s._-]?rip\b"),
                ("BluRay", r"\b(?:blu[\s._-]?ray|bdrip|brrip)\b"),
                ("REMUX", r"\bremux\b"),
                ("HDTV", r"\bhdtv\b"),
                ("DVDRip", r"\bdvd[\s._-]?rip\b"),
                ("TELESYNC", r"\b(?:telesync|hdts)\b"),
                ("CAM", r"\b(?:cam|camrip|hdcam)\b"),
            ]),
            video_codecs: table(&[
                ("h264", r"\b(?:[xh][\s.]?264|avc)\b"),
                ("hevc", r"\b(?:[xh][\s.]?265|hevc)\b"),
                ("av1", r"\bav1\b"),
                ("xvid", r"\bxvid\b"),
                ("vc1", r"\bvc-?1\b"),
            ]),
            audio_codecs: table(&[
                ("truehd", r"\btruehd\b"),
                ("atmos", r"\batmos\b"),
                ("dts-hd", r"\bdts[\s.-]?hd\b"),
                ("dts", r"\bdts\b"),
                ("eac3", r"\b(?:e-?ac-?3|ddp)"),
                ("ac3", r"\b(?:ac3|dd5)"),
                ("aac", r"\baac"),
                ("flac", r"\bflac\b"),
                ("mp3", r"\bmp3\b"),
            ]),
        }
    }
}

/// Regex/heuristic parser for movie and episode filenames
#[derive(Debug, Clone)]
pub struct NameParser {
    vocabulary: ParserVocabulary,
    editions: Vec<(String, Regex)>,
    resolution_re: Option<Regex>,
}

impl Default for NameParser {
    fn default() -> Self {
        Self::new(ParserVocabulary::default())
    }
}

impl NameParser {
    pub fn new(vocabulary: ParserVocabulary) -> Self {
        let mut flags = vocabulary.edition_flags.clone();
        flags.sort_by_key(|f| std::cmp::Reverse(f.len()));
        let editions = flags
            .into_iter()
            .filter_map(|flag| {
                let pattern = regex::escape(&flag)
                    .replace(' ', r"[\s._-]+")
                    .replace('\'', "'?");
                Regex::new(&format!(r"(?i)\b{}\b", pattern))
                    .ok()
                    .map(|re| (flag, re))
            })
            .collect();

        let resolution_re = if vocabulary.resolution_tokens.is_empty() {
            None
        } else {
            let mut tokens = vocabulary.resolution_tokens.clone();
            tokens.sort_by_key(|t| std::cmp::Reverse(t.len()));
            let alternation = tokens
                .iter()
                .map(|t| regex::escape(t))
                .collect::<Vec<_>>()
                .join("|");
            Regex::new(&format!("(?i)({})", alternation)).ok()
        };

        Self {
            vocabulary,
            editions,
            resolution_re,
        }
    }

    /// Split a "Name (Year)" style string into a display name and a year.
    ///
    /// The last year-like token that isn't at the very start wins, so
    /// "Blade Runner 2049 (2017)" keeps 2049 in the name. Anything after
    /// the year is discarded.
    pub fn parse_name_and_year(&self, value: &str) -> (String, Option<i32>) {
        let text = spaced(value);
        let year_match = YEAR_RE
            .captures_iter(&text)
            .filter_map(|c| c.get(1))
            .filter(|m| m.start() > 0)
            .last();

        match year_match {
            Some(m) => {
                let name = trim_separators(&text[..m.start()]);
                if name.is_empty() {
                    (trim_separators(&text), None)
                } else {
                    (name, m.as_str().parse().ok())
                }
            }
            None => (trim_separators(&text), None),
        }
    }

    /// Parse a movie filename
    pub fn parse_movie(&self, file_name: &str) -> ExtractedInfo {
        let stem = file_stem(file_name);
        let mut info = self.parse_quality(&stem);

        let mut remaining = stem.clone();
        for (flag, re) in &self.editions {
            if re.is_match(&remaining) {
                info.edition = Some(flag.clone());
                remaining = re.replace(&remaining, " ").into_owned();
                break;
            }
        }

        let head = &remaining[..self.quality_start(&remaining)];
        let (name, year) = self.parse_name_and_year(head);
        info.name = non_empty(name);
        info.year = year;

        debug!(
            file_name = file_name,
            name = ?info.name,
            year = ?info.year,
            edition = ?info.edition,
            resolution = %info.resolution.name,
            "Parsed movie filename"
        );

        info
    }

    /// Parse an episode filename.
    ///
    /// Grammars are tried in order: `SxxExx` (with multi-episode forms),
    /// `NxNN`, `Season N Episode M`, then an air date.
    pub fn parse_episode(&self, file_name: &str) -> ExtractedInfo {
        let stem = file_stem(file_name);
        let mut info = self.parse_quality(&stem);

        let marker = if let Some(caps) = SXXEXX_RE.captures(&stem) {
            info.season_number = caps.get(1).and_then(|m| m.as_str().parse().ok());
            info.episode_number = caps.get(2).and_then(|m| m.as_str().parse().ok());
            info.ending_episode_number = caps
                .get(3)
                .or_else(|| caps.get(4))
                .and_then(|m| m.as_str().parse().ok());
            caps.get(0)
        } else if let Some(caps) = NXNN_RE.captures(&stem) {
            info.season_number = caps.get(1).and_then(|m| m.as_str().parse().ok());
            info.episode_number = caps.get(2).and_then(|m| m.as_str().parse().ok());
            info.ending_episode_number = caps.get(3).and_then(|m| m.as_str().parse().ok());
            caps.get(0)
        } else if let Some(caps) = VERBOSE_RE.captures(&stem) {
            info.season_number = caps.get(1).and_then(|m| m.as_str().parse().ok());
            info.episode_number = caps.get(2).and_then(|m| m.as_str().parse().ok());
            caps.get(0)
        } else if let Some(caps) = DATE_RE.captures(&stem) {
            let parts: Vec<u32> = (1..=3)
                .filter_map(|i| caps.get(i).and_then(|m| m.as_str().parse().ok()))
                .collect();
            if let [year, month, day] = parts[..] {
                info.air_date = NaiveDate::from_ymd_opt(year as i32, month, day);
            }
            if info.air_date.is_some() { caps.get(0) } else { None }
        } else {
            None
        };

        // An ending episode equal to or before the start is not a range
        if let (Some(start), Some(end)) = (info.episode_number, info.ending_episode_number) {
            if end <= start {
                info.ending_episode_number = None;
            }
        }

        match marker {
            Some(m) => {
                let (name, year) = self.parse_name_and_year(&stem[..m.start()]);
                info.name = non_empty(name);
                info.year = year;
                info.episode_name = self.trailing_title(&stem[m.end()..]);
            }
            None => {
                let head = &stem[..self.quality_start(&stem)];
                let (name, year) = self.parse_name_and_year(head);
                info.name = non_empty(name);
                info.year = year;
            }
        }

        debug!(
            file_name = file_name,
            series = ?info.name,
            season = ?info.season_number,
            episode = ?info.episode_number,
            ending_episode = ?info.ending_episode_number,
            air_date = ?info.air_date,
            "Parsed episode filename"
        );

        info
    }

    /// Resolution, source quality and codecs read from the filename
    pub fn parse_quality(&self, file_name: &str) -> ExtractedInfo {
        let mut info = ExtractedInfo::default();

        if let Some(re) = &self.resolution_re {
            if let Some(m) = re.find(file_name) {
                info.resolution = ResolutionInfo {
                    name: m.as_str().to_lowercase(),
                    width: None,
                    height: None,
                };
            }
        }

        let sources: Vec<&str> = self
            .vocabulary
            .source_qualities
            .iter()
            .filter(|t| t.regex.is_match(file_name))
            .map(|t| t.label.as_str())
            .collect();
        if !sources.is_empty() {
            info.source_quality = Some(sources.join("-"));
        }

        info.video_codecs = matching_labels(&self.vocabulary.video_codecs, file_name);
        info.audio_codecs = matching_labels(&self.vocabulary.audio_codecs, file_name);

        info
    }

    /// Byte offset where release junk (resolution, source, codec) begins
    fn quality_start(&self, value: &str) -> usize {
        let resolution = self
            .resolution_re
            .iter()
            .filter_map(|re| re.find(value).map(|m| m.start()));
        let tables = self
            .vocabulary
            .source_qualities
            .iter()
            .chain(&self.vocabulary.video_codecs)
            .chain(&self.vocabulary.audio_codecs)
            .filter_map(|t| t.regex.find(value).map(|m| m.start()));

        resolution.chain(tables).min().unwrap_or(value.len())
    }

    /// Episode title written after the marker, if any
    fn trailing_title(&self, rest: &str) -> Option<String> {
        let rest = &rest[..self.quality_start(rest)];
        if RELEASE_GROUP_RE.is_match(rest.trim()) {
            return None;
        }
        non_empty(trim_separators(&spaced(rest)))
    }
}

/// Diagonal upper bounds for each resolution label.
///
/// The SD bands sit at the NTSC (720x480) and PAL (720x576) DVD frame
/// diagonals so anamorphic DVD sources land on 480p/576p, not 720p.
const RESOLUTION_BANDS: &[(f64, &str)] = &[
    (865.33, "480p"),
    (922.05, "576p"),
    (1468.6, "720p"),
    (2315.32, "1080p"),
    (2937.21, "1440p"),
    (4405.81, "2160p"),
    (8811.63, "4320p"),
];

/// Resolution label from frame dimensions, banded by the diagonal
pub fn resolution_from_dimensions(width: u32, height: u32) -> &'static str {
    if width == 0 || height == 0 {
        return "Unknown";
    }
    let (w, h) = (width as f64, height as f64);
    let diagonal = ((w * w + h * h).sqrt() * 100.0).round() / 100.0;

    RESOLUTION_BANDS
        .iter()
        .find(|(bound, _)| diagonal <= *bound)
        .map(|(_, label)| *label)
        .unwrap_or("Unknown")
}

fn file_stem(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn matching_labels(table: &[TokenPattern], value: &str) -> Vec<String> {
    table
        .iter()
        .filter(|t| t.regex.is_match(value))
        .map(|t| t.label.clone())
        .collect()
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}
