//! Catalog lookup
//!
//! The organizer only consumes a catalog: it asks for series and movies by
//! name and reads back the folders and files they own. [`FolderCatalog`]
//! derives one from the library folders on disk.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::debug;
use walkdir::WalkDir;

use crate::services::file_utils::has_extension;
use crate::services::filename_parser::NameParser;
use crate::services::text_utils::normalize_for_comparison;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Series,
    Movie,
}

/// How names are compared when querying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMatch {
    /// Normalized names are equal
    Exact,
    /// One normalized name contains the other
    Contains,
}

#[derive(Debug, Clone)]
pub struct CatalogFilter {
    pub kind: CatalogKind,
    pub name: Option<String>,
    pub name_match: NameMatch,
    pub year: Option<i32>,
}

impl CatalogFilter {
    pub fn named(kind: CatalogKind, name: &str, name_match: NameMatch) -> Self {
        Self {
            kind,
            name: Some(name.to_string()),
            name_match,
            year: None,
        }
    }
}

/// A media file the catalog already owns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFile {
    pub path: PathBuf,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub ending_episode: Option<u32>,
    pub resolution: Option<String>,
    pub edition: Option<String>,
}

impl CatalogFile {
    /// Whether this file covers the given episode
    pub fn covers_episode(&self, season: u32, episode: u32) -> bool {
        match (self.season, self.episode) {
            (Some(s), Some(start)) if s == season => {
                let end = self.ending_episode.unwrap_or(start);
                (start..=end).contains(&episode)
            }
            _ => false,
        }
    }
}

/// A series or movie in the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub id: i64,
    pub kind: CatalogKind,
    pub name: String,
    pub year: Option<i32>,
    /// Series folder or movie folder
    pub path: PathBuf,
    pub files: Vec<CatalogFile>,
}

#[async_trait]
pub trait Catalog: Send + Sync {
    /// Split a folder or file name into display name and year
    fn parse_name(&self, value: &str) -> (String, Option<i32>);

    async fn find_items(&self, filter: &CatalogFilter) -> Result<Vec<CatalogItem>>;

    /// The item whose folder contains `path`
    async fn find_folder_by_path(&self, path: &Path) -> Result<Option<CatalogItem>>;

    fn is_video_file(&self, path: &Path) -> bool;

    fn is_subtitle_file(&self, path: &Path) -> bool;
}

/// Stable positive id for a catalog folder
pub fn catalog_id(path: &Path) -> i64 {
    let digest = Sha256::digest(path.to_string_lossy().as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    ((u64::from_be_bytes(bytes) >> 1) as i64).max(1)
}

/// Whether `candidate` satisfies a name query
pub fn name_matches(query: &str, candidate: &str, name_match: NameMatch) -> bool {
    let query = normalize_for_comparison(query);
    let candidate = normalize_for_comparison(candidate);
    if query.is_empty() || candidate.is_empty() {
        return false;
    }
    match name_match {
        NameMatch::Exact => query == candidate,
        NameMatch::Contains => candidate.contains(&query) || query.contains(&candidate),
    }
}

/// Catalog read from library folders: one folder per series or movie
#[derive(Debug, Clone)]
pub struct FolderCatalog {
    parser: NameParser,
    series_roots: Vec<PathBuf>,
    movie_roots: Vec<PathBuf>,
    video_extensions: Vec<String>,
    subtitle_extensions: Vec<String>,
}

impl FolderCatalog {
    pub fn new(
        parser: NameParser,
        series_roots: Vec<PathBuf>,
        movie_roots: Vec<PathBuf>,
        video_extensions: Vec<String>,
        subtitle_extensions: Vec<String>,
    ) -> Self {
        Self {
            parser,
            series_roots,
            movie_roots,
            video_extensions,
            subtitle_extensions,
        }
    }

    fn roots(&self, kind: CatalogKind) -> &[PathBuf] {
        match kind {
            CatalogKind::Series => &self.series_roots,
            CatalogKind::Movie => &self.movie_roots,
        }
    }

    /// Walk every item folder of a kind (blocking)
    fn load_items(&self, kind: CatalogKind) -> Vec<CatalogItem> {
        let mut items = Vec::new();
        for root in self.roots(kind) {
            let Ok(entries) = std::fs::read_dir(root) else {
                debug!(root = %root.display(), "Catalog root not readable, skipping");
                continue;
            };
            for entry in entries.filter_map(|e| e.ok()) {
                let path = entry.path();
                if !path.is_dir() {
                    continue;
                }
                let folder_name = entry.file_name().to_string_lossy().to_string();
                let (name, year) = self.parser.parse_name_and_year(&folder_name);
                items.push(CatalogItem {
                    id: catalog_id(&path),
                    kind,
                    name,
                    year,
                    files: self.load_files(kind, &path),
                    path,
                });
            }
        }
        items
    }

    fn load_files(&self, kind: CatalogKind, folder: &Path) -> Vec<CatalogFile> {
        WalkDir::new(folder)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| has_extension(e.path(), &self.video_extensions))
            .map(|e| {
                let file_name = e.file_name().to_string_lossy().to_string();
                let info = match kind {
                    CatalogKind::Series => self.parser.parse_episode(&file_name),
                    CatalogKind::Movie => self.parser.parse_movie(&file_name),
                };
                let season = info.season_number.or_else(|| {
                    e.path()
                        .parent()
                        .and_then(|p| p.file_name())
                        .and_then(|n| season_from_folder(&n.to_string_lossy()))
                });
                CatalogFile {
                    path: e.path().to_path_buf(),
                    season,
                    episode: info.episode_number,
                    ending_episode: info.ending_episode_number,
                    resolution: Some(info.resolution.name).filter(|r| !r.is_empty()),
                    edition: info.edition,
                }
            })
            .collect()
    }
}

/// Season number from a "Season 3" / "S03" / "Specials" folder name
fn season_from_folder(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    if lower == "specials" {
        return Some(0);
    }
    let digits = lower
        .strip_prefix("season")
        .or_else(|| lower.strip_prefix('s'))?
        .trim();
    digits.parse().ok()
}

#[async_trait]
impl Catalog for FolderCatalog {
    fn parse_name(&self, value: &str) -> (String, Option<i32>) {
        self.parser.parse_name_and_year(value)
    }

    async fn find_items(&self, filter: &CatalogFilter) -> Result<Vec<CatalogItem>> {
        let catalog = self.clone();
        let kind = filter.kind;
        let items = tokio::task::spawn_blocking(move || catalog.load_items(kind))
            .await
            .context("Catalog walk panicked")?;

        Ok(items
            .into_iter()
            .filter(|item| match &filter.name {
                Some(name) => name_matches(name, &item.name, filter.name_match),
                None => true,
            })
            .filter(|item| match (filter.year, item.year) {
                (Some(wanted), Some(year)) => wanted == year,
                _ => true,
            })
            .collect())
    }

    async fn find_folder_by_path(&self, path: &Path) -> Result<Option<CatalogItem>> {
        for kind in [CatalogKind::Series, CatalogKind::Movie] {
            let filter = CatalogFilter {
                kind,
                name: None,
                name_match: NameMatch::Exact,
                year: None,
            };
            if let Some(item) = self
                .find_items(&filter)
                .await?
                .into_iter()
                .find(|item| path.starts_with(&item.path))
            {
                return Ok(Some(item));
            }
        }
        Ok(None)
    }

    fn is_video_file(&self, path: &Path) -> bool {
        has_extension(path, &self.video_extensions)
    }

    fn is_subtitle_file(&self, path: &Path) -> bool {
        has_extension(path, &self.subtitle_extensions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::file_utils::{SUBTITLE_EXTENSIONS, VIDEO_EXTENSIONS};

    fn catalog(tv: &Path, movies: &Path) -> FolderCatalog {
        FolderCatalog::new(
            NameParser::default(),
            vec![tv.to_path_buf()],
            vec![movies.to_path_buf()],
            VIDEO_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            SUBTITLE_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[tokio::test]
    async fn test_folder_catalog_reads_series_and_episodes() {
        let tv = tempfile::tempdir().unwrap();
        let movies = tempfile::tempdir().unwrap();
        let season = tv.path().join("The Office (2005)").join("Season 2");
        std::fs::create_dir_all(&season).unwrap();
        std::fs::write(season.join("The Office - 2x01 - The Dundies.mkv"), b"x").unwrap();
        std::fs::create_dir_all(tv.path().join("Office Space Chronicles")).unwrap();

        let catalog = catalog(tv.path(), movies.path());
        let exact = catalog
            .find_items(&CatalogFilter::named(CatalogKind::Series, "office", NameMatch::Exact))
            .await
            .unwrap();
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].name, "The Office");
        assert_eq!(exact[0].year, Some(2005));
        assert!(exact[0].files[0].covers_episode(2, 1));

        let contains = catalog
            .find_items(&CatalogFilter::named(
                CatalogKind::Series,
                "office",
                NameMatch::Contains,
            ))
            .await
            .unwrap();
        assert_eq!(contains.len(), 2);
    }

    #[tokio::test]
    async fn test_find_folder_by_path() {
        let tv = tempfile::tempdir().unwrap();
        let movies = tempfile::tempdir().unwrap();
        let folder = movies.path().join("Alien (1979)");
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(folder.join("Alien (1979) 1080p.mkv"), b"x").unwrap();

        let catalog = catalog(tv.path(), movies.path());
        let item = catalog
            .find_folder_by_path(&folder.join("Alien (1979) 1080p.mkv"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item.kind, CatalogKind::Movie);
        assert_eq!(item.files[0].resolution.as_deref(), Some("1080p"));
    }

    #[test]
    fn test_season_from_folder() {
        assert_eq!(season_from_folder("Season 03"), Some(3));
        assert_eq!(season_from_folder("S2"), Some(2));
        assert_eq!(season_from_folder("Specials"), Some(0));
        assert_eq!(season_from_folder("Extras"), None);
    }

    #[test]
    fn test_covers_episode_range() {
        let file = CatalogFile {
            season: Some(1),
            episode: Some(4),
            ending_episode: Some(6),
            ..Default::default()
        };
        assert!(file.covers_episode(1, 5));
        assert!(!file.covers_episode(1, 7));
        assert!(!file.covers_episode(2, 5));
    }
}
