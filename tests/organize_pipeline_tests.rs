//! Integration tests for the organize pipeline
//!
//! These tests run the engine end to end against temporary watch and
//! library folders:
//! - Episode and movie placement
//! - Conflict handling (existing targets, new resolutions, new media)
//! - Ambiguous matches, smart matches and manual corrections
//! - Failure classification and in-progress exclusivity
//! - Scanner ordering, subtitles and cleanup

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use librarian_organizer::config::OrganizeOptions;
use librarian_organizer::db::{
    Database, OrganizationResult, OrganizationStatus, OrganizerType, ResultQuery, result_id,
};
use librarian_organizer::services::classifier::{classify, classify_path};
use librarian_organizer::services::filename_parser::resolution_from_dimensions;
use librarian_organizer::services::filesystem::{ChangePhase, FileMetadata};
use librarian_organizer::services::naming::{EpisodeNaming, render_episode_file};
use librarian_organizer::services::{
    CatalogMatcher, EpisodeCorrection, EventSink, FileSystem, FolderCatalog, InProgressRegistry,
    LocalFileSystem, MovieCorrection, NameParser, NoProbe, OrganizationEngine, OrganizationError,
    OrganizationEvent, OrganizationService, OrganizeRequest, OrganizerContext, RemoteLookups,
};

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    _root: TempDir,
    watch: PathBuf,
    tv: PathBuf,
    movies: PathBuf,
    service: OrganizationService,
}

impl Harness {
    fn new(configure: impl FnOnce(&mut OrganizeOptions)) -> Self {
        Self::with_fs(Arc::new(LocalFileSystem::new()), configure)
    }

    fn with_fs(fs: Arc<dyn FileSystem>, configure: impl FnOnce(&mut OrganizeOptions)) -> Self {
        let root = tempfile::tempdir().unwrap();
        let watch = root.path().join("watch");
        let tv = root.path().join("tv");
        let movies = root.path().join("movies");
        for dir in [&watch, &tv, &movies] {
            std::fs::create_dir_all(dir).unwrap();
        }

        let mut options = OrganizeOptions {
            watch_locations: vec![watch.clone()],
            min_file_size_mb: 0,
            ..Default::default()
        };
        options.tv.library_path = Some(tv.clone());
        options.movie.library_path = Some(movies.clone());
        configure(&mut options);

        let parser = NameParser::new(options.parser_vocabulary());
        let db = Database::in_memory();
        let catalog = Arc::new(FolderCatalog::new(
            parser.clone(),
            vec![tv.clone()],
            vec![movies.clone()],
            options.video_extensions.clone(),
            options.subtitle_extensions.clone(),
        ));
        let ctx = OrganizerContext {
            matcher: CatalogMatcher::new(db.clone(), catalog, Arc::new(RemoteLookups::none())),
            db,
            options: Arc::new(options),
            parser,
            fs,
            probe: Arc::new(NoProbe),
            events: EventSink::default(),
        };
        let engine = OrganizationEngine::new(ctx, InProgressRegistry::new());

        Self {
            _root: root,
            watch,
            tv,
            movies,
            service: OrganizationService::new(engine),
        }
    }

    fn engine(&self) -> &OrganizationEngine {
        self.service.engine()
    }

    fn db(&self) -> &Database {
        &self.engine().context().db
    }

    async fn organize(&self, path: &Path) -> OrganizationResult {
        let organizer_type =
            classify_path(path, &self.engine().context().options.subtitle_extensions);
        self.engine()
            .organize_file(path, organizer_type, &OrganizeRequest::default())
            .await
            .unwrap()
    }
}

fn add_file(dir: &Path, name: &str) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, b"video data").unwrap();
    path
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    /// Every copy and move fails with a full disk
    DiskFull,
    /// Every source reports an exclusive lock held elsewhere
    Locked,
}

/// Delegates to the local disk, injecting one kind of failure
struct FaultyFileSystem {
    inner: LocalFileSystem,
    fault: Fault,
}

impl FaultyFileSystem {
    fn new(fault: Fault) -> Arc<Self> {
        Arc::new(Self {
            inner: LocalFileSystem::new(),
            fault,
        })
    }

    fn transfer_error(&self) -> Option<io::Error> {
        (self.fault == Fault::DiskFull)
            .then(|| io::Error::other("There is not enough disk space on the disk"))
    }
}

#[async_trait]
impl FileSystem for FaultyFileSystem {
    async fn metadata(&self, path: &Path) -> io::Result<FileMetadata> {
        self.inner.metadata(path).await
    }

    async fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path).await
    }

    async fn is_locked(&self, path: &Path) -> bool {
        self.fault == Fault::Locked || self.inner.is_locked(path).await
    }

    async fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        match self.transfer_error() {
            Some(e) => Err(e),
            None => self.inner.copy(from, to).await,
        }
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        match self.transfer_error() {
            Some(e) => Err(e),
            None => self.inner.rename(from, to).await,
        }
    }

    async fn delete_file(&self, path: &Path) -> io::Result<()> {
        self.inner.delete_file(path).await
    }

    async fn delete_dir(&self, path: &Path) -> io::Result<()> {
        self.inner.delete_dir(path).await
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.inner.create_dir_all(path).await
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        self.inner.read_dir(path).await
    }

    async fn walk_files(&self, root: &Path) -> io::Result<Vec<PathBuf>> {
        self.inner.walk_files(root).await
    }

    fn begin_change(&self, path: &Path) {
        self.inner.begin_change(path)
    }

    fn complete_change(&self, path: &Path) {
        self.inner.complete_change(path)
    }
}

// ============================================================================
// Properties
// ============================================================================

mod properties {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_template_property() {
        let naming = EpisodeNaming {
            series_name: "Example Show",
            season: 1,
            episode: 4,
            episode_name: Some("Pilot"),
            extension: "mkv",
            ..Default::default()
        };
        assert_eq!(
            render_episode_file("%sn - %0sx%0e - %en.%ext", "", &naming).unwrap(),
            "Example Show - 01x04 - Pilot.mkv"
        );
    }

    #[test]
    fn test_resolution_banding() {
        assert_eq!(resolution_from_dimensions(1920, 1080), "1080p");
        assert_eq!(resolution_from_dimensions(720, 480), "480p");
        assert_eq!(resolution_from_dimensions(720, 576), "576p");
        assert_eq!(resolution_from_dimensions(1024, 576), "720p");
        assert_eq!(resolution_from_dimensions(3840, 2160), "2160p");
    }

    #[test]
    fn test_classifier() {
        assert_eq!(classify("Show.Name.S01E02.mkv"), OrganizerType::Episode);
        assert_eq!(classify("Movie.Name.2020.1080p.mkv"), OrganizerType::Movie);
        assert_eq!(classify("Show.2020.S01E02.mkv"), OrganizerType::Episode);
    }
}

// ============================================================================
// Episodes
// ============================================================================

mod episodes {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_episode_moves_into_existing_series() {
        let h = Harness::new(|_| {});
        let series = h.tv.join("Example Show (2019)");
        std::fs::create_dir_all(&series).unwrap();
        let source = add_file(&h.watch, "Example.Show.S01E04.Pilot.720p.mkv");

        let result = h.organize(&source).await;

        let expected = series.join("Season 1").join("Example Show - 1x04 - Pilot.mkv");
        assert_eq!(result.status, OrganizationStatus::Success);
        assert_eq!(result.target_path.as_deref(), Some(expected.as_path()));
        assert_eq!(result.extracted.name.as_deref(), Some("Example Show"));
        assert_eq!(result.extracted.resolution.name, "720p");
        assert_ne!(result.existing_catalog_id, 0);
        assert!(expected.exists());
        assert!(!source.exists());
    }

    #[tokio::test]
    async fn test_existing_target_is_skipped_and_source_untouched() {
        let h = Harness::new(|_| {});
        let season = h.tv.join("Example Show (2019)").join("Season 1");
        let existing = add_file(&season, "Example Show - 1x04 - Pilot.mkv");
        let source = add_file(&h.watch, "Example.Show.S01E04.Pilot.720p.mkv");

        let result = h.organize(&source).await;

        assert_eq!(result.status, OrganizationStatus::SkippedExisting);
        assert_eq!(result.duplicate_paths, vec![existing.clone()]);
        assert_ne!(result.existing_catalog_id, 0);
        assert!(source.exists());
        assert!(existing.exists());
    }

    #[tokio::test]
    async fn test_unchanged_file_is_not_saved_again() {
        let h = Harness::new(|_| {});
        let season = h.tv.join("Example Show (2019)").join("Season 1");
        add_file(&season, "Example Show - 1x04 - Pilot.mkv");
        let source = add_file(&h.watch, "Example.Show.S01E04.Pilot.720p.mkv");

        let first = h.organize(&source).await;
        let mut events = h.service.subscribe();
        let second = h.organize(&source).await;

        assert_eq!(second.status, OrganizationStatus::SkippedExisting);
        assert_eq!(second.date, first.date);
        assert!(second.is_unchanged_from(&first));
        let stored = h.db().results().get(&first.id).unwrap();
        assert_eq!(stored.date, first.date);

        // Only the transient checking notice goes out
        while let Ok(event) = events.try_recv() {
            assert_matches!(
                event,
                OrganizationEvent::ItemUpdated(r) if r.status == OrganizationStatus::Checking
            );
        }
    }

    #[tokio::test]
    async fn test_ambiguous_series_waits_without_moving() {
        let h = Harness::new(|_| {});
        let first = h.tv.join("The Office (2001)");
        let second = h.tv.join("The Office (2005)");
        std::fs::create_dir_all(&first).unwrap();
        std::fs::create_dir_all(&second).unwrap();
        let source = add_file(&h.watch, "The.Office.S01E01.mkv");

        let result = h.organize(&source).await;

        assert_eq!(result.status, OrganizationStatus::Waiting);
        assert!(result.status_message.contains("Multiple series"));
        assert!(source.exists());
        assert_eq!(std::fs::read_dir(&first).unwrap().count(), 0);
        assert_eq!(std::fs::read_dir(&second).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_disk_full_is_classified_and_releases_item() {
        let h = Harness::with_fs(FaultyFileSystem::new(Fault::DiskFull), |_| {});
        std::fs::create_dir_all(h.tv.join("Example Show (2019)")).unwrap();
        let source = add_file(&h.watch, "Example.Show.S01E04.Pilot.720p.mkv");

        let result = h.organize(&source).await;

        assert_eq!(result.status, OrganizationStatus::NotEnoughDiskSpace);
        assert!(result.status_message.contains("disk space"));
        assert!(h.engine().registry().is_empty());
        assert!(source.exists());
        let stored = h.db().results().get(&result.id).unwrap();
        assert_eq!(stored.status, OrganizationStatus::NotEnoughDiskSpace);
    }

    #[tokio::test]
    async fn test_locked_source_is_in_use_and_releases_item() {
        let h = Harness::with_fs(FaultyFileSystem::new(Fault::Locked), |_| {});
        let series = h.tv.join("Example Show (2019)");
        std::fs::create_dir_all(&series).unwrap();
        let source = add_file(&h.watch, "Example.Show.S01E04.Pilot.720p.mkv");

        let result = h.organize(&source).await;

        assert_eq!(result.status, OrganizationStatus::InUse);
        assert!(h.engine().registry().is_empty());
        assert!(source.exists());
        assert!(!series.join("Season 1").exists());
    }

    #[tokio::test]
    async fn test_overwrite_removes_other_copies_of_the_episode() {
        let h = Harness::new(|o| {
            o.tv.overwrite_existing = true;
            o.tv.delete_duplicates = false;
        });
        let season = h.tv.join("Example Show (2019)").join("Season 1");
        let older = add_file(&season, "Example Show - 1x04 - Old Title.avi");
        let source = add_file(&h.watch, "Example.Show.S01E04.Pilot.720p.mkv");

        let result = h.organize(&source).await;

        let expected = season.join("Example Show - 1x04 - Pilot.mkv");
        assert_eq!(result.status, OrganizationStatus::Success);
        assert!(expected.exists());
        assert!(!older.exists());
        assert!(!source.exists());
    }

    #[tokio::test]
    async fn test_template_rendering_empty_name_fails() {
        let h = Harness::new(|o| o.tv.episode_name_pattern = "???".to_string());
        std::fs::create_dir_all(h.tv.join("Example Show (2019)")).unwrap();
        let source = add_file(&h.watch, "Example.Show.S01E04.Pilot.720p.mkv");

        let result = h.organize(&source).await;

        assert_eq!(result.status, OrganizationStatus::Failure);
        assert!(result.status_message.contains("empty or invalid name"));
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_unnumbered_daily_episode_needs_user_input() {
        let h = Harness::new(|_| {});
        std::fs::create_dir_all(h.tv.join("The Daily Show")).unwrap();
        let source = add_file(&h.watch, "The.Daily.Show.2026.01.07.720p.mkv");

        let result = h
            .engine()
            .organize_file(&source, OrganizerType::Episode, &OrganizeRequest::default())
            .await
            .unwrap();

        assert_eq!(result.status, OrganizationStatus::UserInputRequired);
        assert!(result.status_message.contains("2026-01-07"));
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_item_in_progress_is_rejected() {
        let h = Harness::new(|_| {});
        let source = add_file(&h.watch, "Example.Show.S01E04.mkv");
        let _guard = h.engine().registry().try_acquire(&result_id(&source)).unwrap();

        let outcome = h
            .engine()
            .organize_file(&source, OrganizerType::Episode, &OrganizeRequest::default())
            .await;

        assert_matches!(outcome, Err(OrganizationError::InProgress { .. }));
        assert!(h.db().results().get_by_path(&source).is_none());
    }

    #[tokio::test]
    async fn test_correction_remembers_smart_match() {
        let h = Harness::new(|o| o.tv.match_existing_only = true);
        let series = h.tv.join("Example Show (2019)");
        std::fs::create_dir_all(&series).unwrap();
        let source = add_file(&h.watch, "Ex.Sh.S02E03.mkv");

        let held = h.organize(&source).await;
        assert_eq!(held.status, OrganizationStatus::NewMedia);

        let corrected = h
            .service
            .perform_episode_organization(
                &held.id,
                EpisodeCorrection {
                    series_name: "Example Show".to_string(),
                    series_year: Some(2019),
                    season: 2,
                    episode: 3,
                    remember_match: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let expected = series
            .join("Season 2")
            .join("Example Show - 2x03 - Episode 3.mkv");
        assert_eq!(corrected.target_path.as_deref(), Some(expected.as_path()));
        assert!(expected.exists());

        let matches = h.service.get_smart_matches(Some(OrganizerType::Episode));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].canonical_name, "Example Show");
        assert_eq!(matches[0].match_strings, vec!["Ex Sh".to_string()]);

        // The next file with the same fragment resolves on its own
        let next = add_file(&h.watch, "Ex.Sh.S02E04.mkv");
        let result = h.organize(&next).await;
        assert_eq!(result.status, OrganizationStatus::Success);
        assert!(series
            .join("Season 2")
            .join("Example Show - 2x04 - Episode 4.mkv")
            .exists());
    }
}

// ============================================================================
// Movies
// ============================================================================

mod movies {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_new_resolution_holds_until_confirmed() {
        let h = Harness::new(|_| {});
        let folder = h.movies.join("Alien (1979)");
        let existing = add_file(&folder, "Alien (1979) 1080p.mkv");
        let source = add_file(&h.watch, "Alien.1979.2160p.mkv");

        let held = h.organize(&source).await;
        assert_eq!(held.status, OrganizationStatus::NewResolution);
        assert!(source.exists());

        let result = h.service.perform_organization(&held.id).await.unwrap();
        assert_eq!(result.status, OrganizationStatus::Success);
        assert!(folder.join("Alien.1979.2160p.mkv").exists());
        assert!(existing.exists());
        assert!(!source.exists());
    }

    #[tokio::test]
    async fn test_overwrite_keyword_replaces_existing_movie_file() {
        let h = Harness::new(|_| {});
        let folder = h.movies.join("Alien (1979)");
        let existing = add_file(&folder, "Alien (1979) 1080p.mkv");
        let source = add_file(&h.watch, "Alien.1979.PROPER.1080p.mkv");

        let result = h.organize(&source).await;

        assert_eq!(result.status, OrganizationStatus::Success);
        assert!(folder.join("Alien.1979.PROPER.1080p.mkv").exists());
        assert!(!existing.exists());
        assert!(!source.exists());
    }

    #[tokio::test]
    async fn test_new_movie_without_auto_detect_needs_correction() {
        let h = Harness::new(|o| o.movie.auto_detect = false);
        let source = add_file(&h.watch, "Heat.1995.1080p.mkv");

        let held = h.organize(&source).await;
        assert_eq!(held.status, OrganizationStatus::NewMedia);

        let result = h
            .service
            .perform_movie_organization(
                &held.id,
                MovieCorrection {
                    name: "Heat (1995)".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let expected = h.movies.join("Heat (1995)").join("Heat.1995.1080p.mkv");
        assert_eq!(result.target_path.as_deref(), Some(expected.as_path()));
        assert!(expected.exists());
    }

    #[tokio::test]
    async fn test_manual_request_surfaces_failure_status() {
        let h = Harness::new(|_| {});
        let folder = h.movies.join("Alien (1979)");
        add_file(&folder, "Alien.1979.2160p.mkv");
        let source = add_file(&h.watch, "Alien.1979.2160p.mkv");

        let held = h.organize(&source).await;
        assert_eq!(held.status, OrganizationStatus::SkippedExisting);

        let outcome = h.service.perform_organization(&held.id).await;
        assert_matches!(
            outcome,
            Err(OrganizationError::Failed { status: OrganizationStatus::SkippedExisting, .. })
        );
    }
}

// ============================================================================
// Scanner
// ============================================================================

mod scanner {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_scan_organizes_media_then_subtitles_and_cleans_up() {
        let h = Harness::new(|_| {});
        let series = h.tv.join("Example Show (2019)");
        std::fs::create_dir_all(&series).unwrap();
        let release = h.watch.join("Example.Show.S01E04.720p");
        add_file(&release, "Example.Show.S01E04.Pilot.720p.mkv");
        add_file(&release, "Example.Show.S01E04.Pilot.720p.en.srt");
        let nfo = add_file(&release, "info.nfo");
        let sample = add_file(&h.watch, "Example.Show.S01E05.sample.mkv");

        let summary = h
            .service
            .run_scan(&CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(summary.files_seen, 2);
        assert_eq!(summary.count(OrganizationStatus::Success), 2);
        let season = series.join("Season 1");
        assert!(season.join("Example Show - 1x04 - Pilot.mkv").exists());
        assert!(season.join("Example Show - 1x04 - Pilot.en.srt").exists());

        assert!(!nfo.exists());
        assert!(!release.exists());
        assert!(h.watch.exists());
        assert!(sample.exists());
    }

    #[tokio::test]
    async fn test_cancelled_scan_processes_nothing() {
        let h = Harness::new(|_| {});
        let source = add_file(&h.watch, "Heat.1995.1080p.mkv");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = h.service.run_scan(&cancel).await.unwrap().unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.processed, 0);
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_disabled_type_is_skipped() {
        let h = Harness::new(|o| o.movie.enabled = false);
        let source = add_file(&h.watch, "Heat.1995.1080p.mkv");

        let summary = h
            .service
            .run_scan(&CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(summary.skipped_disabled, 1);
        assert!(source.exists());
        assert!(h.db().results().get_by_path(&source).is_none());
    }

    #[tokio::test]
    async fn test_results_for_missing_sources_are_pruned() {
        let h = Harness::new(|o| o.movie.auto_detect = false);
        let source = add_file(&h.watch, "Heat.1995.1080p.mkv");
        let held = h.organize(&source).await;
        assert_eq!(held.status, OrganizationStatus::NewMedia);

        std::fs::remove_file(&source).unwrap();
        let summary = h
            .service
            .run_scan(&CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(summary.pruned, 1);
        let page = h.service.get_results(&ResultQuery::default());
        assert_eq!(page.total_record_count, 0);
    }
}

// ============================================================================
// Service
// ============================================================================

mod service {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_clear_and_delete_emit_events() {
        let h = Harness::new(|o| o.movie.auto_detect = false);
        let source = add_file(&h.watch, "Heat.1995.1080p.mkv");
        let held = h.organize(&source).await;

        let mut events = h.service.subscribe();
        h.service.delete_result(&held.id).await.unwrap();
        assert_matches!(events.recv().await, Ok(OrganizationEvent::ItemRemoved(id)) if id == held.id);
        assert_matches!(
            h.service.delete_result(&held.id).await,
            Err(OrganizationError::NotFound(_))
        );

        h.organize(&source).await;
        h.service.clear_log().await.unwrap();
        let mut saw_reset = false;
        while let Ok(event) = events.try_recv() {
            saw_reset |= matches!(event, OrganizationEvent::LogReset);
        }
        assert!(saw_reset);
        assert_eq!(h.service.get_results(&ResultQuery::default()).total_record_count, 0);
    }

    #[tokio::test]
    async fn test_delete_original_file() {
        let h = Harness::new(|o| o.movie.auto_detect = false);
        let source = add_file(&h.watch, "Heat.1995.1080p.mkv");
        let held = h.organize(&source).await;

        h.service.delete_original_file(&held.id).await.unwrap();

        assert!(!source.exists());
        assert_matches!(h.service.get_result(&held.id), Err(OrganizationError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_audit_finds_and_applies_corrections() {
        let h = Harness::new(|_| {});
        let season = h.tv.join("Example Show (2019)").join("Season 1");
        let misnamed = add_file(&season, "example.show.s01e02.mkv");
        add_file(&season, "Example Show - 1x01 - Pilot.mkv");

        let corrections = h.service.find_file_corrections().await.unwrap();
        assert_eq!(corrections.len(), 1);
        let expected = season.join("Example Show - 1x02 - Episode 2.mkv");
        assert_eq!(corrections[0].current_path, misnamed);
        assert_eq!(corrections[0].corrected_path, expected);

        let applied = h
            .service
            .apply_file_corrections(&[corrections[0].id])
            .await
            .unwrap();
        assert_eq!(applied, 1);
        assert!(expected.exists());
        assert!(!misnamed.exists());
        assert_eq!(h.service.get_file_corrections(0, None).total_record_count, 0);
    }

    #[tokio::test]
    async fn test_applying_correction_announces_folder_change() {
        let fs = Arc::new(LocalFileSystem::new());
        let mut changes = fs.subscribe();
        let h = Harness::with_fs(fs, |_| {});
        let season = h.tv.join("Example Show (2019)").join("Season 1");
        add_file(&season, "example.show.s01e02.mkv");

        let corrections = h.service.find_file_corrections().await.unwrap();
        h.service
            .apply_file_corrections(&[corrections[0].id])
            .await
            .unwrap();

        let begin = changes.try_recv().unwrap();
        let complete = changes.try_recv().unwrap();
        assert_eq!(begin.phase, ChangePhase::Begin);
        assert_eq!(complete.phase, ChangePhase::Complete);
        assert_eq!(begin.path, season);
        assert_eq!(complete.path, season);
    }
}
