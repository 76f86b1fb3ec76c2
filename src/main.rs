//! Librarian Organizer - watch-folder media organizer
//!
//! Scans the configured watch folders on a cron schedule and files new
//! episodes, movies and subtitles into the library.

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use librarian_organizer::app_mode::RunMode;
use librarian_organizer::cli::CliOptions;
use librarian_organizer::config::{Config, OrganizeOptions};
use librarian_organizer::db::Database;
use librarian_organizer::jobs;
use librarian_organizer::services::metadata::RemoteLookup;
use librarian_organizer::services::{
    CatalogMatcher, EventSink, FolderCatalog, InProgressRegistry, LocalFileSystem, NameParser,
    NoProbe, NoRemoteLookup, OrganizationEngine, OrganizationService, OrganizerContext,
    RemoteLookups, TvMazeClient,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    let cli = CliOptions::from_args();
    let run_mode = cli.run_mode_override.unwrap_or_else(RunMode::from_env);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "librarian_organizer=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!(run_mode = ?run_mode, "Starting Librarian Organizer");

    let options = Arc::new(OrganizeOptions::load(&config.options_path).await?);
    let db = Database::open(&config.store_path)
        .await
        .context("Failed to open result store")?;

    let parser = NameParser::new(options.parser_vocabulary());
    let catalog = Arc::new(FolderCatalog::new(
        parser.clone(),
        options.tv.library_path.iter().cloned().collect(),
        options.movie.library_path.iter().cloned().collect(),
        options.video_extensions.clone(),
        options.subtitle_extensions.clone(),
    ));

    let series_lookup: Box<dyn RemoteLookup> = if config.tvmaze_enabled {
        Box::new(TvMazeClient::with_base_url(&config.tvmaze_base_url))
    } else {
        Box::new(NoRemoteLookup)
    };
    let remote = Arc::new(RemoteLookups::new(series_lookup, Box::new(NoRemoteLookup)));
    tracing::info!(
        series_provider = %remote.for_kind(librarian_organizer::services::CatalogKind::Series).provider_name(),
        "Remote lookup configured"
    );

    let ctx = OrganizerContext {
        matcher: CatalogMatcher::new(db.clone(), catalog, remote),
        db,
        options: options.clone(),
        parser,
        fs: Arc::new(LocalFileSystem::new()),
        probe: Arc::new(NoProbe),
        events: EventSink::default(),
    };
    let engine = OrganizationEngine::new(ctx, InProgressRegistry::new());
    let service = OrganizationService::new(engine);
    let cancel = CancellationToken::new();

    if let Some(id) = cli.organize_id {
        let result = service.perform_organization(&id).await?;
        tracing::info!(
            file_id = %result.id,
            target = ?result.target_path,
            "File organized"
        );
        return Ok(());
    }

    match run_mode {
        RunMode::Once => {
            let summary = service.run_scan(&cancel).await?;
            tracing::info!(summary = ?summary, "Scan finished");
        }
        RunMode::Audit => {
            let corrections = service.find_file_corrections().await?;
            tracing::info!(corrections = corrections.len(), "Audit finished");
        }
        RunMode::Daemon => {
            let mut scheduler =
                jobs::start_scheduler(service.clone(), &options.scan_schedule, cancel.clone())
                    .await?;

            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for shutdown signal")?;
            tracing::info!("Shutdown requested, stopping scheduler");
            cancel.cancel();
            scheduler.shutdown().await?;
        }
    }

    Ok(())
}
