//! Watch location scan job

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::services::OrganizationService;

/// Run one scan of every watch location
pub async fn run_scan(service: OrganizationService, cancel: CancellationToken) -> Result<()> {
    match service.run_scan(&cancel).await? {
        Some(summary) => info!(
            files_seen = summary.files_seen,
            processed = summary.processed,
            "Scheduled scan finished"
        ),
        None => info!("Previous scan still running, skipped this run"),
    }
    Ok(())
}
