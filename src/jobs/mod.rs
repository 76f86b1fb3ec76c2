//! Background job scheduling

pub mod scanner;

use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::services::OrganizationService;

/// Initialize and start the job scheduler
pub async fn start_scheduler(
    service: OrganizationService,
    schedule: &str,
    cancel: CancellationToken,
) -> anyhow::Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    // Watch location scan on the configured schedule
    let scan_job = Job::new_async(schedule, move |_uuid, _l| {
        let service = service.clone();
        let cancel = cancel.clone();
        Box::pin(async move {
            info!("Running watch location scan");
            if let Err(e) = scanner::run_scan(service, cancel).await {
                tracing::error!("Scan error: {}", e);
            }
        })
    })?;
    scheduler.add(scan_job).await?;

    scheduler.start().await?;

    info!(schedule = %schedule, "Job scheduler started");
    Ok(scheduler)
}
