//! Periodic refresh of configured catalogs

use domain_pricing::{PriceListFetcher, PricingService, WarmTarget};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

/// Refresh every target once, logging failures
pub async fn refresh_targets<F: PriceListFetcher + 'static>(
    service: &PricingService<F>,
    targets: &[WarmTarget],
) -> usize {
    let mut refreshed = 0;
    for target in targets {
        match service
            .refresh(&target.service_code, Some(&target.region))
            .await
        {
            Ok(freshness) if freshness.stale => {
                warn!(
                    service_code = %target.service_code,
                    region = %target.region,
                    "Refresh failed, keeping stale catalog"
                );
            }
            Ok(_) => refreshed += 1,
            Err(e) => {
                error!(
                    service_code = %target.service_code,
                    region = %target.region,
                    error = %e,
                    "Catalog refresh failed"
                );
            }
        }
    }
    refreshed
}

/// Start a scheduler that refreshes `targets` on `cron_expr`.
///
/// The returned scheduler must be kept alive for the jobs to run.
pub async fn start<F: PriceListFetcher + 'static>(
    service: PricingService<F>,
    targets: Vec<WarmTarget>,
    cron_expr: &str,
) -> eyre::Result<JobScheduler> {
    info!(cron = cron_expr, targets = targets.len(), "Starting catalog refresh scheduler");

    let sched = JobScheduler::new().await?;

    let job = Job::new_async(cron_expr, move |_uuid, _l| {
        let service = service.clone();
        let targets = targets.clone();

        Box::pin(async move {
            info!("Running scheduled catalog refresh");
            let refreshed = refresh_targets(&service, &targets).await;
            info!(
                refreshed = refreshed,
                total = targets.len(),
                "Scheduled refresh complete"
            );
        })
    })?;

    sched.add(job).await?;
    sched.start().await?;

    Ok(sched)
}
