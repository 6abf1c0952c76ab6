//! Background scheduler for periodic NAV updates.
//!
//! Each tick runs one update pass over every portfolio. A failing portfolio
//! is reported by the pass and retried on the next tick.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info, warn};

use stratfolio_core::portfolio::PortfolioServiceTrait;

/// Starts the NAV scheduler. The first pass runs after `initial_delay`.
/// A zero `period` is refused and the task ends immediately.
pub fn start_nav_scheduler(
    service: Arc<dyn PortfolioServiceTrait>,
    initial_delay: Duration,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if period.is_zero() {
            error!("NAV scheduler not started: interval must be greater than zero");
            return;
        }
        info!("NAV scheduler started ({}s interval)", period.as_secs());

        tokio::time::sleep(initial_delay).await;

        // First tick is immediate, later ticks are `period` apart
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            run_scheduled_update(service.as_ref()).await;
        }
    })
}

/// Runs a single update pass. Returns the number of failed portfolios.
pub async fn run_scheduled_update(service: &dyn PortfolioServiceTrait) -> usize {
    info!("Running scheduled NAV update...");

    match service.update_all_navs().await {
        Ok(report) => {
            for failure in &report.failed {
                if failure.retryable {
                    warn!(
                        "NAV update for {} will be retried next tick: {}",
                        failure.portfolio_id, failure.error
                    );
                }
            }
            info!(
                "Scheduled NAV update completed: {} updated, {} failed",
                report.updated.len(),
                report.failed.len()
            );
            report.failed.len()
        }
        Err(e) => {
            error!("Scheduled NAV update could not run: {}", e);
            0
        }
    }
}
