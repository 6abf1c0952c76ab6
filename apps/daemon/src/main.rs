mod config;
mod main_lib;
mod scheduler;

use config::Config;
use main_lib::{build_state, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config.log_format);
    let state = build_state(&config).await?;

    let scheduler = scheduler::start_nav_scheduler(
        state.portfolio_service.clone(),
        config.nav_initial_delay,
        config.nav_interval,
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    scheduler.abort();
    Ok(())
}
