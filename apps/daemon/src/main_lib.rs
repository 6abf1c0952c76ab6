use std::sync::Arc;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use stratfolio_core::allocation::AllocationEngine;
use stratfolio_core::portfolio::{PortfolioService, PortfolioServiceTrait};
use stratfolio_market_data::{MockPriceSource, PriceSource, PriceSourceKind, YahooPriceSource};
use stratfolio_storage_sqlite::{
    db::{self, write_actor},
    NavHistoryRepository, PortfolioRepository, StrategyRepository,
};

use crate::config::Config;

pub struct AppState {
    pub portfolio_service: Arc<dyn PortfolioServiceTrait>,
}

/// Installs the global subscriber. `log` records from the library crates are
/// captured through tracing's log compatibility.
pub fn init_tracing(log_format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub fn build_price_source(config: &Config) -> anyhow::Result<Arc<dyn PriceSource>> {
    let source: Arc<dyn PriceSource> = match config.price_source {
        PriceSourceKind::Mock => {
            tracing::info!(
                "Using mock price source with {} seeded tickers",
                config.mock_prices.len()
            );
            Arc::new(MockPriceSource::with_prices(config.mock_prices.clone()))
        }
        PriceSourceKind::Live => {
            tracing::info!("Using live price source");
            Arc::new(YahooPriceSource::new(config.price_timeout)?)
        }
    };
    Ok(source)
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = write_actor::spawn_writer((*pool).clone());

    let strategy_repository = Arc::new(StrategyRepository::new(pool.clone()));
    let portfolio_repository = Arc::new(PortfolioRepository::new(pool.clone(), writer.clone()));
    let nav_repository = Arc::new(NavHistoryRepository::new(pool.clone(), writer));

    let engine = Arc::new(AllocationEngine::new(
        build_price_source(config)?,
        config.engine_settings(),
    ));

    let portfolio_service: Arc<dyn PortfolioServiceTrait> = Arc::new(PortfolioService::new(
        strategy_repository,
        portfolio_repository,
        nav_repository,
        engine,
    ));

    Ok(Arc::new(AppState { portfolio_service }))
}
