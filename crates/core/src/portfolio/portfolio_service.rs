//! Portfolio lifecycle: preview, commit, rebalance, NAV tracking.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use dashmap::DashMap;
use futures::future::join_all;
use log::{debug, error, info, warn};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::nav_model::{NavEntryKind, NavHistory, NavUpdateFailure, NavUpdateReport, PerformanceMetrics};
use super::performance::{calculate_performance, drawdown, high_water_mark};
use super::portfolio_model::{
    CommitRequest, PersistedSnapshot, Portfolio, PortfolioSnapshot, Position, PreviewRequest,
};
use super::portfolio_traits::{
    NavHistoryRepositoryTrait, PortfolioRepositoryTrait, PortfolioServiceTrait,
};
use crate::allocation::{AllocationConstraints, AllocationEngine, AllocationResult};
use crate::constants::DECIMAL_PRECISION;
use crate::errors::{ConstraintViolationError, Error, Result, ValidationError};
use crate::strategies::{Strategy, StrategyRepositoryTrait};

/// Orchestrates the allocation engine and persistence.
///
/// Writes to an existing portfolio (rebalance, NAV update, delete) are
/// serialized by a per-portfolio lock. Previews and commits never lock.
pub struct PortfolioService {
    strategy_repository: Arc<dyn StrategyRepositoryTrait>,
    portfolio_repository: Arc<dyn PortfolioRepositoryTrait>,
    nav_repository: Arc<dyn NavHistoryRepositoryTrait>,
    engine: Arc<AllocationEngine>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl PortfolioService {
    pub fn new(
        strategy_repository: Arc<dyn StrategyRepositoryTrait>,
        portfolio_repository: Arc<dyn PortfolioRepositoryTrait>,
        nav_repository: Arc<dyn NavHistoryRepositoryTrait>,
        engine: Arc<AllocationEngine>,
    ) -> Self {
        Self {
            strategy_repository,
            portfolio_repository,
            nav_repository,
            engine,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, portfolio_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(portfolio_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn resolve_constraints(&self, requested: Option<AllocationConstraints>) -> AllocationConstraints {
        requested.unwrap_or(self.engine.settings().default_constraints)
    }

    fn require_strategy_ids(strategy_ids: &[String]) -> Result<()> {
        if strategy_ids.is_empty() {
            return Err(ValidationError::MissingField("strategyIds".to_string()).into());
        }
        Ok(())
    }

    /// Loads the requested strategies, failing on any unknown id.
    fn load_strategies(&self, strategy_ids: &[String]) -> Result<Vec<Strategy>> {
        let strategies = self.strategy_repository.get_strategies_by_ids(strategy_ids)?;
        let found: HashSet<&str> = strategies.iter().map(|s| s.id.as_str()).collect();
        if let Some(missing) = strategy_ids.iter().find(|id| !found.contains(id.as_str())) {
            return Err(Error::NotFound(format!("Strategy {} not found", missing)));
        }
        Ok(strategies)
    }

    /// Loads the requested strategies from the user's own set.
    fn load_owned_strategies(&self, user_id: &str, strategy_ids: &[String]) -> Result<Vec<Strategy>> {
        let requested: HashSet<&str> = strategy_ids.iter().map(String::as_str).collect();
        let owned: Vec<Strategy> = self
            .strategy_repository
            .get_strategies_for_user(user_id)?
            .into_iter()
            .filter(|s| requested.contains(s.id.as_str()))
            .collect();

        let owned_ids: HashSet<&str> = owned.iter().map(|s| s.id.as_str()).collect();
        if let Some(foreign) = strategy_ids.iter().find(|id| !owned_ids.contains(id.as_str())) {
            return Err(ValidationError::field(
                "strategyIds",
                format!("Strategy {} does not belong to user {}", foreign, user_id),
            )
            .into());
        }
        Ok(owned)
    }

    fn ensure_committable(result: &AllocationResult, allow_violations: bool) -> Result<()> {
        if result.validation.is_valid || allow_violations {
            return Ok(());
        }
        Err(ConstraintViolationError {
            violations: result.validation.blocking(),
        }
        .into())
    }

    fn positions_for(portfolio_id: &str, result: &AllocationResult) -> Vec<Position> {
        result
            .allocations
            .iter()
            .map(|a| Position::from_allocation(portfolio_id, a))
            .collect()
    }

    /// Current time at the microsecond resolution NAV history is stored with.
    fn now() -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }

    /// Strictly after the last stored entry, so the history key stays unique.
    fn next_timestamp(history: &[NavHistory]) -> DateTime<Utc> {
        let now = Self::now();
        match history.last() {
            Some(last) if now <= last.timestamp => last.timestamp + Duration::microseconds(1),
            _ => now,
        }
    }

    async fn rebalance_allocation(
        &self,
        portfolio: &Portfolio,
        new_total_investment: Decimal,
    ) -> Result<AllocationResult> {
        let strategies = self
            .strategy_repository
            .get_strategies_by_ids(&portfolio.strategy_ids)?;
        if strategies.len() != portfolio.strategy_ids.len() {
            warn!(
                "Portfolio {} references {} strategies but only {} still exist",
                portfolio.id,
                portfolio.strategy_ids.len(),
                strategies.len()
            );
        }
        let excluded: HashSet<String> = portfolio.excluded_stock_ids.iter().cloned().collect();

        self.engine
            .calculate_allocations(
                &strategies,
                new_total_investment,
                &portfolio.constraints,
                &excluded,
            )
            .await
    }

    async fn update_nav_locked(&self, portfolio_id: &str) -> Result<NavHistory> {
        let portfolio = self.portfolio_repository.get_portfolio(portfolio_id)?;
        let positions = self.portfolio_repository.get_positions(portfolio_id)?;
        let tickers: Vec<String> = positions.iter().map(|p| p.ticker.clone()).collect();
        let prices = self.engine.fetch_prices(&tickers).await?;

        let mut nav = Decimal::ZERO;
        for position in &positions {
            let price = match prices.get(&position.ticker) {
                Some(price) => *price,
                None => {
                    warn!(
                        "No price for {} in portfolio {}; valuing at entry price {}",
                        position.ticker, portfolio_id, position.entry_price
                    );
                    position.entry_price
                }
            };
            nav += position.market_value(price);
        }

        let history = self.nav_repository.get_nav_history(portfolio_id, None, None)?;
        let hwm = high_water_mark(&history, nav);
        let entry = NavHistory {
            portfolio_id: portfolio_id.to_string(),
            timestamp: Self::next_timestamp(&history),
            nav: nav.round_dp(DECIMAL_PRECISION),
            pnl: (nav - portfolio.total_investment).round_dp(DECIMAL_PRECISION),
            drawdown: drawdown(nav, hwm).round_dp(DECIMAL_PRECISION),
            kind: NavEntryKind::Update,
        };

        self.nav_repository.append_nav_history(entry.clone()).await?;
        debug!(
            "NAV for portfolio {} is {} (pnl {}, drawdown {}%)",
            portfolio_id, entry.nav, entry.pnl, entry.drawdown
        );
        Ok(entry)
    }
}

#[async_trait]
impl PortfolioServiceTrait for PortfolioService {
    async fn preview(&self, request: PreviewRequest) -> Result<AllocationResult> {
        Self::require_strategy_ids(&request.strategy_ids)?;
        let strategies = self.load_strategies(&request.strategy_ids)?;
        let constraints = self.resolve_constraints(request.constraints);
        let excluded: HashSet<String> = request.excluded_stock_ids.into_iter().collect();

        self.engine
            .calculate_allocations(&strategies, request.total_investment, &constraints, &excluded)
            .await
    }

    async fn commit(&self, request: CommitRequest) -> Result<PersistedSnapshot> {
        let CommitRequest {
            user_id,
            name,
            description,
            allocation,
            allow_violations,
        } = request;

        if name.trim().is_empty() {
            return Err(ValidationError::MissingField("name".to_string()).into());
        }
        Self::require_strategy_ids(&allocation.strategy_ids)?;

        let strategies = self.load_owned_strategies(&user_id, &allocation.strategy_ids)?;
        let constraints = self.resolve_constraints(allocation.constraints);
        let excluded: HashSet<String> = allocation.excluded_stock_ids.iter().cloned().collect();

        let result = self
            .engine
            .calculate_allocations(&strategies, allocation.total_investment, &constraints, &excluded)
            .await?;
        Self::ensure_committable(&result, allow_violations)?;

        let portfolio_id = Uuid::new_v4().to_string();
        let now = Self::now();
        let portfolio = Portfolio {
            id: portfolio_id.clone(),
            user_id,
            name,
            description,
            total_investment: allocation.total_investment,
            strategy_ids: allocation.strategy_ids,
            constraints,
            excluded_stock_ids: allocation.excluded_stock_ids,
            created_at: now,
            updated_at: now,
        };
        let positions = Self::positions_for(&portfolio_id, &result);
        let nav_entry = NavHistory {
            portfolio_id: portfolio_id.clone(),
            timestamp: now,
            nav: portfolio.total_investment,
            pnl: Decimal::ZERO,
            drawdown: Decimal::ZERO,
            kind: NavEntryKind::Initial,
        };

        self.portfolio_repository
            .save_snapshot(PortfolioSnapshot {
                portfolio: portfolio.clone(),
                positions: positions.clone(),
                nav_entry: nav_entry.clone(),
            })
            .await?;

        info!(
            "Committed portfolio {} with {} positions ({} invested, {} unallocated)",
            portfolio_id,
            positions.len(),
            result.total_allocated,
            result.unallocated_cash
        );

        Ok(PersistedSnapshot {
            portfolio,
            positions,
            nav_entry,
            allocation: result,
        })
    }

    async fn rebalance_preview(
        &self,
        portfolio_id: &str,
        new_total_investment: Decimal,
    ) -> Result<AllocationResult> {
        let portfolio = self.portfolio_repository.get_portfolio(portfolio_id)?;
        self.rebalance_allocation(&portfolio, new_total_investment)
            .await
    }

    async fn rebalance_commit(
        &self,
        portfolio_id: &str,
        new_total_investment: Decimal,
        allow_violations: bool,
    ) -> Result<PersistedSnapshot> {
        let lock = self.lock_for(portfolio_id);
        let _guard = lock.lock().await;

        let mut portfolio = self.portfolio_repository.get_portfolio(portfolio_id)?;
        let result = self
            .rebalance_allocation(&portfolio, new_total_investment)
            .await?;
        Self::ensure_committable(&result, allow_violations)?;

        let history = self.nav_repository.get_nav_history(portfolio_id, None, None)?;
        let hwm = high_water_mark(&history, new_total_investment);
        let nav_entry = NavHistory {
            portfolio_id: portfolio_id.to_string(),
            timestamp: Self::next_timestamp(&history),
            nav: new_total_investment,
            pnl: Decimal::ZERO,
            drawdown: drawdown(new_total_investment, hwm).round_dp(DECIMAL_PRECISION),
            kind: NavEntryKind::Rebalance,
        };

        portfolio.total_investment = new_total_investment;
        portfolio.updated_at = nav_entry.timestamp;
        let positions = Self::positions_for(portfolio_id, &result);

        self.portfolio_repository
            .save_snapshot(PortfolioSnapshot {
                portfolio: portfolio.clone(),
                positions: positions.clone(),
                nav_entry: nav_entry.clone(),
            })
            .await?;

        info!(
            "Rebalanced portfolio {} to {} across {} positions",
            portfolio_id,
            new_total_investment,
            positions.len()
        );

        Ok(PersistedSnapshot {
            portfolio,
            positions,
            nav_entry,
            allocation: result,
        })
    }

    async fn update_nav(&self, portfolio_id: &str) -> Result<NavHistory> {
        let lock = self.lock_for(portfolio_id);
        let _guard = lock.lock().await;
        self.update_nav_locked(portfolio_id).await
    }

    async fn update_all_navs(&self) -> Result<NavUpdateReport> {
        let portfolios = self.portfolio_repository.list_portfolios()?;
        let outcomes = join_all(portfolios.iter().map(|p| async move {
            (p.id.clone(), self.update_nav(&p.id).await)
        }))
        .await;

        let mut report = NavUpdateReport::default();
        for (portfolio_id, outcome) in outcomes {
            match outcome {
                Ok(entry) => report.updated.push(entry),
                Err(e) => {
                    error!("NAV update failed for portfolio {}: {}", portfolio_id, e);
                    report.failed.push(NavUpdateFailure {
                        portfolio_id,
                        retryable: e.is_retryable(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            "NAV update pass: {} updated, {} failed",
            report.updated.len(),
            report.failed.len()
        );
        Ok(report)
    }

    fn get_performance(&self, portfolio_id: &str) -> Result<PerformanceMetrics> {
        self.portfolio_repository.get_portfolio(portfolio_id)?;
        let history = self.nav_repository.get_nav_history(portfolio_id, None, None)?;
        Ok(calculate_performance(&history))
    }

    fn get_nav_history(
        &self,
        portfolio_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<NavHistory>> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(ValidationError::field("from", "must not be after 'to'").into());
            }
        }
        self.nav_repository.get_nav_history(portfolio_id, from, to)
    }

    async fn delete_portfolio(&self, portfolio_id: &str) -> Result<()> {
        let lock = self.lock_for(portfolio_id);
        let removed = {
            let _guard = lock.lock().await;
            self.portfolio_repository.delete_portfolio(portfolio_id).await?
        };
        self.locks.remove(portfolio_id);

        if removed == 0 {
            return Err(Error::NotFound(format!("Portfolio {} not found", portfolio_id)));
        }
        info!("Deleted portfolio {}", portfolio_id);
        Ok(())
    }
}
