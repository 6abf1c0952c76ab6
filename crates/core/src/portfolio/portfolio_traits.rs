use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::allocation::AllocationResult;
use crate::errors::Result;

use super::nav_model::{NavHistory, NavUpdateReport, PerformanceMetrics};
use super::portfolio_model::{
    CommitRequest, PersistedSnapshot, Portfolio, PortfolioSnapshot, Position, PreviewRequest,
};

/// Persistence for portfolios and their positions.
#[async_trait]
pub trait PortfolioRepositoryTrait: Send + Sync {
    /// Upserts the portfolio, replaces all of its positions and appends the
    /// NAV entry in one transaction.
    async fn save_snapshot(&self, snapshot: PortfolioSnapshot) -> Result<()>;

    /// Fails with `NotFound` for an unknown id.
    fn get_portfolio(&self, portfolio_id: &str) -> Result<Portfolio>;

    fn list_portfolios(&self) -> Result<Vec<Portfolio>>;

    fn get_positions(&self, portfolio_id: &str) -> Result<Vec<Position>>;

    /// Deletes the portfolio with its positions and NAV history. Returns the
    /// number of portfolios removed.
    async fn delete_portfolio(&self, portfolio_id: &str) -> Result<usize>;
}

/// Append-only NAV history.
#[async_trait]
pub trait NavHistoryRepositoryTrait: Send + Sync {
    async fn append_nav_history(&self, entry: NavHistory) -> Result<()>;

    /// Entries in ascending timestamp order, bounds inclusive.
    fn get_nav_history(
        &self,
        portfolio_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<NavHistory>>;
}

#[async_trait]
pub trait PortfolioServiceTrait: Send + Sync {
    async fn preview(&self, request: PreviewRequest) -> Result<AllocationResult>;

    async fn commit(&self, request: CommitRequest) -> Result<PersistedSnapshot>;

    async fn rebalance_preview(
        &self,
        portfolio_id: &str,
        new_total_investment: Decimal,
    ) -> Result<AllocationResult>;

    async fn rebalance_commit(
        &self,
        portfolio_id: &str,
        new_total_investment: Decimal,
        allow_violations: bool,
    ) -> Result<PersistedSnapshot>;

    async fn update_nav(&self, portfolio_id: &str) -> Result<NavHistory>;

    async fn update_all_navs(&self) -> Result<NavUpdateReport>;

    fn get_performance(&self, portfolio_id: &str) -> Result<PerformanceMetrics>;

    fn get_nav_history(
        &self,
        portfolio_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<NavHistory>>;

    async fn delete_portfolio(&self, portfolio_id: &str) -> Result<()>;
}
