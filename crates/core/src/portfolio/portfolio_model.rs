//! Portfolio domain models.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::allocation::{AllocationConstraints, AllocationResult, StockAllocation};
use crate::constants::DISPLAY_DECIMAL_PRECISION;

use super::nav_model::NavHistory;

/// A committed portfolio and the settings it was built with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    /// Current cash basis; replaced on rebalance
    pub total_investment: Decimal,
    /// Strategies selected at creation, reused by rebalance
    pub strategy_ids: Vec<String>,
    pub constraints: AllocationConstraints,
    pub excluded_stock_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A held stock. Rows are replaced as a whole on rebalance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub portfolio_id: String,
    pub stock_id: String,
    pub ticker: String,
    pub quantity: u64,
    pub entry_price: Decimal,
    /// Target amount the engine assigned to this stock
    pub allocation_value: Decimal,
    pub strategy_contrib: BTreeMap<String, Decimal>,
}

impl Position {
    pub fn from_allocation(portfolio_id: &str, allocation: &StockAllocation) -> Self {
        Self {
            portfolio_id: portfolio_id.to_string(),
            stock_id: allocation.stock_id.clone(),
            ticker: allocation.ticker.clone(),
            quantity: allocation.quantity,
            entry_price: allocation.price,
            allocation_value: allocation.allocation_value.round_dp(DISPLAY_DECIMAL_PRECISION),
            strategy_contrib: allocation
                .strategy_contrib
                .iter()
                .map(|(id, value)| (id.clone(), value.round_dp(DISPLAY_DECIMAL_PRECISION)))
                .collect(),
        }
    }

    /// `quantity * price`
    pub fn market_value(&self, price: Decimal) -> Decimal {
        Decimal::from(self.quantity) * price
    }
}

/// Inputs for a side-effect free allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    pub strategy_ids: Vec<String>,
    pub total_investment: Decimal,
    /// Falls back to the configured default constraints
    #[serde(default)]
    pub constraints: Option<AllocationConstraints>,
    #[serde(default)]
    pub excluded_stock_ids: Vec<String>,
}

/// Inputs for creating a portfolio from an allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRequest {
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub allocation: PreviewRequest,
    /// Persist even when the allocation has blocking violations
    #[serde(default)]
    pub allow_violations: bool,
}

/// Everything written in one atomic save.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioSnapshot {
    pub portfolio: Portfolio,
    pub positions: Vec<Position>,
    pub nav_entry: NavHistory,
}

/// Result of a commit or rebalance commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSnapshot {
    pub portfolio: Portfolio,
    pub positions: Vec<Position>,
    pub nav_entry: NavHistory,
    pub allocation: AllocationResult,
}
