//! NAV history and performance models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What produced a NAV entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NavEntryKind {
    /// Written by the commit that created the portfolio
    Initial,
    /// Written by a rebalance commit; marks a new cash basis
    Rebalance,
    /// Written by a NAV update from live prices
    Update,
}

impl NavEntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NavEntryKind::Initial => "INITIAL",
            NavEntryKind::Rebalance => "REBALANCE",
            NavEntryKind::Update => "UPDATE",
        }
    }
}

impl std::str::FromStr for NavEntryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INITIAL" => Ok(NavEntryKind::Initial),
            "REBALANCE" => Ok(NavEntryKind::Rebalance),
            "UPDATE" => Ok(NavEntryKind::Update),
            other => Err(format!("Unknown NAV entry kind '{}'", other)),
        }
    }
}

/// One append-only NAV observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavHistory {
    pub portfolio_id: String,
    pub timestamp: DateTime<Utc>,
    pub nav: Decimal,
    /// `nav - total_investment`
    pub pnl: Decimal,
    /// Percent below the high-water mark; zero or negative
    pub drawdown: Decimal,
    pub kind: NavEntryKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub initial_investment: Decimal,
    pub latest_nav: Decimal,
    pub total_return: Decimal,
    pub total_return_percent: Decimal,
    pub max_drawdown: Decimal,
    pub current_drawdown: Decimal,
    pub days_active: i64,
    /// Simple annualized return as a ratio (0.1 = 10% per year)
    pub annualized_return: Decimal,
    pub first_date: Option<DateTime<Utc>>,
    pub last_date: Option<DateTime<Utc>>,
    pub data_points: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavUpdateFailure {
    pub portfolio_id: String,
    pub error: String,
    pub retryable: bool,
}

/// Outcome of a NAV update pass over every portfolio.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavUpdateReport {
    pub updated: Vec<NavHistory>,
    pub failed: Vec<NavUpdateFailure>,
}

impl NavUpdateReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}
