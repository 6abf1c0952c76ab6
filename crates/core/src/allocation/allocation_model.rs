//! Allocation models: constraints, per-stock allocations and validation findings.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MAX_ALLOCATION_PER_STOCK, DEFAULT_MIN_ALLOCATION_AMOUNT};

/// Per-request allocation limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationConstraints {
    /// Ceiling per stock, percent of total investment (0 < x <= 100)
    pub max_allocation_per_stock: Decimal,
    /// Floor per stock, absolute currency amount (>= 0)
    pub min_allocation_amount: Decimal,
}

impl Default for AllocationConstraints {
    fn default() -> Self {
        Self {
            max_allocation_per_stock: DEFAULT_MAX_ALLOCATION_PER_STOCK,
            min_allocation_amount: DEFAULT_MIN_ALLOCATION_AMOUNT,
        }
    }
}

impl AllocationConstraints {
    pub fn new(max_allocation_per_stock: Decimal, min_allocation_amount: Decimal) -> Self {
        Self {
            max_allocation_per_stock,
            min_allocation_amount,
        }
    }

    /// Currency ceiling for one stock given the total investment.
    pub fn ceiling(&self, total_investment: Decimal) -> Decimal {
        total_investment * self.max_allocation_per_stock / Decimal::ONE_HUNDRED
    }
}

/// Allocation of the investment to one stock.
///
/// Before quantity conversion `quantity`, `price` and `actual_value` are zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAllocation {
    pub stock_id: String,
    pub ticker: String,
    /// Percent of total investment (target value, before share rounding)
    pub weight: Decimal,
    /// Target currency amount; always equals the sum of `strategy_contrib`
    pub allocation_value: Decimal,
    pub quantity: u64,
    pub price: Decimal,
    /// `quantity * price`, the amount actually spent
    pub actual_value: Decimal,
    /// strategy id -> amount contributed
    pub strategy_contrib: BTreeMap<String, Decimal>,
}

impl StockAllocation {
    pub fn new(stock_id: &str, ticker: &str) -> Self {
        Self {
            stock_id: stock_id.to_string(),
            ticker: ticker.to_string(),
            weight: Decimal::ZERO,
            allocation_value: Decimal::ZERO,
            quantity: 0,
            price: Decimal::ZERO,
            actual_value: Decimal::ZERO,
            strategy_contrib: BTreeMap::new(),
        }
    }

    pub fn contribution_total(&self) -> Decimal {
        self.strategy_contrib.values().copied().sum()
    }

    /// Recomputes `weight` from `allocation_value`.
    pub fn refresh_weight(&mut self, total_investment: Decimal) {
        self.weight = if total_investment > Decimal::ZERO {
            self.allocation_value / total_investment * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };
    }
}

/// Currency amount a strategy was given and how many stocks shared it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyBudget {
    pub strategy_id: String,
    pub amount: Decimal,
    pub candidate_count: usize,
}

/// Where the unallocated cash came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnallocatedBreakdown {
    /// Investment not claimed by any strategy weight
    pub unassigned: Decimal,
    /// Strategy amounts with no eligible Buy stock
    pub no_candidates: Decimal,
    /// Clipped excess above the ceiling and stocks dropped below the minimum
    pub constraint_adjustments: Decimal,
    /// Stocks dropped because no price was available
    pub unavailable_prices: Decimal,
    /// Remainders from flooring to whole shares
    pub rounding: Decimal,
}

impl UnallocatedBreakdown {
    pub fn total(&self) -> Decimal {
        self.unassigned
            + self.no_candidates
            + self.constraint_adjustments
            + self.unavailable_prices
            + self.rounding
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationKind {
    MinAllocationViolation,
    MaxAllocationViolation,
    LowAllocationRatio,
    ConcentrationRisk,
    InvalidMaxAllocation,
    InvalidMinAllocation,
    InvalidInvestment,
    ImpossibleConstraints,
    DiversificationFloor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational; never blocks a commit
    Warning,
    /// Blocks a commit unless the caller opts in
    Error,
}

/// A single finding from constraint validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintViolation {
    pub kind: ViolationKind,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    pub message: String,
    /// The offending value (amount, ratio or count depending on kind)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<Decimal>,
    /// The limit it was compared against
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_value: Option<Decimal>,
    /// Percentage context (weight, unallocated share)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<Decimal>,
    pub suggestions: Vec<String>,
}

impl ConstraintViolation {
    pub fn new(kind: ViolationKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            stock_id: None,
            ticker: None,
            message: message.into(),
            current_value: None,
            limit_value: None,
            percentage: None,
            suggestions: Vec::new(),
        }
    }

    pub fn for_stock(mut self, stock_id: &str, ticker: &str) -> Self {
        self.stock_id = Some(stock_id.to_string());
        self.ticker = Some(ticker.to_string());
        self
    }

    pub fn values(mut self, current: Decimal, limit: Decimal) -> Self {
        self.current_value = Some(current);
        self.limit_value = Some(limit);
        self
    }

    pub fn percentage(mut self, percentage: Decimal) -> Self {
        self.percentage = Some(percentage);
        self
    }

    pub fn suggest<I, S>(mut self, suggestions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggestions.extend(suggestions.into_iter().map(Into::into));
        self
    }

    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Error
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub violations: Vec<ConstraintViolation>,
}

impl ValidationResult {
    pub fn from_violations(violations: Vec<ConstraintViolation>) -> Self {
        let is_valid = !violations.iter().any(ConstraintViolation::is_blocking);
        Self {
            is_valid,
            violations,
        }
    }

    /// Appends findings from another validation pass.
    pub fn merge(&mut self, other: ValidationResult) {
        self.violations.extend(other.violations);
        self.is_valid = !self.violations.iter().any(ConstraintViolation::is_blocking);
    }

    pub fn blocking(&self) -> Vec<ConstraintViolation> {
        self.violations
            .iter()
            .filter(|v| v.is_blocking())
            .cloned()
            .collect()
    }

    pub fn has_kind(&self, kind: ViolationKind) -> bool {
        self.violations.iter().any(|v| v.kind == kind)
    }
}

/// Outcome of one allocation computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationResult {
    pub total_investment: Decimal,
    pub allocations: Vec<StockAllocation>,
    /// Sum of `actual_value` over `allocations`
    pub total_allocated: Decimal,
    /// `total_investment - total_allocated`
    pub unallocated_cash: Decimal,
    pub unallocated_breakdown: UnallocatedBreakdown,
    pub strategy_budgets: Vec<StrategyBudget>,
    /// Tickers dropped because no price was available
    pub unavailable_tickers: Vec<String>,
    /// Advisory findings on the raw (pre-correction) allocation
    pub validation: ValidationResult,
}

impl AllocationResult {
    pub fn allocation_for(&self, stock_id: &str) -> Option<&StockAllocation> {
        self.allocations.iter().find(|a| a.stock_id == stock_id)
    }
}
