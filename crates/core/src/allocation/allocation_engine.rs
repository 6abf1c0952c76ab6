//! Allocation orchestration: calculate, validate, correct, price, round.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::{debug, warn};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use stratfolio_market_data::{MarketDataError, PriceSource};

use crate::constants::DECIMAL_PRECISION;
use crate::errors::{Error, Result, ValidationError};
use crate::settings::EngineSettings;
use crate::strategies::Strategy;

use super::allocation_calculator::calculate_allocations;
use super::allocation_model::{
    AllocationConstraints, AllocationResult, StockAllocation, UnallocatedBreakdown,
    ViolationKind,
};
use super::constraint_validator::{validate_allocations, validate_constraints_config};

/// Config findings that make any computation meaningless.
const HARD_CONFIG_KINDS: [ViolationKind; 3] = [
    ViolationKind::InvalidMaxAllocation,
    ViolationKind::InvalidInvestment,
    ViolationKind::InvalidMinAllocation,
];

/// Clips every allocation to the per-stock ceiling, then drops the ones below
/// the minimum amount. Runs once; freed cash is not redistributed.
///
/// Returns the surviving allocations and the total amount removed.
pub fn apply_constraints(
    allocations: Vec<StockAllocation>,
    constraints: &AllocationConstraints,
    total_investment: Decimal,
) -> (Vec<StockAllocation>, Decimal) {
    let ceiling = constraints.ceiling(total_investment);
    let mut adjustments = Decimal::ZERO;
    let mut kept = Vec::with_capacity(allocations.len());

    for mut allocation in allocations {
        if allocation.allocation_value > ceiling {
            let excess = allocation.allocation_value - ceiling;
            debug!(
                "Clipping {} from {} to {} (excess {})",
                allocation.ticker, allocation.allocation_value, ceiling, excess
            );
            scale_contributions(&mut allocation, ceiling);
            adjustments += excess;
        }

        if allocation.allocation_value < constraints.min_allocation_amount {
            debug!(
                "Dropping {}: {} is below the minimum {}",
                allocation.ticker, allocation.allocation_value, constraints.min_allocation_amount
            );
            adjustments += allocation.allocation_value;
            continue;
        }

        allocation.refresh_weight(total_investment);
        kept.push(allocation);
    }

    (kept, adjustments)
}

/// Rescales contributions so they sum exactly to `target`.
fn scale_contributions(allocation: &mut StockAllocation, target: Decimal) {
    let current = allocation.allocation_value;
    if current <= Decimal::ZERO {
        return;
    }

    let last_key = allocation.strategy_contrib.keys().next_back().cloned();
    let mut assigned = Decimal::ZERO;
    for (strategy_id, contribution) in allocation.strategy_contrib.iter_mut() {
        if Some(strategy_id) == last_key.as_ref() {
            *contribution = target - assigned;
        } else {
            *contribution = (*contribution * target / current).round_dp(DECIMAL_PRECISION);
            assigned += *contribution;
        }
    }
    allocation.allocation_value = target;
}

pub struct AllocationEngine {
    price_source: Arc<dyn PriceSource>,
    settings: EngineSettings,
}

impl AllocationEngine {
    pub fn new(price_source: Arc<dyn PriceSource>, settings: EngineSettings) -> Self {
        Self {
            price_source,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// One batched lookup bounded by the configured deadline.
    ///
    /// Tickers without a positive price are simply absent from the map. A
    /// failed or timed-out batch is an error.
    pub async fn fetch_prices(&self, tickers: &[String]) -> Result<HashMap<String, Decimal>> {
        if tickers.is_empty() {
            return Ok(HashMap::new());
        }

        let mut unique: Vec<String> = Vec::with_capacity(tickers.len());
        let mut seen = HashSet::with_capacity(tickers.len());
        for ticker in tickers {
            if seen.insert(ticker.as_str()) {
                unique.push(ticker.clone());
            }
        }

        let quotes = tokio::time::timeout(
            self.settings.price_timeout,
            self.price_source.get_batch_quotes(&unique),
        )
        .await
        .map_err(|_| MarketDataError::Timeout {
            provider: self.price_source.id().to_string(),
        })??;

        Ok(quotes
            .into_iter()
            .filter(|(_, quote)| quote.price > Decimal::ZERO)
            .map(|(ticker, quote)| (ticker, quote.price))
            .collect())
    }

    /// Runs the full pipeline. Side-effect free apart from the price lookup.
    pub async fn calculate_allocations(
        &self,
        strategies: &[Strategy],
        total_investment: Decimal,
        constraints: &AllocationConstraints,
        excluded_stock_ids: &HashSet<String>,
    ) -> Result<AllocationResult> {
        let config = validate_constraints_config(constraints, total_investment);
        if let Some(hard) = config
            .violations
            .iter()
            .find(|v| HARD_CONFIG_KINDS.contains(&v.kind))
        {
            return Err(Error::Validation(ValidationError::InvalidInput(
                hard.message.clone(),
            )));
        }

        let raw = calculate_allocations(strategies, total_investment, excluded_stock_ids);

        let mut validation = validate_allocations(&raw.allocations, constraints, total_investment);
        validation.merge(config);

        let (corrected, constraint_adjustments) =
            apply_constraints(raw.allocations, constraints, total_investment);

        let tickers: Vec<String> = corrected.iter().map(|a| a.ticker.clone()).collect();
        let prices = self.fetch_prices(&tickers).await?;

        let mut breakdown = UnallocatedBreakdown {
            unassigned: raw.unassigned,
            no_candidates: raw.no_candidates,
            constraint_adjustments,
            ..Default::default()
        };
        let mut unavailable_tickers = Vec::new();
        let mut allocations = Vec::with_capacity(corrected.len());

        for mut allocation in corrected {
            let Some(price) = prices.get(&allocation.ticker).copied() else {
                warn!(
                    "No price for {}; leaving {} unallocated",
                    allocation.ticker, allocation.allocation_value
                );
                breakdown.unavailable_prices += allocation.allocation_value;
                unavailable_tickers.push(allocation.ticker.clone());
                continue;
            };

            let quantity = (allocation.allocation_value / price)
                .floor()
                .to_u64()
                .unwrap_or(0);
            let actual_value = Decimal::from(quantity) * price;
            breakdown.rounding += allocation.allocation_value - actual_value;

            if quantity == 0 {
                debug!(
                    "{} at {} is priced above its allocation {}",
                    allocation.ticker, price, allocation.allocation_value
                );
                continue;
            }

            allocation.price = price;
            allocation.quantity = quantity;
            allocation.actual_value = actual_value;
            allocations.push(allocation);
        }

        let total_allocated: Decimal = allocations.iter().map(|a| a.actual_value).sum();
        let unallocated_cash = total_investment - total_allocated;

        debug!(
            "Allocated {} of {} across {} stocks ({} unavailable)",
            total_allocated,
            total_investment,
            allocations.len(),
            unavailable_tickers.len()
        );

        Ok(AllocationResult {
            total_investment,
            allocations,
            total_allocated,
            unallocated_cash,
            unallocated_breakdown: breakdown,
            strategy_budgets: raw.strategy_budgets,
            unavailable_tickers,
            validation,
        })
    }
}
