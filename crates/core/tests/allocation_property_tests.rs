//! Property-based integration tests for the allocation pipeline.
//!
//! These tests verify that cash accounting and constraint handling hold across
//! randomly generated strategy sets, using the `proptest` crate.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use stratfolio_core::allocation::{calculate_allocations, AllocationConstraints, AllocationEngine};
use stratfolio_core::settings::EngineSettings;
use stratfolio_core::strategies::{
    Signal, Stock, StockSignal, Strategy as InvestmentStrategy, StrategyStock, WeightMode,
};
use stratfolio_market_data::MockPriceSource;

const TICKERS: [&str; 6] = ["AAA", "BBB", "CCC", "DDD", "EEE", "FFF"];

// =============================================================================
// Generators
// =============================================================================

fn cents(range: std::ops::Range<i64>) -> impl Strategy<Value = Decimal> {
    range.prop_map(|c| Decimal::new(c, 2))
}

/// Generates one stock membership: (stock index, eligible, buy signal).
fn arb_member() -> impl Strategy<Value = (usize, bool, bool)> {
    (0..TICKERS.len(), prop::bool::weighted(0.8), prop::bool::weighted(0.7))
}

/// Generates a strategy with a random weight mode and membership.
fn arb_strategy() -> impl Strategy<Value = (bool, Decimal, Vec<(usize, bool, bool)>)> {
    prop::bool::ANY.prop_flat_map(|budget| {
        let weight = if budget {
            cents(1_000..800_000).boxed()
        } else {
            (1i64..90).prop_map(Decimal::from).boxed()
        };
        (
            Just(budget),
            weight,
            prop::collection::vec(arb_member(), 0..5),
        )
    })
}

fn arb_strategies() -> impl Strategy<Value = Vec<InvestmentStrategy>> {
    prop::collection::vec(arb_strategy(), 1..5).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (budget, weight, members))| build_strategy(i, budget, weight, members))
            .collect()
    })
}

fn arb_prices() -> impl Strategy<Value = Vec<Option<Decimal>>> {
    prop::collection::vec(prop::option::weighted(0.9, cents(100..500_000)), TICKERS.len())
}

fn arb_constraints() -> impl Strategy<Value = AllocationConstraints> {
    ((5i64..=100).prop_map(Decimal::from), cents(0..200_000))
        .prop_map(|(max, min)| AllocationConstraints::new(max, min))
}

fn build_strategy(
    index: usize,
    budget: bool,
    weight: Decimal,
    members: Vec<(usize, bool, bool)>,
) -> InvestmentStrategy {
    let mut seen = HashSet::new();
    let stocks = members
        .into_iter()
        .filter(|(stock, _, _)| seen.insert(*stock))
        .map(|(stock, eligible, buy)| StrategyStock {
            stock: Stock {
                id: format!("stock-{}", stock),
                ticker: TICKERS[stock].to_string(),
                name: TICKERS[stock].to_string(),
            },
            eligible,
            signal: Some(StockSignal {
                signal: if buy { Signal::Buy } else { Signal::Hold },
                signal_date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            }),
        })
        .collect();

    InvestmentStrategy {
        id: format!("strategy-{}", index),
        user_id: "user".to_string(),
        name: format!("Strategy {}", index),
        weight_mode: if budget {
            WeightMode::Budget
        } else {
            WeightMode::Percent
        },
        weight_value: weight,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
            + Duration::minutes(index as i64),
        stocks,
    }
}

fn engine_for(prices: &[Option<Decimal>]) -> AllocationEngine {
    let seeded = TICKERS
        .iter()
        .zip(prices)
        .filter_map(|(ticker, price)| price.map(|p| (*ticker, p)));
    AllocationEngine::new(
        Arc::new(MockPriceSource::with_prices(seeded)),
        EngineSettings::default(),
    )
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Every unit of the investment is either assigned to a stock or
    /// accounted for as unassigned or candidate-less cash.
    #[test]
    fn prop_calculator_never_leaks_cash(
        strategies in arb_strategies(),
        total in cents(10_000..5_000_000),
    ) {
        let output = calculate_allocations(&strategies, total, &HashSet::new());

        prop_assert_eq!(
            output.total_allocated() + output.unassigned + output.no_candidates,
            total
        );
        prop_assert!(output.unassigned >= Decimal::ZERO);
        let budget_total: Decimal = output.strategy_budgets.iter().map(|b| b.amount).sum();
        prop_assert!(budget_total <= total);
    }

    /// Contributions always sum to the stock's allocation, before and after
    /// constraint correction.
    #[test]
    fn prop_contributions_sum_to_allocation(
        strategies in arb_strategies(),
        total in cents(10_000..5_000_000),
        prices in arb_prices(),
        constraints in arb_constraints(),
    ) {
        let raw = calculate_allocations(&strategies, total, &HashSet::new());
        for allocation in &raw.allocations {
            prop_assert_eq!(allocation.contribution_total(), allocation.allocation_value);
        }

        let engine = engine_for(&prices);
        let result = runtime()
            .block_on(engine.calculate_allocations(&strategies, total, &constraints, &HashSet::new()));
        let result = result.unwrap();
        for allocation in &result.allocations {
            prop_assert_eq!(allocation.contribution_total(), allocation.allocation_value);
        }
    }

    /// Shares are floored, nothing is overspent, and the unallocated cash is
    /// fully explained by its breakdown.
    #[test]
    fn prop_floor_and_cash_reconciliation(
        strategies in arb_strategies(),
        total in cents(10_000..5_000_000),
        prices in arb_prices(),
        constraints in arb_constraints(),
    ) {
        let engine = engine_for(&prices);
        let result = runtime()
            .block_on(engine.calculate_allocations(&strategies, total, &constraints, &HashSet::new()))
            .unwrap();

        let ceiling = constraints.ceiling(total);
        for allocation in &result.allocations {
            prop_assert!(allocation.price > Decimal::ZERO);
            prop_assert_eq!(
                Decimal::from(allocation.quantity),
                (allocation.allocation_value / allocation.price).floor()
            );
            prop_assert!(allocation.actual_value <= allocation.allocation_value);
            prop_assert!(allocation.allocation_value <= ceiling);
            prop_assert!(allocation.allocation_value >= constraints.min_allocation_amount);
        }

        prop_assert_eq!(result.unallocated_cash, total - result.total_allocated);
        prop_assert_eq!(result.unallocated_cash, result.unallocated_breakdown.total());
        prop_assert!(result.unallocated_cash >= Decimal::ZERO);
    }

    /// The same inputs always produce the same result.
    #[test]
    fn prop_preview_is_idempotent(
        strategies in arb_strategies(),
        total in cents(10_000..5_000_000),
        prices in arb_prices(),
    ) {
        let engine = engine_for(&prices);
        let rt = runtime();
        let constraints = AllocationConstraints::default();
        let first = rt
            .block_on(engine.calculate_allocations(&strategies, total, &constraints, &HashSet::new()))
            .unwrap();
        let second = rt
            .block_on(engine.calculate_allocations(&strategies, total, &constraints, &HashSet::new()))
            .unwrap();
        prop_assert_eq!(first, second);
    }
}
