//! Pure allocation arithmetic: strategy amounts, equal split across
//! candidates, aggregation per stock. No constraints, no prices.

use std::collections::{HashMap, HashSet};

use log::debug;
use rust_decimal::Decimal;

use crate::constants::DECIMAL_PRECISION;
use crate::strategies::{Strategy, WeightMode};

use super::allocation_model::{StockAllocation, StrategyBudget};

/// Output of the calculator, before constraint correction and pricing.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationOutput {
    /// Aggregated per-stock allocations in first-seen order
    pub allocations: Vec<StockAllocation>,
    /// Resolved amount per strategy, in creation order
    pub strategy_budgets: Vec<StrategyBudget>,
    /// Investment no strategy weight claimed
    pub unassigned: Decimal,
    /// Strategy amounts that had no candidate to go to
    pub no_candidates: Decimal,
}

impl CalculationOutput {
    pub fn total_allocated(&self) -> Decimal {
        self.allocations.iter().map(|a| a.allocation_value).sum()
    }
}

/// Creation-ordered view over the strategies.
fn ordered(strategies: &[Strategy]) -> Vec<&Strategy> {
    let mut ordered: Vec<&Strategy> = strategies.iter().collect();
    ordered.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    ordered
}

fn positive(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

/// Resolves each strategy's currency amount.
///
/// Strategies draw from the pool in creation order: a budget strategy asks
/// for its fixed amount, a percent strategy for `total * w / 100`, and each
/// gets at most what is left, so later strategies absorb any shortfall.
///
/// When percent weights sum above 100 the configuration is normalized
/// instead: budgets are honored first, then percent strategies share the
/// remaining pool proportionally to their weights.
///
/// Returns the amounts in creation order together with the unclaimed rest.
pub fn resolve_strategy_amounts(
    strategies: &[Strategy],
    total_investment: Decimal,
) -> (Vec<(String, Decimal)>, Decimal) {
    let ordered = ordered(strategies);
    let mut remaining = positive(total_investment);

    let percent_sum: Decimal = ordered
        .iter()
        .filter(|s| s.weight_mode == WeightMode::Percent)
        .map(|s| positive(s.weight_value))
        .sum();

    if percent_sum <= Decimal::ONE_HUNDRED {
        let resolved = ordered
            .iter()
            .map(|s| {
                let requested = match s.weight_mode {
                    WeightMode::Budget => positive(s.weight_value),
                    WeightMode::Percent => {
                        total_investment * positive(s.weight_value) / Decimal::ONE_HUNDRED
                    }
                };
                let amount = requested.min(remaining);
                remaining -= amount;
                (s.id.clone(), amount)
            })
            .collect();
        return (resolved, remaining);
    }

    debug!(
        "Percent weights sum to {}; rescaling percent strategies over what budgets leave",
        percent_sum
    );

    let mut amounts: HashMap<&str, Decimal> = HashMap::with_capacity(ordered.len());
    for strategy in ordered.iter().filter(|s| s.weight_mode == WeightMode::Budget) {
        let amount = positive(strategy.weight_value).min(remaining);
        remaining -= amount;
        amounts.insert(strategy.id.as_str(), amount);
    }

    // The last percent strategy takes the exact rest so the pool is fully consumed.
    let percent: Vec<&Strategy> = ordered
        .iter()
        .copied()
        .filter(|s| s.weight_mode == WeightMode::Percent)
        .collect();
    let pool = remaining;
    let mut handed_out = Decimal::ZERO;
    for (index, strategy) in percent.iter().enumerate() {
        let amount = if index + 1 == percent.len() {
            pool - handed_out
        } else {
            (pool * positive(strategy.weight_value) / percent_sum).round_dp(DECIMAL_PRECISION)
        };
        handed_out += amount;
        amounts.insert(strategy.id.as_str(), amount);
    }

    let resolved = ordered
        .iter()
        .map(|s| {
            (
                s.id.clone(),
                amounts.get(s.id.as_str()).copied().unwrap_or(Decimal::ZERO),
            )
        })
        .collect();

    (resolved, Decimal::ZERO)
}

/// Computes raw per-stock allocations.
///
/// Each strategy's amount is split equally across its candidates (eligible,
/// signalled Buy, not excluded). Stocks held by several strategies accumulate
/// every contribution.
pub fn calculate_allocations(
    strategies: &[Strategy],
    total_investment: Decimal,
    excluded_stock_ids: &HashSet<String>,
) -> CalculationOutput {
    let (amounts, unassigned) = resolve_strategy_amounts(strategies, total_investment);
    let by_id: HashMap<&str, &Strategy> = strategies.iter().map(|s| (s.id.as_str(), s)).collect();

    let mut allocations: Vec<StockAllocation> = Vec::new();
    let mut index_by_stock: HashMap<String, usize> = HashMap::new();
    let mut strategy_budgets = Vec::with_capacity(amounts.len());
    let mut no_candidates = Decimal::ZERO;

    for (strategy_id, amount) in amounts {
        let Some(strategy) = by_id.get(strategy_id.as_str()) else {
            continue;
        };

        let candidates: Vec<_> = strategy
            .candidates()
            .filter(|c| !excluded_stock_ids.contains(&c.stock.id))
            .collect();

        strategy_budgets.push(StrategyBudget {
            strategy_id: strategy_id.clone(),
            amount,
            candidate_count: candidates.len(),
        });

        if amount.is_zero() {
            continue;
        }
        if candidates.is_empty() {
            debug!(
                "Strategy {} has no eligible Buy stocks; {} stays unallocated",
                strategy_id, amount
            );
            no_candidates += amount;
            continue;
        }

        let share = (amount / Decimal::from(candidates.len())).round_dp(DECIMAL_PRECISION);
        let last = candidates.len() - 1;
        let mut handed_out = Decimal::ZERO;

        for (position, candidate) in candidates.iter().enumerate() {
            // The last candidate absorbs the division remainder.
            let contribution = if position == last {
                amount - handed_out
            } else {
                share
            };
            handed_out += contribution;

            let index = *index_by_stock
                .entry(candidate.stock.id.clone())
                .or_insert_with(|| {
                    allocations.push(StockAllocation::new(
                        &candidate.stock.id,
                        &candidate.stock.ticker,
                    ));
                    allocations.len() - 1
                });

            let allocation = &mut allocations[index];
            *allocation
                .strategy_contrib
                .entry(strategy_id.clone())
                .or_insert(Decimal::ZERO) += contribution;
            allocation.allocation_value += contribution;
        }
    }

    for allocation in &mut allocations {
        allocation.refresh_weight(total_investment);
    }

    CalculationOutput {
        allocations,
        strategy_budgets,
        unassigned,
        no_candidates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::{Signal, Stock, StockSignal, StrategyStock};
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn buy(id: &str) -> StrategyStock {
        member(id, true, Signal::Buy)
    }

    fn member(id: &str, eligible: bool, signal: Signal) -> StrategyStock {
        StrategyStock {
            stock: Stock {
                id: id.to_string(),
                ticker: id.to_uppercase(),
                name: id.to_string(),
            },
            eligible,
            signal: Some(StockSignal {
                signal,
                signal_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            }),
        }
    }

    fn strategy(
        id: &str,
        order: i64,
        mode: WeightMode,
        value: Decimal,
        stocks: Vec<StrategyStock>,
    ) -> Strategy {
        Strategy {
            id: id.to_string(),
            user_id: "user-1".to_string(),
            name: id.to_string(),
            weight_mode: mode,
            weight_value: value,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(order),
            stocks,
        }
    }

    fn amount_of(amounts: &[(String, Decimal)], id: &str) -> Decimal {
        amounts.iter().find(|(s, _)| s == id).map(|(_, a)| *a).unwrap()
    }

    #[test]
    fn test_percent_strategies_resolve_against_total() {
        let strategies = vec![
            strategy("s1", 0, WeightMode::Percent, dec!(60), vec![buy("a")]),
            strategy("s2", 1, WeightMode::Percent, dec!(40), vec![buy("b")]),
        ];
        let (amounts, rest) = resolve_strategy_amounts(&strategies, dec!(10000));
        assert_eq!(amount_of(&amounts, "s1"), dec!(6000));
        assert_eq!(amount_of(&amounts, "s2"), dec!(4000));
        assert_eq!(rest, Decimal::ZERO);
    }

    #[test]
    fn test_percent_over_100_is_rescaled() {
        let strategies = vec![
            strategy("s1", 0, WeightMode::Percent, dec!(90), vec![buy("a")]),
            strategy("s2", 1, WeightMode::Percent, dec!(60), vec![buy("b")]),
        ];
        let (amounts, rest) = resolve_strategy_amounts(&strategies, dec!(10000));
        assert_eq!(amount_of(&amounts, "s1"), dec!(6000));
        assert_eq!(amount_of(&amounts, "s2"), dec!(4000));
        assert_eq!(rest, Decimal::ZERO);
        assert!(amounts.iter().all(|(_, a)| *a >= Decimal::ZERO));
    }

    #[test]
    fn test_budget_is_capped_by_pool_in_creation_order() {
        let strategies = vec![
            strategy("late", 2, WeightMode::Budget, dec!(5000), vec![buy("b")]),
            strategy("early", 1, WeightMode::Budget, dec!(8000), vec![buy("a")]),
        ];
        let (amounts, rest) = resolve_strategy_amounts(&strategies, dec!(10000));
        assert_eq!(amounts[0].0, "early");
        assert_eq!(amount_of(&amounts, "early"), dec!(8000));
        assert_eq!(amount_of(&amounts, "late"), dec!(2000));
        assert_eq!(rest, Decimal::ZERO);
    }

    #[test]
    fn test_later_percent_strategy_absorbs_shortfall() {
        let strategies = vec![
            strategy("b", 0, WeightMode::Budget, dec!(4000), vec![buy("x")]),
            strategy("p1", 1, WeightMode::Percent, dec!(50), vec![buy("y")]),
            strategy("p2", 2, WeightMode::Percent, dec!(30), vec![buy("z")]),
        ];
        let (amounts, rest) = resolve_strategy_amounts(&strategies, dec!(10000));
        assert_eq!(amount_of(&amounts, "b"), dec!(4000));
        assert_eq!(amount_of(&amounts, "p1"), dec!(5000));
        assert_eq!(amount_of(&amounts, "p2"), dec!(1000));
        assert_eq!(rest, Decimal::ZERO);
    }

    #[test]
    fn test_percent_created_before_budget_draws_first() {
        let strategies = vec![
            strategy("b", 1, WeightMode::Budget, dec!(8000), vec![buy("x")]),
            strategy("p", 0, WeightMode::Percent, dec!(60), vec![buy("y")]),
        ];
        let (amounts, rest) = resolve_strategy_amounts(&strategies, dec!(10000));
        assert_eq!(amounts[0], ("p".to_string(), dec!(6000)));
        assert_eq!(amounts[1], ("b".to_string(), dec!(4000)));
        assert_eq!(rest, Decimal::ZERO);
    }

    #[test]
    fn test_percent_over_100_shares_what_budgets_leave() {
        let strategies = vec![
            strategy("p1", 0, WeightMode::Percent, dec!(90), vec![buy("y")]),
            strategy("b", 1, WeightMode::Budget, dec!(4000), vec![buy("x")]),
            strategy("p2", 2, WeightMode::Percent, dec!(60), vec![buy("z")]),
        ];
        // Budget first, then 6000 split 90:60.
        let (amounts, rest) = resolve_strategy_amounts(&strategies, dec!(10000));
        assert_eq!(amount_of(&amounts, "b"), dec!(4000));
        assert_eq!(amount_of(&amounts, "p1"), dec!(3600));
        assert_eq!(amount_of(&amounts, "p2"), dec!(2400));
        assert_eq!(rest, Decimal::ZERO);
    }

    #[test]
    fn test_unclaimed_percent_stays_unassigned() {
        let strategies = vec![strategy("s1", 0, WeightMode::Percent, dec!(60), vec![buy("a")])];
        let output = calculate_allocations(&strategies, dec!(10000), &HashSet::new());
        assert_eq!(output.unassigned, dec!(4000));
        assert_eq!(output.total_allocated(), dec!(6000));
    }

    #[test]
    fn test_stock_in_two_strategies_aggregates_contributions() {
        let strategies = vec![
            strategy("strategy1", 0, WeightMode::Budget, dec!(3000), vec![buy("shared")]),
            strategy("strategy2", 1, WeightMode::Budget, dec!(2000), vec![buy("shared")]),
        ];
        let output = calculate_allocations(&strategies, dec!(10000), &HashSet::new());

        assert_eq!(output.allocations.len(), 1);
        let shared = &output.allocations[0];
        assert_eq!(shared.allocation_value, dec!(5000));
        assert_eq!(shared.strategy_contrib["strategy1"], dec!(3000));
        assert_eq!(shared.strategy_contrib["strategy2"], dec!(2000));
        assert_eq!(shared.weight, dec!(50));
    }

    #[test]
    fn test_strategy_without_candidates_feeds_unallocated() {
        let strategies = vec![
            strategy(
                "s1",
                0,
                WeightMode::Percent,
                dec!(30),
                vec![member("a", false, Signal::Buy), member("b", true, Signal::Hold)],
            ),
            strategy("s2", 1, WeightMode::Percent, dec!(70), vec![buy("c")]),
        ];
        let output = calculate_allocations(&strategies, dec!(10000), &HashSet::new());
        assert_eq!(output.no_candidates, dec!(3000));
        assert_eq!(output.allocations.len(), 1);
        assert_eq!(output.strategy_budgets[0].candidate_count, 0);
    }

    #[test]
    fn test_equal_split_keeps_contributions_exact() {
        let strategies = vec![strategy(
            "s1",
            0,
            WeightMode::Budget,
            dec!(1000),
            vec![buy("a"), buy("b"), buy("c")],
        )];
        let output = calculate_allocations(&strategies, dec!(1000), &HashSet::new());

        assert_eq!(output.total_allocated(), dec!(1000));
        for allocation in &output.allocations {
            assert_eq!(allocation.contribution_total(), allocation.allocation_value);
        }
        assert_eq!(output.allocations[0].allocation_value.round_dp(2), dec!(333.33));
    }

    #[test]
    fn test_excluded_stock_budget_spreads_over_remaining_candidates() {
        let strategies = vec![strategy(
            "s1",
            0,
            WeightMode::Budget,
            dec!(900),
            vec![buy("a"), buy("b"), buy("c")],
        )];
        let excluded: HashSet<String> = ["b".to_string()].into_iter().collect();
        let output = calculate_allocations(&strategies, dec!(900), &excluded);

        assert_eq!(output.allocations.len(), 2);
        assert!(output.allocations.iter().all(|a| a.allocation_value == dec!(450)));
        assert!(output.allocations.iter().all(|a| a.stock_id != "b"));
    }

    #[test]
    fn test_excluding_every_candidate_leaves_amount_unallocated() {
        let strategies = vec![strategy("s1", 0, WeightMode::Budget, dec!(500), vec![buy("a")])];
        let excluded: HashSet<String> = ["a".to_string()].into_iter().collect();
        let output = calculate_allocations(&strategies, dec!(1000), &excluded);
        assert!(output.allocations.is_empty());
        assert_eq!(output.no_candidates, dec!(500));
        assert_eq!(output.unassigned, dec!(500));
    }

    #[test]
    fn test_allocation_order_follows_creation_order() {
        let strategies = vec![
            strategy("second", 1, WeightMode::Percent, dec!(50), vec![buy("z")]),
            strategy("first", 0, WeightMode::Percent, dec!(50), vec![buy("y")]),
        ];
        let output = calculate_allocations(&strategies, dec!(100), &HashSet::new());
        let ids: Vec<_> = output.allocations.iter().map(|a| a.stock_id.as_str()).collect();
        assert_eq!(ids, vec!["y", "z"]);
    }
}
