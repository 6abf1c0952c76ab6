//! Constraint checks over allocations and over the constraint configuration.
//!
//! Both checks are pure: they report findings and never mutate or fail.

use rust_decimal::Decimal;

use crate::constants::{
    DISPLAY_DECIMAL_PRECISION, LOW_ALLOCATION_RATIO, MIN_DIVERSIFIED_STOCK_COUNT,
    MIN_HOLDABLE_STOCKS,
};

use super::allocation_model::{
    AllocationConstraints, ConstraintViolation, Severity, StockAllocation, ValidationResult,
    ViolationKind,
};

fn display(value: Decimal) -> Decimal {
    value.round_dp(DISPLAY_DECIMAL_PRECISION)
}

/// Checks allocations against per-stock limits and portfolio-level heuristics.
pub fn validate_allocations(
    allocations: &[StockAllocation],
    constraints: &AllocationConstraints,
    total_investment: Decimal,
) -> ValidationResult {
    let mut violations = Vec::new();
    let ceiling = constraints.ceiling(total_investment);
    let minimum = constraints.min_allocation_amount;

    for allocation in allocations {
        if allocation.allocation_value < minimum {
            violations.push(
                ConstraintViolation::new(
                    ViolationKind::MinAllocationViolation,
                    Severity::Error,
                    format!(
                        "{} allocation {} is below the minimum of {}",
                        allocation.ticker,
                        display(allocation.allocation_value),
                        display(minimum)
                    ),
                )
                .for_stock(&allocation.stock_id, &allocation.ticker)
                .values(allocation.allocation_value, minimum)
                .percentage(allocation.weight)
                .suggest([
                    format!(
                        "Increase the allocation to {} by at least {}",
                        allocation.ticker,
                        display(minimum - allocation.allocation_value)
                    ),
                    format!("Remove {} from the portfolio", allocation.ticker),
                    "Reduce the number of stocks so each receives more".to_string(),
                    format!(
                        "Lower the minimum allocation to {} or less",
                        display(allocation.allocation_value)
                    ),
                ]),
            );
        }

        if allocation.allocation_value > ceiling {
            violations.push(
                ConstraintViolation::new(
                    ViolationKind::MaxAllocationViolation,
                    Severity::Error,
                    format!(
                        "{} is {}% of the portfolio, above the {}% limit ({})",
                        allocation.ticker,
                        display(allocation.weight),
                        display(constraints.max_allocation_per_stock),
                        display(ceiling)
                    ),
                )
                .for_stock(&allocation.stock_id, &allocation.ticker)
                .values(allocation.allocation_value, ceiling)
                .percentage(allocation.weight)
                .suggest([
                    "Diversify across more stocks".to_string(),
                    format!(
                        "Lower the strategy weight feeding {} by {}",
                        allocation.ticker,
                        display(allocation.allocation_value - ceiling)
                    ),
                    "Raise the total investment so the limit covers this amount".to_string(),
                ]),
            );
        }
    }

    if total_investment > Decimal::ZERO {
        let allocated: Decimal = allocations.iter().map(|a| a.allocation_value).sum();
        let ratio = allocated / total_investment;
        if ratio < LOW_ALLOCATION_RATIO {
            let unallocated = total_investment - allocated;
            let unallocated_pct = unallocated / total_investment * Decimal::ONE_HUNDRED;
            violations.push(
                ConstraintViolation::new(
                    ViolationKind::LowAllocationRatio,
                    Severity::Warning,
                    format!(
                        "Only {}% of the investment is allocated; {} stays in cash",
                        display(ratio * Decimal::ONE_HUNDRED),
                        display(unallocated)
                    ),
                )
                .values(unallocated, total_investment * LOW_ALLOCATION_RATIO)
                .percentage(unallocated_pct)
                .suggest([
                    "Add eligible stocks with a Buy signal to the selected strategies",
                    "Increase the strategy weights",
                ]),
            );
        }
    }

    let count = allocations.len();
    if count > 0 && count < MIN_DIVERSIFIED_STOCK_COUNT {
        violations.push(
            ConstraintViolation::new(
                ViolationKind::ConcentrationRisk,
                Severity::Warning,
                format!(
                    "Portfolio holds only {} stock(s); at least {} are recommended",
                    count, MIN_DIVERSIFIED_STOCK_COUNT
                ),
            )
            .values(Decimal::from(count), Decimal::from(MIN_DIVERSIFIED_STOCK_COUNT))
            .suggest(["Select more strategies or mark more stocks eligible"]),
        );
    }

    ValidationResult::from_violations(violations)
}

/// Range checks on the constraints alone, independent of any investment.
pub fn validate_constraint_bounds(constraints: &AllocationConstraints) -> Vec<ConstraintViolation> {
    let mut violations = Vec::new();
    let max = constraints.max_allocation_per_stock;
    let min = constraints.min_allocation_amount;

    if max <= Decimal::ZERO || max > Decimal::ONE_HUNDRED {
        violations.push(
            ConstraintViolation::new(
                ViolationKind::InvalidMaxAllocation,
                Severity::Error,
                format!("Maximum allocation per stock must be in (0, 100], got {}", max),
            )
            .values(max, Decimal::ONE_HUNDRED),
        );
    }

    if min < Decimal::ZERO {
        violations.push(
            ConstraintViolation::new(
                ViolationKind::InvalidMinAllocation,
                Severity::Error,
                format!("Minimum allocation cannot be negative, got {}", min),
            )
            .values(min, Decimal::ZERO),
        );
    }

    violations
}

/// Checks the constraint configuration itself.
pub fn validate_constraints_config(
    constraints: &AllocationConstraints,
    total_investment: Decimal,
) -> ValidationResult {
    let mut violations = validate_constraint_bounds(constraints);
    let max = constraints.max_allocation_per_stock;
    let min = constraints.min_allocation_amount;

    if total_investment <= Decimal::ZERO {
        violations.push(
            ConstraintViolation::new(
                ViolationKind::InvalidInvestment,
                Severity::Error,
                format!("Total investment must be positive, got {}", total_investment),
            )
            .values(total_investment, Decimal::ZERO),
        );
    }

    if total_investment > Decimal::ZERO && min > Decimal::ZERO {
        let min_pct = min / total_investment * Decimal::ONE_HUNDRED;
        if min_pct > max {
            violations.push(
                ConstraintViolation::new(
                    ViolationKind::ImpossibleConstraints,
                    Severity::Error,
                    format!(
                        "Minimum allocation {} is {}% of the investment, above the {}% maximum",
                        display(min),
                        display(min_pct),
                        display(max)
                    ),
                )
                .values(min_pct, max)
                .percentage(min_pct)
                .suggest([
                    "Lower the minimum allocation",
                    "Raise the maximum allocation per stock",
                    "Increase the total investment",
                ]),
            );
        }

        let holdable = total_investment / min;
        if holdable < MIN_HOLDABLE_STOCKS {
            violations.push(
                ConstraintViolation::new(
                    ViolationKind::DiversificationFloor,
                    Severity::Warning,
                    format!(
                        "Investment of {} covers fewer than {} stocks at the minimum of {}",
                        display(total_investment),
                        MIN_HOLDABLE_STOCKS,
                        display(min)
                    ),
                )
                .values(display(holdable), MIN_HOLDABLE_STOCKS)
                .suggest(["Lower the minimum allocation", "Increase the total investment"]),
            );
        }
    }

    ValidationResult::from_violations(violations)
}
