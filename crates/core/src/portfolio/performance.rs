//! Pure reducers over a NAV series.

use rust_decimal::Decimal;

use crate::constants::DAYS_PER_YEAR;

use super::nav_model::{NavHistory, PerformanceMetrics};

/// Percent below the high-water mark; zero at or above it.
pub fn drawdown(nav: Decimal, high_water_mark: Decimal) -> Decimal {
    if high_water_mark <= Decimal::ZERO || nav >= high_water_mark {
        return Decimal::ZERO;
    }
    (nav - high_water_mark) / high_water_mark * Decimal::ONE_HUNDRED
}

/// Running `(high_water_mark, drawdown)` for each nav in order.
pub fn drawdown_series(navs: &[Decimal]) -> Vec<(Decimal, Decimal)> {
    let mut high_water_mark = Decimal::MIN;
    navs.iter()
        .map(|nav| {
            high_water_mark = high_water_mark.max(*nav);
            (high_water_mark, drawdown(*nav, high_water_mark))
        })
        .collect()
}

/// Highest nav across prior entries and the new observation.
pub fn high_water_mark(history: &[NavHistory], nav: Decimal) -> Decimal {
    history.iter().map(|h| h.nav).fold(nav, Decimal::max)
}

/// Reduces an ascending NAV history into summary metrics.
pub fn calculate_performance(history: &[NavHistory]) -> PerformanceMetrics {
    let (Some(first), Some(last)) = (history.first(), history.last()) else {
        return PerformanceMetrics::default();
    };

    let initial = first.nav;
    let latest = last.nav;
    let total_return = latest - initial;
    let total_return_percent = if initial > Decimal::ZERO {
        total_return / initial * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };

    let max_drawdown = history
        .iter()
        .map(|h| h.drawdown)
        .fold(Decimal::ZERO, Decimal::min);

    let days_active = (last.timestamp - first.timestamp).num_days();
    let annualized_return = if days_active >= 1 && initial > Decimal::ZERO {
        let years = Decimal::from(days_active) / DAYS_PER_YEAR;
        (latest / initial - Decimal::ONE) / years
    } else {
        Decimal::ZERO
    };

    PerformanceMetrics {
        initial_investment: initial,
        latest_nav: latest,
        total_return,
        total_return_percent,
        max_drawdown,
        current_drawdown: last.drawdown,
        days_active,
        annualized_return,
        first_date: Some(first.timestamp),
        last_date: Some(last.timestamp),
        data_points: history.len(),
    }
}
