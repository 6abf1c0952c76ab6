//! Committed portfolios, rebalancing and NAV tracking.
//!
//! The service turns engine output into persisted snapshots, appends NAV
//! observations from live prices and reduces the NAV series into metrics.

mod nav_model;
mod performance;
mod portfolio_model;
mod portfolio_service;
mod portfolio_traits;

pub use nav_model::*;
pub use performance::{calculate_performance, drawdown, drawdown_series, high_water_mark};
pub use portfolio_model::*;
pub use portfolio_service::*;
pub use portfolio_traits::*;
