//! Strategies, stock eligibility and signals consumed by the allocation engine.

mod strategies_model;
mod strategies_traits;

pub use strategies_model::*;
pub use strategies_traits::*;
