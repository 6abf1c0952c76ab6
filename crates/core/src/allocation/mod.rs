//! Allocation pipeline: weight resolution, constraint validation and
//! correction, pricing and share rounding.

mod allocation_calculator;
mod allocation_engine;
mod allocation_model;
mod constraint_validator;


pub use allocation_calculator::{calculate_allocations, resolve_strategy_amounts, CalculationOutput};
pub use allocation_engine::{apply_constraints, AllocationEngine};
pub use allocation_model::*;
pub use constraint_validator::{
    validate_allocations, validate_constraint_bounds, validate_constraints_config,
};
