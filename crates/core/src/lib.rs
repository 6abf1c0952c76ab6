//! Stratfolio Core - allocation engine, rebalancing and NAV tracking.
//!
//! This crate contains the business logic that turns weighted strategies,
//! eligibility flags and prices into a concrete stock allocation, and tracks
//! the resulting portfolio over time. It is database-agnostic and defines
//! repository traits that are implemented by the `storage-sqlite` crate.

pub mod allocation;
pub mod constants;
pub mod errors;
pub mod portfolio;
pub mod settings;
pub mod strategies;

pub use allocation::*;
pub use portfolio::*;
pub use strategies::*;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
