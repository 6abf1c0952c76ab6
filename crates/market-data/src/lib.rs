//! Stratfolio Market Data Crate
//!
//! This crate provides the price lookups consumed by the allocation engine.
//!
//! # Overview
//!
//! Every price source implements [`PriceSource`], which exposes a single-ticker
//! and a batched lookup. Two variants ship with the crate:
//!
//! - [`MockPriceSource`] - deterministic in-memory prices, used in tests and demos
//! - [`YahooPriceSource`] - live quotes from Yahoo Finance
//!
//! The variant is chosen by configuration ([`PriceSourceKind`]), never by
//! branching inside the engine.
//!
//! ```text
//! +------------------+       +------------------+
//! | AllocationEngine | ----> |   PriceSource    |  (trait object)
//! +------------------+       +------------------+
//!                              |             |
//!                              v             v
//!                    +-----------------+  +-----------------+
//!                    | MockPriceSource |  | YahooPriceSource|
//!                    +-----------------+  +-----------------+
//! ```
//!
//! A batched lookup returns only the tickers that could be priced. A missing
//! entry means "no price available for this ticker"; an `Err` means the
//! source itself failed and the caller should treat the whole lookup as
//! failed.

pub mod errors;
pub mod models;
pub mod provider;

pub use errors::{MarketDataError, RetryClass};
pub use models::PriceQuote;
pub use provider::{MockPriceSource, PriceSource, PriceSourceKind, YahooPriceSource};
