//! SQLite storage implementation for strategies, stock eligibility and signals.

mod model;
mod repository;

pub use model::{SignalDB, StockDB, StrategyDB, StrategyStockDB};
pub use repository::StrategyRepository;
