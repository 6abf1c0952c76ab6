//! SQLite storage implementation for portfolios and their positions.

mod model;
mod repository;

pub use model::{PortfolioDB, PositionDB};
pub use repository::PortfolioRepository;
