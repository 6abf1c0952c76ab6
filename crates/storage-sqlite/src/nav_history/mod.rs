//! SQLite storage implementation for the append-only NAV history.

mod model;
mod repository;

pub use model::NavHistoryDB;
pub use repository::NavHistoryRepository;
