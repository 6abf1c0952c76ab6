use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::SqliteConnection;
use log::debug;

use stratfolio_core::errors::{Error, Result};
use stratfolio_core::portfolio::{
    Portfolio, PortfolioRepositoryTrait, PortfolioSnapshot, Position,
};

use super::model::{PortfolioDB, PositionDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::nav_history::{NavHistoryDB, NavHistoryRepository};
use crate::schema::{portfolios, positions};

pub struct PortfolioRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl PortfolioRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl PortfolioRepositoryTrait for PortfolioRepository {
    async fn save_snapshot(&self, snapshot: PortfolioSnapshot) -> Result<()> {
        let portfolio_db = PortfolioDB::try_from(&snapshot.portfolio)?;
        let position_rows = snapshot
            .positions
            .iter()
            .map(PositionDB::try_from)
            .collect::<Result<Vec<_>>>()?;
        let nav_row = NavHistoryDB::from(snapshot.nav_entry);

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::insert_into(portfolios::table)
                    .values(&portfolio_db)
                    .on_conflict(portfolios::id)
                    .do_update()
                    .set(&portfolio_db)
                    .execute(conn)
                    .map_err(StorageError::from)?;

                let removed = diesel::delete(
                    positions::table.filter(positions::portfolio_id.eq(&portfolio_db.id)),
                )
                .execute(conn)
                .map_err(StorageError::from)?;

                if !position_rows.is_empty() {
                    diesel::insert_into(positions::table)
                        .values(&position_rows)
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }

                NavHistoryRepository::insert_entry(conn, nav_row)?;

                debug!(
                    "Saved portfolio {}: replaced {} positions with {}",
                    portfolio_db.id,
                    removed,
                    position_rows.len()
                );
                Ok(())
            })
            .await
    }

    fn get_portfolio(&self, portfolio_id: &str) -> Result<Portfolio> {
        let mut conn = get_connection(&self.pool)?;
        let row = portfolios::table
            .find(portfolio_id)
            .select(PortfolioDB::as_select())
            .first::<PortfolioDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .ok_or_else(|| Error::NotFound(format!("Portfolio {}", portfolio_id)))?;
        Portfolio::try_from(row)
    }

    fn list_portfolios(&self) -> Result<Vec<Portfolio>> {
        let mut conn = get_connection(&self.pool)?;
        portfolios::table
            .order((portfolios::created_at.asc(), portfolios::id.asc()))
            .select(PortfolioDB::as_select())
            .load::<PortfolioDB>(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(Portfolio::try_from)
            .collect()
    }

    fn get_positions(&self, portfolio_id: &str) -> Result<Vec<Position>> {
        let mut conn = get_connection(&self.pool)?;
        positions::table
            .filter(positions::portfolio_id.eq(portfolio_id))
            .order(positions::ticker.asc())
            .select(PositionDB::as_select())
            .load::<PositionDB>(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(Position::try_from)
            .collect()
    }

    async fn delete_portfolio(&self, portfolio_id: &str) -> Result<usize> {
        let id_owned = portfolio_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let affected = diesel::delete(portfolios::table.find(&id_owned))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(affected)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::spawn_writer;
    use crate::test_support::create_test_pool;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;
    use stratfolio_core::allocation::AllocationConstraints;
    use stratfolio_core::portfolio::{NavEntryKind, NavHistory, NavHistoryRepositoryTrait};

    async fn create_test_repository() -> (PortfolioRepository, NavHistoryRepository, tempfile::TempDir)
    {
        let (pool, temp_dir) = create_test_pool();
        let writer = spawn_writer((*pool).clone());
        let repo = PortfolioRepository::new(pool.clone(), writer.clone());
        let nav_repo = NavHistoryRepository::new(pool, writer);
        (repo, nav_repo, temp_dir)
    }

    fn portfolio(id: &str, total: rust_decimal::Decimal) -> Portfolio {
        let created = Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap();
        Portfolio {
            id: id.to_string(),
            user_id: "alice".to_string(),
            name: "Growth".to_string(),
            description: Some("Tech tilt".to_string()),
            total_investment: total,
            strategy_ids: vec!["s1".to_string(), "s2".to_string()],
            constraints: AllocationConstraints::new(dec!(25), dec!(100)),
            excluded_stock_ids: vec!["st-tsla".to_string()],
            created_at: created,
            updated_at: created,
        }
    }

    fn position(portfolio_id: &str, ticker: &str, quantity: u64, price: rust_decimal::Decimal) -> Position {
        let mut contrib = BTreeMap::new();
        contrib.insert("s1".to_string(), dec!(3600));
        contrib.insert("s2".to_string(), dec!(2400.25));
        Position {
            portfolio_id: portfolio_id.to_string(),
            stock_id: format!("st-{}", ticker.to_lowercase()),
            ticker: ticker.to_string(),
            quantity,
            entry_price: price,
            allocation_value: dec!(6000.25),
            strategy_contrib: contrib,
        }
    }

    fn nav(portfolio_id: &str, offset_days: i64, value: rust_decimal::Decimal, kind: NavEntryKind) -> NavHistory {
        NavHistory {
            portfolio_id: portfolio_id.to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap() + Duration::days(offset_days),
            nav: value,
            pnl: dec!(0),
            drawdown: dec!(0),
            kind,
        }
    }

    #[tokio::test]
    async fn test_snapshot_round_trips_portfolio_and_positions() {
        let (repo, nav_repo, _temp_dir) = create_test_repository().await;
        let snapshot = PortfolioSnapshot {
            portfolio: portfolio("p1", dec!(10000)),
            positions: vec![
                position("p1", "MSFT", 10, dec!(400)),
                position("p1", "AAPL", 39, dec!(150.50)),
            ],
            nav_entry: nav("p1", 0, dec!(10000), NavEntryKind::Initial),
        };

        repo.save_snapshot(snapshot.clone()).await.unwrap();

        let stored = repo.get_portfolio("p1").unwrap();
        assert_eq!(stored, snapshot.portfolio);

        let positions = repo.get_positions("p1").unwrap();
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[0].ticker, "AAPL");
        assert_eq!(positions[0], snapshot.positions[1]);
        assert_eq!(positions[1].strategy_contrib.get("s2"), Some(&dec!(2400.25)));

        let history = nav_repo.get_nav_history("p1", None, None).unwrap();
        assert_eq!(history, vec![snapshot.nav_entry]);
    }

    #[tokio::test]
    async fn test_rebalance_snapshot_replaces_positions() {
        let (repo, nav_repo, _temp_dir) = create_test_repository().await;
        repo.save_snapshot(PortfolioSnapshot {
            portfolio: portfolio("p1", dec!(10000)),
            positions: vec![
                position("p1", "AAPL", 39, dec!(150.50)),
                position("p1", "MSFT", 10, dec!(400)),
            ],
            nav_entry: nav("p1", 0, dec!(10000), NavEntryKind::Initial),
        })
        .await
        .unwrap();

        let mut rebalanced = portfolio("p1", dec!(12000));
        rebalanced.updated_at = rebalanced.created_at + Duration::days(3);
        repo.save_snapshot(PortfolioSnapshot {
            portfolio: rebalanced.clone(),
            positions: vec![position("p1", "GOOGL", 2, dec!(2800.75))],
            nav_entry: nav("p1", 3, dec!(12000), NavEntryKind::Rebalance),
        })
        .await
        .unwrap();

        let stored = repo.get_portfolio("p1").unwrap();
        assert_eq!(stored.total_investment, dec!(12000));
        assert_eq!(stored.updated_at, rebalanced.updated_at);
        assert_eq!(stored.created_at, rebalanced.created_at);

        let tickers: Vec<_> = repo
            .get_positions("p1")
            .unwrap()
            .into_iter()
            .map(|p| p.ticker)
            .collect();
        assert_eq!(tickers, vec!["GOOGL"]);

        let kinds: Vec<_> = nav_repo
            .get_nav_history("p1", None, None)
            .unwrap()
            .into_iter()
            .map(|h| h.kind)
            .collect();
        assert_eq!(kinds, vec![NavEntryKind::Initial, NavEntryKind::Rebalance]);
    }

    #[tokio::test]
    async fn test_failed_nav_insert_rolls_back_snapshot() {
        let (repo, _nav_repo, _temp_dir) = create_test_repository().await;
        repo.save_snapshot(PortfolioSnapshot {
            portfolio: portfolio("p1", dec!(10000)),
            positions: vec![position("p1", "AAPL", 39, dec!(150.50))],
            nav_entry: nav("p1", 0, dec!(10000), NavEntryKind::Initial),
        })
        .await
        .unwrap();

        // Same NAV timestamp collides with the existing entry.
        let result = repo
            .save_snapshot(PortfolioSnapshot {
                portfolio: portfolio("p1", dec!(20000)),
                positions: vec![],
                nav_entry: nav("p1", 0, dec!(20000), NavEntryKind::Rebalance),
            })
            .await;
        assert!(result.is_err());

        assert_eq!(repo.get_portfolio("p1").unwrap().total_investment, dec!(10000));
        assert_eq!(repo.get_positions("p1").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_portfolio_is_not_found() {
        let (repo, _nav_repo, _temp_dir) = create_test_repository().await;
        let err = repo.get_portfolio("missing").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(repo.get_positions("missing").unwrap().is_empty());
        assert!(repo.list_portfolios().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_cascades_to_positions_and_history() {
        let (repo, nav_repo, _temp_dir) = create_test_repository().await;
        for id in ["p1", "p2"] {
            repo.save_snapshot(PortfolioSnapshot {
                portfolio: portfolio(id, dec!(10000)),
                positions: vec![position(id, "AAPL", 39, dec!(150.50))],
                nav_entry: nav(id, 0, dec!(10000), NavEntryKind::Initial),
            })
            .await
            .unwrap();
        }

        assert_eq!(repo.delete_portfolio("p1").await.unwrap(), 1);
        assert_eq!(repo.delete_portfolio("p1").await.unwrap(), 0);

        assert!(repo.get_positions("p1").unwrap().is_empty());
        assert!(nav_repo.get_nav_history("p1", None, None).unwrap().is_empty());

        let remaining: Vec<_> = repo
            .list_portfolios()
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(remaining, vec!["p2"]);
        assert_eq!(repo.get_positions("p2").unwrap().len(), 1);
    }
}
