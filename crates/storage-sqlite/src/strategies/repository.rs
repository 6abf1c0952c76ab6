use std::collections::HashMap;
use std::sync::Arc;

use diesel::prelude::*;
use diesel::SqliteConnection;
use log::debug;

use stratfolio_core::strategies::{
    latest_signal, Stock, StockSignal, Strategy, StrategyRepositoryTrait, StrategyStock,
};
use stratfolio_core::Result;

use super::model::{SignalDB, StockDB, StrategyDB, StrategyStockDB};
use crate::db::{get_connection, DbPool};
use crate::errors::StorageError;
use crate::schema::{signals, stocks, strategies, strategy_stocks};
use crate::utils::chunk_for_sqlite;

/// Read-only access to strategies. Memberships carry the latest signal of
/// each stock, resolved by signal date.
pub struct StrategyRepository {
    pool: Arc<DbPool>,
}

impl StrategyRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        StrategyRepository { pool }
    }

    fn assemble(conn: &mut SqliteConnection, rows: Vec<StrategyDB>) -> Result<Vec<Strategy>> {
        let strategy_ids: Vec<String> = rows.iter().map(|s| s.id.clone()).collect();

        let mut memberships: Vec<(StrategyStockDB, StockDB)> = Vec::new();
        for chunk in chunk_for_sqlite(&strategy_ids) {
            let loaded = strategy_stocks::table
                .inner_join(stocks::table)
                .filter(strategy_stocks::strategy_id.eq_any(chunk))
                .order((strategy_stocks::strategy_id.asc(), stocks::ticker.asc()))
                .select((StrategyStockDB::as_select(), StockDB::as_select()))
                .load::<(StrategyStockDB, StockDB)>(conn)
                .map_err(StorageError::from)?;
            memberships.extend(loaded);
        }

        let mut stock_ids: Vec<String> = memberships.iter().map(|(m, _)| m.stock_id.clone()).collect();
        stock_ids.sort();
        stock_ids.dedup();

        let mut signals_by_stock: HashMap<String, Vec<StockSignal>> = HashMap::new();
        for chunk in chunk_for_sqlite(&stock_ids) {
            let loaded = signals::table
                .filter(signals::stock_id.eq_any(chunk))
                .order((signals::signal_date.asc(), signals::created_at.asc()))
                .select(SignalDB::as_select())
                .load::<SignalDB>(conn)
                .map_err(StorageError::from)?;
            for row in loaded {
                let stock_id = row.stock_id.clone();
                signals_by_stock
                    .entry(stock_id)
                    .or_default()
                    .push(StockSignal::try_from(row)?);
            }
        }

        let mut stocks_by_strategy: HashMap<String, Vec<StrategyStock>> = HashMap::new();
        for (membership, stock) in memberships {
            let signal = signals_by_stock
                .get(&membership.stock_id)
                .and_then(|all| latest_signal(all))
                .cloned();
            stocks_by_strategy
                .entry(membership.strategy_id)
                .or_default()
                .push(StrategyStock {
                    stock: Stock::from(stock),
                    eligible: membership.eligible,
                    signal,
                });
        }

        debug!(
            "Loaded {} strategies with {} distinct stocks",
            rows.len(),
            stock_ids.len()
        );

        rows.into_iter()
            .map(|row| {
                let members = stocks_by_strategy.remove(&row.id).unwrap_or_default();
                row.into_domain(members)
            })
            .collect()
    }
}

impl StrategyRepositoryTrait for StrategyRepository {
    fn get_strategies_for_user(&self, owner_id: &str) -> Result<Vec<Strategy>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = strategies::table
            .filter(strategies::user_id.eq(owner_id))
            .order((strategies::created_at.asc(), strategies::id.asc()))
            .select(StrategyDB::as_select())
            .load::<StrategyDB>(&mut conn)
            .map_err(StorageError::from)?;
        Self::assemble(&mut conn, rows)
    }

    fn get_strategies_by_ids(&self, strategy_ids: &[String]) -> Result<Vec<Strategy>> {
        let mut conn = get_connection(&self.pool)?;
        let mut rows = Vec::with_capacity(strategy_ids.len());
        for chunk in chunk_for_sqlite(strategy_ids) {
            let loaded = strategies::table
                .filter(strategies::id.eq_any(chunk))
                .select(StrategyDB::as_select())
                .load::<StrategyDB>(&mut conn)
                .map_err(StorageError::from)?;
            rows.extend(loaded);
        }
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Self::assemble(&mut conn, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{create_test_pool, seed_membership, seed_signal, seed_stock, seed_strategy};
    use rust_decimal_macros::dec;
    use stratfolio_core::strategies::{Signal, WeightMode};

    #[test]
    fn test_strategies_carry_latest_signal_and_eligibility() {
        let (pool, _temp_dir) = create_test_pool();
        seed_stock(&pool, "st-aapl", "AAPL");
        seed_stock(&pool, "st-msft", "MSFT");
        seed_strategy(&pool, "s1", "alice", "percent", "60", "2024-01-01T00:00:00.000000Z");
        seed_membership(&pool, "s1", "st-aapl", true);
        seed_membership(&pool, "s1", "st-msft", false);
        seed_signal(&pool, "sig-1", "st-aapl", "BUY", "2024-03-01");
        seed_signal(&pool, "sig-2", "st-aapl", "HOLD", "2024-05-01");
        seed_signal(&pool, "sig-3", "st-aapl", "BUY", "2024-04-01");
        seed_signal(&pool, "sig-4", "st-msft", "BUY", "2024-05-01");

        let repo = StrategyRepository::new(pool);
        let strategies = repo.get_strategies_for_user("alice").unwrap();

        assert_eq!(strategies.len(), 1);
        let s1 = &strategies[0];
        assert_eq!(s1.weight_mode, WeightMode::Percent);
        assert_eq!(s1.weight_value, dec!(60));
        assert_eq!(s1.stocks.len(), 2);

        let aapl = s1.stocks.iter().find(|m| m.stock.ticker == "AAPL").unwrap();
        assert_eq!(aapl.signal.as_ref().unwrap().signal, Signal::Hold);
        assert!(!aapl.is_candidate());

        let msft = s1.stocks.iter().find(|m| m.stock.ticker == "MSFT").unwrap();
        assert!(!msft.eligible);
        assert_eq!(s1.candidates().count(), 0);
    }

    #[test]
    fn test_eligibility_is_per_strategy() {
        let (pool, _temp_dir) = create_test_pool();
        seed_stock(&pool, "st-aapl", "AAPL");
        seed_strategy(&pool, "s1", "alice", "percent", "50", "2024-01-01T00:00:00.000000Z");
        seed_strategy(&pool, "s2", "alice", "budget", "2500.50", "2024-01-02T00:00:00.000000Z");
        seed_membership(&pool, "s1", "st-aapl", true);
        seed_membership(&pool, "s2", "st-aapl", false);
        seed_signal(&pool, "sig-1", "st-aapl", "BUY", "2024-03-01");

        let repo = StrategyRepository::new(pool);
        let strategies = repo
            .get_strategies_by_ids(&["s2".to_string(), "s1".to_string()])
            .unwrap();

        let ids: Vec<_> = strategies.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2"]);
        assert_eq!(strategies[0].candidates().count(), 1);
        assert_eq!(strategies[1].candidates().count(), 0);
        assert_eq!(strategies[1].weight_mode, WeightMode::Budget);
        assert_eq!(strategies[1].weight_value, dec!(2500.50));
    }

    #[test]
    fn test_unknown_ids_and_users_yield_nothing() {
        let (pool, _temp_dir) = create_test_pool();
        seed_strategy(&pool, "s1", "alice", "percent", "50", "2024-01-01T00:00:00.000000Z");

        let repo = StrategyRepository::new(pool);
        assert!(repo.get_strategies_for_user("bob").unwrap().is_empty());
        assert!(repo
            .get_strategies_by_ids(&["missing".to_string()])
            .unwrap()
            .is_empty());
        let s1 = repo.get_strategies_by_ids(&["s1".to_string()]).unwrap();
        assert!(s1[0].stocks.is_empty());
    }
}
