//! Fixtures for repository tests: a migrated database in a temp directory
//! and seeders for the tables the engine only reads.

use std::sync::Arc;

use diesel::prelude::*;
use tempfile::{tempdir, TempDir};

use crate::db::{create_pool, get_connection, run_migrations, DbPool};
use crate::schema::{signals, stocks, strategies, strategy_stocks};
use crate::strategies::{SignalDB, StockDB, StrategyDB, StrategyStockDB};

pub fn create_test_pool() -> (Arc<DbPool>, TempDir) {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let db_path_str = db_path.to_string_lossy().to_string();

    let pool = create_pool(&db_path_str).expect("Failed to create pool");
    run_migrations(&pool).expect("Failed to run migrations");
    (pool, temp_dir)
}

pub fn seed_stock(pool: &DbPool, id: &str, ticker: &str) {
    let mut conn = get_connection(pool).unwrap();
    diesel::insert_into(stocks::table)
        .values(StockDB {
            id: id.to_string(),
            ticker: ticker.to_string(),
            name: format!("{} Inc.", ticker),
        })
        .execute(&mut conn)
        .unwrap();
}

pub fn seed_strategy(
    pool: &DbPool,
    id: &str,
    user_id: &str,
    weight_mode: &str,
    weight_value: &str,
    created_at: &str,
) {
    let mut conn = get_connection(pool).unwrap();
    diesel::insert_into(strategies::table)
        .values(StrategyDB {
            id: id.to_string(),
            user_id: user_id.to_string(),
            name: format!("Strategy {}", id),
            weight_mode: weight_mode.to_string(),
            weight_value: weight_value.to_string(),
            created_at: created_at.to_string(),
        })
        .execute(&mut conn)
        .unwrap();
}

pub fn seed_membership(pool: &DbPool, strategy_id: &str, stock_id: &str, eligible: bool) {
    let mut conn = get_connection(pool).unwrap();
    diesel::insert_into(strategy_stocks::table)
        .values(StrategyStockDB {
            strategy_id: strategy_id.to_string(),
            stock_id: stock_id.to_string(),
            eligible,
        })
        .execute(&mut conn)
        .unwrap();
}

pub fn seed_signal(pool: &DbPool, id: &str, stock_id: &str, signal: &str, signal_date: &str) {
    let mut conn = get_connection(pool).unwrap();
    diesel::insert_into(signals::table)
        .values(SignalDB {
            id: id.to_string(),
            stock_id: stock_id.to_string(),
            signal: signal.to_string(),
            signal_date: signal_date.to_string(),
            created_at: format!("{}T00:00:00.000000Z", signal_date),
        })
        .execute(&mut conn)
        .unwrap();
}
