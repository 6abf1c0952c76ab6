//! Database models for strategies, stocks, memberships and signals.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use stratfolio_core::errors::{DatabaseError, Error, Result};
use stratfolio_core::strategies::{Signal, StockSignal, Strategy, StrategyStock, WeightMode};

use crate::utils::{text_to_date, text_to_decimal, text_to_timestamp};

#[derive(Queryable, Selectable, Insertable, PartialEq, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::stocks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct StockDB {
    pub id: String,
    pub ticker: String,
    pub name: String,
}

#[derive(Queryable, Selectable, Insertable, PartialEq, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::strategies)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct StrategyDB {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub weight_mode: String,
    pub weight_value: String,
    pub created_at: String,
}

#[derive(Queryable, Selectable, Insertable, PartialEq, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::strategy_stocks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct StrategyStockDB {
    pub strategy_id: String,
    pub stock_id: String,
    pub eligible: bool,
}

#[derive(Queryable, Selectable, Insertable, PartialEq, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::signals)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct SignalDB {
    pub id: String,
    pub stock_id: String,
    pub signal: String,
    pub signal_date: String,
    pub created_at: String,
}

impl From<StockDB> for stratfolio_core::strategies::Stock {
    fn from(db: StockDB) -> Self {
        Self {
            id: db.id,
            ticker: db.ticker,
            name: db.name,
        }
    }
}

impl TryFrom<SignalDB> for StockSignal {
    type Error = Error;

    fn try_from(db: SignalDB) -> Result<Self> {
        let signal: Signal = db
            .signal
            .parse()
            .map_err(|e: String| Error::Database(DatabaseError::Internal(e)))?;
        Ok(Self {
            signal,
            signal_date: text_to_date("signal_date", &db.signal_date),
        })
    }
}

impl StrategyDB {
    /// Builds the domain strategy with its resolved memberships.
    pub fn into_domain(self, stocks: Vec<StrategyStock>) -> Result<Strategy> {
        let weight_mode: WeightMode = self
            .weight_mode
            .parse()
            .map_err(|e: String| Error::Database(DatabaseError::Internal(e)))?;
        Ok(Strategy {
            weight_value: text_to_decimal("weight_value", &self.weight_value),
            created_at: text_to_timestamp("created_at", &self.created_at),
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            weight_mode,
            stocks,
        })
    }
}
