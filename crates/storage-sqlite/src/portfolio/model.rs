//! Database models for portfolios and positions.

use std::collections::BTreeMap;

use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stratfolio_core::allocation::AllocationConstraints;
use stratfolio_core::errors::{DatabaseError, Error, Result};
use stratfolio_core::portfolio::{Portfolio, Position};

use crate::errors::StorageError;
use crate::utils::{decimal_to_text, text_to_decimal, text_to_timestamp, timestamp_to_text};

#[derive(
    Queryable, Selectable, Insertable, AsChangeset, PartialEq, Serialize, Deserialize, Debug, Clone,
)]
#[diesel(table_name = crate::schema::portfolios)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioDB {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub total_investment: String,
    /// JSON array of strategy ids
    pub strategy_ids: String,
    pub max_allocation_per_stock: String,
    pub min_allocation_amount: String,
    /// JSON array of stock ids
    pub excluded_stock_ids: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Queryable, Selectable, Insertable, PartialEq, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::positions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct PositionDB {
    pub portfolio_id: String,
    pub stock_id: String,
    pub ticker: String,
    pub quantity: i64,
    pub entry_price: String,
    pub allocation_value: String,
    /// JSON object of strategy id to contributed amount
    pub strategy_contrib: String,
}

impl TryFrom<&Portfolio> for PortfolioDB {
    type Error = Error;

    fn try_from(portfolio: &Portfolio) -> Result<Self> {
        Ok(Self {
            id: portfolio.id.clone(),
            user_id: portfolio.user_id.clone(),
            name: portfolio.name.clone(),
            description: portfolio.description.clone(),
            total_investment: decimal_to_text(portfolio.total_investment),
            strategy_ids: serde_json::to_string(&portfolio.strategy_ids)
                .map_err(StorageError::from)?,
            max_allocation_per_stock: decimal_to_text(
                portfolio.constraints.max_allocation_per_stock,
            ),
            min_allocation_amount: decimal_to_text(portfolio.constraints.min_allocation_amount),
            excluded_stock_ids: serde_json::to_string(&portfolio.excluded_stock_ids)
                .map_err(StorageError::from)?,
            created_at: timestamp_to_text(portfolio.created_at),
            updated_at: timestamp_to_text(portfolio.updated_at),
        })
    }
}

impl TryFrom<PortfolioDB> for Portfolio {
    type Error = Error;

    fn try_from(db: PortfolioDB) -> Result<Self> {
        let strategy_ids: Vec<String> =
            serde_json::from_str(&db.strategy_ids).map_err(StorageError::from)?;
        let excluded_stock_ids: Vec<String> =
            serde_json::from_str(&db.excluded_stock_ids).map_err(StorageError::from)?;

        Ok(Self {
            total_investment: text_to_decimal("total_investment", &db.total_investment),
            constraints: AllocationConstraints::new(
                text_to_decimal("max_allocation_per_stock", &db.max_allocation_per_stock),
                text_to_decimal("min_allocation_amount", &db.min_allocation_amount),
            ),
            created_at: text_to_timestamp("created_at", &db.created_at),
            updated_at: text_to_timestamp("updated_at", &db.updated_at),
            id: db.id,
            user_id: db.user_id,
            name: db.name,
            description: db.description,
            strategy_ids,
            excluded_stock_ids,
        })
    }
}

impl TryFrom<&Position> for PositionDB {
    type Error = Error;

    fn try_from(position: &Position) -> Result<Self> {
        let quantity = i64::try_from(position.quantity).map_err(|_| {
            Error::Database(DatabaseError::Internal(format!(
                "quantity {} for {} does not fit in a database integer",
                position.quantity, position.ticker
            )))
        })?;
        let contrib: BTreeMap<&String, String> = position
            .strategy_contrib
            .iter()
            .map(|(id, value)| (id, decimal_to_text(*value)))
            .collect();

        Ok(Self {
            portfolio_id: position.portfolio_id.clone(),
            stock_id: position.stock_id.clone(),
            ticker: position.ticker.clone(),
            quantity,
            entry_price: decimal_to_text(position.entry_price),
            allocation_value: decimal_to_text(position.allocation_value),
            strategy_contrib: serde_json::to_string(&contrib).map_err(StorageError::from)?,
        })
    }
}

impl TryFrom<PositionDB> for Position {
    type Error = Error;

    fn try_from(db: PositionDB) -> Result<Self> {
        let contrib: BTreeMap<String, String> =
            serde_json::from_str(&db.strategy_contrib).map_err(StorageError::from)?;
        let quantity = u64::try_from(db.quantity).map_err(|_| {
            Error::Database(DatabaseError::Internal(format!(
                "negative quantity {} stored for {}",
                db.quantity, db.ticker
            )))
        })?;

        Ok(Self {
            entry_price: text_to_decimal("entry_price", &db.entry_price),
            allocation_value: text_to_decimal("allocation_value", &db.allocation_value),
            strategy_contrib: contrib
                .into_iter()
                .map(|(id, value)| {
                    let amount: Decimal = text_to_decimal("strategy_contrib", &value);
                    (id, amount)
                })
                .collect(),
            portfolio_id: db.portfolio_id,
            stock_id: db.stock_id,
            ticker: db.ticker,
            quantity,
        })
    }
}
