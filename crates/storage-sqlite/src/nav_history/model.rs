use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use stratfolio_core::errors::{DatabaseError, Error, Result};
use stratfolio_core::portfolio::{NavEntryKind, NavHistory};

use crate::utils::{decimal_to_text, text_to_decimal, text_to_timestamp, timestamp_to_text};

#[derive(Queryable, Selectable, Insertable, PartialEq, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::nav_history)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct NavHistoryDB {
    pub portfolio_id: String,
    pub timestamp: String,
    pub nav: String,
    pub pnl: String,
    pub drawdown: String,
    pub kind: String,
}

impl From<NavHistory> for NavHistoryDB {
    fn from(entry: NavHistory) -> Self {
        Self {
            portfolio_id: entry.portfolio_id,
            timestamp: timestamp_to_text(entry.timestamp),
            nav: decimal_to_text(entry.nav),
            pnl: decimal_to_text(entry.pnl),
            drawdown: decimal_to_text(entry.drawdown),
            kind: entry.kind.as_str().to_string(),
        }
    }
}

impl TryFrom<NavHistoryDB> for NavHistory {
    type Error = Error;

    fn try_from(db: NavHistoryDB) -> Result<Self> {
        let kind: NavEntryKind = db
            .kind
            .parse()
            .map_err(|e: String| Error::Database(DatabaseError::Internal(e)))?;
        Ok(Self {
            timestamp: text_to_timestamp("timestamp", &db.timestamp),
            nav: text_to_decimal("nav", &db.nav),
            pnl: text_to_decimal("pnl", &db.pnl),
            drawdown: text_to_decimal("drawdown", &db.drawdown),
            portfolio_id: db.portfolio_id,
            kind,
        })
    }
}
