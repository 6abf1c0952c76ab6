use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::SqliteConnection;

use stratfolio_core::portfolio::{NavHistory, NavHistoryRepositoryTrait};
use stratfolio_core::Result;

use super::model::NavHistoryDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::nav_history;
use crate::utils::timestamp_to_text;

pub struct NavHistoryRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl NavHistoryRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }

    /// Shared with the portfolio repository so a snapshot save can append its
    /// entry inside the same transaction.
    pub(crate) fn insert_entry(conn: &mut SqliteConnection, entry: NavHistoryDB) -> Result<()> {
        diesel::insert_into(nav_history::table)
            .values(&entry)
            .execute(conn)
            .map_err(StorageError::from)?;
        Ok(())
    }
}

#[async_trait]
impl NavHistoryRepositoryTrait for NavHistoryRepository {
    async fn append_nav_history(&self, entry: NavHistory) -> Result<()> {
        let row = NavHistoryDB::from(entry);
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                Self::insert_entry(conn, row)
            })
            .await
    }

    fn get_nav_history(
        &self,
        portfolio_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<NavHistory>> {
        let mut conn = get_connection(&self.pool)?;

        let mut query = nav_history::table
            .filter(nav_history::portfolio_id.eq(portfolio_id))
            .into_boxed();
        if let Some(from) = from {
            query = query.filter(nav_history::timestamp.ge(timestamp_to_text(from)));
        }
        if let Some(to) = to {
            query = query.filter(nav_history::timestamp.le(timestamp_to_text(to)));
        }

        let rows = query
            .order(nav_history::timestamp.asc())
            .select(NavHistoryDB::as_select())
            .load::<NavHistoryDB>(&mut conn)
            .map_err(StorageError::from)?;

        rows.into_iter().map(NavHistory::try_from).collect()
    }
}
