use std::sync::Arc;

use chrono::NaiveDateTime;
use diesel::prelude::*;
use log::error;

use super::fx_model::{RateRecord, RateRecordDB};
use super::fx_traits::RateHistoryRepositoryTrait;
use crate::db::{get_connection, DbPool};
use crate::errors::{Error, Result};
use crate::schema::fx_rate_history;

pub struct RateHistoryRepository {
    pool: Arc<DbPool>,
}

impl RateHistoryRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

impl RateHistoryRepositoryTrait for RateHistoryRepository {
    fn latest_rates(&self) -> Result<Vec<RateRecord>> {
        let mut conn = get_connection(&self.pool)?;

        let records = fx_rate_history::table
            .filter(fx_rate_history::is_latest.eq(true))
            .order_by((
                fx_rate_history::from_currency.asc(),
                fx_rate_history::to_currency.asc(),
            ))
            .load::<RateRecordDB>(&mut conn)?;

        Ok(records.into_iter().map(RateRecord::from).collect())
    }

    fn recent_rates(&self, since: NaiveDateTime) -> Result<Vec<RateRecord>> {
        let mut conn = get_connection(&self.pool)?;

        let records = fx_rate_history::table
            .filter(fx_rate_history::as_of.gt(since))
            .order_by(fx_rate_history::as_of.desc())
            .load::<RateRecordDB>(&mut conn)?;

        Ok(records.into_iter().map(RateRecord::from).collect())
    }

    fn store_latest(&self, record: RateRecord) -> Result<RateRecord> {
        let mut conn = get_connection(&self.pool)?;

        // Flip and insert atomically so the pair never holds zero or two
        // latest records.
        conn.transaction::<_, Error, _>(|conn| {
            diesel::update(
                fx_rate_history::table
                    .filter(fx_rate_history::from_currency.eq(&record.from_currency))
                    .filter(fx_rate_history::to_currency.eq(&record.to_currency))
                    .filter(fx_rate_history::is_latest.eq(true)),
            )
            .set(fx_rate_history::is_latest.eq(false))
            .execute(conn)?;

            diesel::insert_into(fx_rate_history::table)
                .values(RateRecordDB::from(&record))
                .execute(conn)?;

            Ok(())
        })
        .map_err(|e| {
            error!(
                "Failed to store latest rate for {}/{}: {}",
                record.from_currency, record.to_currency, e
            );
            e
        })?;

        Ok(record)
    }

    fn store_historical(&self, record: RateRecord) -> Result<RateRecord> {
        let mut conn = get_connection(&self.pool)?;

        diesel::insert_into(fx_rate_history::table)
            .values(RateRecordDB::from(&record))
            .execute(&mut conn)
            .map_err(|e| {
                error!(
                    "Failed to store historical rate for {}/{} on {}: {}",
                    record.from_currency, record.to_currency, record.as_of, e
                );
                Error::from(e)
            })?;

        Ok(record)
    }
}
