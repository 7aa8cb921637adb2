use chrono::{NaiveDate, NaiveDateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One observed exchange rate: `to_amount = from_amount * rate`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RateRecord {
    pub id: String,
    pub from_currency: String,
    pub to_currency: String,
    pub rate: Decimal,
    pub as_of: NaiveDateTime,
    pub is_latest: bool,
    pub created_at: NaiveDateTime,
}

impl RateRecord {
    /// A current-rate observation. At most one record per pair carries
    /// `is_latest`; storing a new one supersedes the previous holder.
    pub fn new_latest(from: &str, to: &str, rate: Decimal, as_of: NaiveDateTime) -> Self {
        let now = Utc::now().naive_utc();
        RateRecord {
            id: uuid::Uuid::new_v4().to_string(),
            from_currency: from.to_string(),
            to_currency: to.to_string(),
            rate,
            as_of,
            is_latest: true,
            created_at: now,
        }
    }

    /// A dated observation, stored at midnight of the requested day and
    /// never marked latest.
    pub fn new_historical(from: &str, to: &str, rate: Decimal, as_of_date: NaiveDate) -> Self {
        let now = Utc::now().naive_utc();
        RateRecord {
            id: uuid::Uuid::new_v4().to_string(),
            from_currency: from.to_string(),
            to_currency: to.to_string(),
            rate,
            as_of: as_of_date.and_hms_opt(0, 0, 0).unwrap(),
            is_latest: false,
            created_at: now,
        }
    }
}

#[derive(Queryable, Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::fx_rate_history)]
pub struct RateRecordDB {
    pub id: String,
    pub from_currency: String,
    pub to_currency: String,
    pub rate: String,
    pub as_of: NaiveDateTime,
    pub is_latest: bool,
    pub created_at: NaiveDateTime,
}

impl From<RateRecordDB> for RateRecord {
    fn from(db: RateRecordDB) -> Self {
        RateRecord {
            id: db.id,
            from_currency: db.from_currency,
            to_currency: db.to_currency,
            rate: Decimal::from_str(&db.rate).unwrap_or_default(),
            as_of: db.as_of,
            is_latest: db.is_latest,
            created_at: db.created_at,
        }
    }
}

impl From<&RateRecord> for RateRecordDB {
    fn from(record: &RateRecord) -> Self {
        RateRecordDB {
            id: record.id.clone(),
            from_currency: record.from_currency.clone(),
            to_currency: record.to_currency.clone(),
            rate: record.rate.to_string(),
            as_of: record.as_of,
            is_latest: record.is_latest,
            created_at: record.created_at,
        }
    }
}
