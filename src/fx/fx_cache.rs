use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{Duration, NaiveDate, NaiveDateTime};

use super::fx_model::RateRecord;
use super::fx_traits::RateHistoryRepositoryTrait;
use crate::errors::{Error, Result};

/// How far back the historical view reaches. Dated lookups older than
/// this window always go to the provider.
pub const HISTORICAL_WINDOW_DAYS: i64 = 90;

/// In-memory read-through views over the persisted rate history: the
/// latest record per pair, and every observation from the last 90 days.
/// Single-node semantics; refreshed once per resolution.
pub struct RateCache {
    latest: RwLock<HashMap<(String, String), RateRecord>>,
    recent: RwLock<Vec<RateRecord>>,
}

impl RateCache {
    pub fn new() -> Self {
        Self {
            latest: RwLock::new(HashMap::new()),
            recent: RwLock::new(Vec::new()),
        }
    }

    /// Rebuilds both views from storage.
    pub fn refresh(
        &self,
        repository: &dyn RateHistoryRepositoryTrait,
        now: NaiveDateTime,
    ) -> Result<()> {
        let latest_records = repository.latest_rates()?;
        let recent_records =
            repository.recent_rates(now - Duration::days(HISTORICAL_WINDOW_DAYS))?;

        let mut latest = self
            .latest
            .write()
            .map_err(|e| Error::Cache(e.to_string()))?;
        *latest = latest_records
            .into_iter()
            .map(|r| ((r.from_currency.clone(), r.to_currency.clone()), r))
            .collect();
        drop(latest);

        let mut recent = self
            .recent
            .write()
            .map_err(|e| Error::Cache(e.to_string()))?;
        *recent = recent_records;

        Ok(())
    }

    /// Cached latest rate for the pair, honoring the freshness window.
    /// The age check applies only when the window is strictly positive;
    /// a zero or negative window never reuses the cached record.
    pub fn fresh_latest(
        &self,
        from: &str,
        to: &str,
        valid_within_hours: i32,
        now: NaiveDateTime,
    ) -> Option<RateRecord> {
        let latest = self.latest.read().ok()?;
        let record = latest.get(&(from.to_string(), to.to_string()))?;

        if valid_within_hours > 0
            && record.as_of > now - Duration::hours(valid_within_hours as i64)
        {
            return Some(record.clone());
        }

        None
    }

    /// Cached observation for the exact calendar date, regardless of the
    /// time-of-day component. No freshness threshold.
    pub fn rate_on(&self, from: &str, to: &str, date: NaiveDate) -> Option<RateRecord> {
        let recent = self.recent.read().ok()?;
        recent
            .iter()
            .find(|r| {
                r.as_of.date() == date && r.from_currency == from && r.to_currency == to
            })
            .cloned()
    }

    /// Folds a freshly persisted record into both views so reads within
    /// the same resolution cycle observe it.
    pub fn record_stored(&self, record: &RateRecord) {
        if record.is_latest {
            if let Ok(mut latest) = self.latest.write() {
                latest.insert(
                    (record.from_currency.clone(), record.to_currency.clone()),
                    record.clone(),
                );
            }
        }

        if let Ok(mut recent) = self.recent.write() {
            recent.insert(0, record.clone());
        }
    }
}

impl Default for RateCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn latest_record(from: &str, to: &str, aged_hours: i64) -> RateRecord {
        let as_of = Utc::now().naive_utc() - Duration::hours(aged_hours);
        RateRecord::new_latest(from, to, dec!(0.92), as_of)
    }

    #[test]
    fn fresh_record_hits_within_window() {
        let cache = RateCache::new();
        cache.record_stored(&latest_record("USD", "EUR", 1));

        let now = Utc::now().naive_utc();
        let hit = cache.fresh_latest("USD", "EUR", 24, now);
        assert_eq!(hit.map(|r| r.rate), Some(dec!(0.92)));
    }

    #[test]
    fn stale_record_misses() {
        let cache = RateCache::new();
        cache.record_stored(&latest_record("USD", "EUR", 30));

        let now = Utc::now().naive_utc();
        assert!(cache.fresh_latest("USD", "EUR", 24, now).is_none());
    }

    #[test]
    fn zero_or_negative_window_never_reuses() {
        let cache = RateCache::new();
        cache.record_stored(&latest_record("USD", "EUR", 1));

        let now = Utc::now().naive_utc();
        assert!(cache.fresh_latest("USD", "EUR", 0, now).is_none());
        assert!(cache.fresh_latest("USD", "EUR", -5, now).is_none());
    }

    #[test]
    fn unknown_pair_misses() {
        let cache = RateCache::new();
        cache.record_stored(&latest_record("USD", "EUR", 1));

        let now = Utc::now().naive_utc();
        assert!(cache.fresh_latest("EUR", "USD", 24, now).is_none());
    }

    #[test]
    fn historical_lookup_matches_calendar_date_only() {
        let cache = RateCache::new();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        // Stored mid-afternoon; the lookup goes by calendar date.
        let mut record = RateRecord::new_historical("USD", "EUR", dec!(0.9), date);
        record.as_of = date.and_hms_opt(15, 30, 0).unwrap();
        cache.record_stored(&record);

        assert!(cache.rate_on("USD", "EUR", date).is_some());
        assert!(cache
            .rate_on("USD", "EUR", date + Duration::days(1))
            .is_none());
        assert!(cache.rate_on("EUR", "USD", date).is_none());
    }
}
