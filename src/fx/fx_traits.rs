use super::fx_model::RateRecord;
use crate::errors::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

/// Trait defining the contract for rate-history persistence.
pub trait RateHistoryRepositoryTrait: Send + Sync {
    /// All records currently flagged latest, one per pair.
    fn latest_rates(&self) -> Result<Vec<RateRecord>>;
    /// All records observed after `since`, latest or not.
    fn recent_rates(&self, since: NaiveDateTime) -> Result<Vec<RateRecord>>;
    /// Flips the pair's previous latest record and inserts the new one
    /// in a single transaction.
    fn store_latest(&self, record: RateRecord) -> Result<RateRecord>;
    /// Plain insert for a dated observation.
    fn store_historical(&self, record: RateRecord) -> Result<RateRecord>;
}

/// Trait defining the rate-lookup operations exposed to workflow steps.
#[async_trait]
pub trait ForexServiceTrait: Send + Sync {
    async fn get_conversion_rate(
        &self,
        from: &str,
        to: &str,
        valid_within_hours: i32,
    ) -> Result<Decimal>;
    async fn get_conversion_rate_on(
        &self,
        from: &str,
        to: &str,
        date: NaiveDate,
    ) -> Result<Decimal>;
    async fn get_conversion_rate_first_of_month(
        &self,
        from: &str,
        to: &str,
        date: NaiveDate,
    ) -> Result<Decimal>;
    async fn convert(
        &self,
        from: &str,
        to: &str,
        amount: Decimal,
        valid_within_hours: i32,
    ) -> Result<Decimal>;
    async fn convert_on(
        &self,
        from: &str,
        to: &str,
        amount: Decimal,
        date: NaiveDate,
    ) -> Result<Decimal>;
    async fn convert_first_of_month(
        &self,
        from: &str,
        to: &str,
        amount: Decimal,
        date: NaiveDate,
    ) -> Result<Decimal>;
}
