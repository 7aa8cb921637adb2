use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use log::debug;
use rust_decimal::Decimal;

use super::fx_cache::RateCache;
use super::fx_model::RateRecord;
use super::fx_traits::{ForexServiceTrait, RateHistoryRepositoryTrait};
use crate::errors::{Result, ValidationError};
use crate::providers::{select_provider, RateProvider};
use crate::settings::SettingsRepositoryTrait;

/// Default freshness window for current-rate lookups, in hours.
pub const DEFAULT_VALID_WITHIN_HOURS: i32 = 24;

/// Façade over the cache, the provider clients, and the rate history.
/// Settings are read fresh and the provider re-selected on every call.
pub struct ForexService {
    settings: Arc<dyn SettingsRepositoryTrait>,
    repository: Arc<dyn RateHistoryRepositoryTrait>,
    cache: RateCache,
}

impl ForexService {
    pub fn new(
        settings: Arc<dyn SettingsRepositoryTrait>,
        repository: Arc<dyn RateHistoryRepositoryTrait>,
    ) -> Self {
        Self {
            settings,
            repository,
            cache: RateCache::new(),
        }
    }

    fn validate_codes(from: &str, to: &str) -> Result<()> {
        if from.is_empty() {
            return Err(
                ValidationError::InvalidInput("Source currency cannot be empty".to_string()).into(),
            );
        }
        if to.is_empty() {
            return Err(ValidationError::InvalidInput(
                "Destination currency cannot be empty".to_string(),
            )
            .into());
        }
        Ok(())
    }

    async fn resolve_current(
        &self,
        provider: &dyn RateProvider,
        from: &str,
        to: &str,
        valid_within_hours: i32,
    ) -> Result<Decimal> {
        let now = Utc::now().naive_utc();
        self.cache.refresh(self.repository.as_ref(), now)?;

        if let Some(hit) = self.cache.fresh_latest(from, to, valid_within_hours, now) {
            debug!("Serving {}/{} from the latest-rate cache", from, to);
            return Ok(hit.rate);
        }

        let rate = provider.latest_rate(from, to).await?;
        let record = self
            .repository
            .store_latest(RateRecord::new_latest(from, to, rate, now))?;
        self.cache.record_stored(&record);

        Ok(record.rate)
    }

    async fn resolve_on(
        &self,
        provider: &dyn RateProvider,
        from: &str,
        to: &str,
        date: NaiveDate,
    ) -> Result<Decimal> {
        let now = Utc::now().naive_utc();
        self.cache.refresh(self.repository.as_ref(), now)?;

        if let Some(hit) = self.cache.rate_on(from, to, date) {
            debug!("Serving {}/{} on {} from the historical cache", from, to, date);
            return Ok(hit.rate);
        }

        let rate = provider.historical_rate(from, to, date).await?;
        let record = self
            .repository
            .store_historical(RateRecord::new_historical(from, to, rate, date))?;
        self.cache.record_stored(&record);

        Ok(record.rate)
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    use chrono::Datelike;
    date.with_day(1).unwrap()
}

#[async_trait]
impl ForexServiceTrait for ForexService {
    async fn get_conversion_rate(
        &self,
        from: &str,
        to: &str,
        valid_within_hours: i32,
    ) -> Result<Decimal> {
        Self::validate_codes(from, to)?;

        let settings = self.settings.get_settings()?;
        let provider = select_provider(&settings);
        let to = provider.normalize_destination(to);

        self.resolve_current(&provider, from, to, valid_within_hours)
            .await
    }

    async fn get_conversion_rate_on(
        &self,
        from: &str,
        to: &str,
        date: NaiveDate,
    ) -> Result<Decimal> {
        Self::validate_codes(from, to)?;

        let settings = self.settings.get_settings()?;
        let provider = select_provider(&settings);
        let to = provider.normalize_destination(to);

        self.resolve_on(&provider, from, to, date).await
    }

    async fn get_conversion_rate_first_of_month(
        &self,
        from: &str,
        to: &str,
        date: NaiveDate,
    ) -> Result<Decimal> {
        self.get_conversion_rate_on(from, to, first_of_month(date))
            .await
    }

    async fn convert(
        &self,
        from: &str,
        to: &str,
        amount: Decimal,
        valid_within_hours: i32,
    ) -> Result<Decimal> {
        let rate = self
            .get_conversion_rate(from, to, valid_within_hours)
            .await?;
        Ok(amount * rate)
    }

    async fn convert_on(
        &self,
        from: &str,
        to: &str,
        amount: Decimal,
        date: NaiveDate,
    ) -> Result<Decimal> {
        let rate = self.get_conversion_rate_on(from, to, date).await?;
        Ok(amount * rate)
    }

    async fn convert_first_of_month(
        &self,
        from: &str,
        to: &str,
        amount: Decimal,
        date: NaiveDate,
    ) -> Result<Decimal> {
        let rate = self
            .get_conversion_rate_first_of_month(from, to, date)
            .await?;
        Ok(amount * rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::errors::{Error, ProviderError};
    use crate::fx::fx_repository::RateHistoryRepository;
    use crate::settings::SettingsRepository;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    struct FixedProvider {
        rate: Decimal,
    }

    #[async_trait]
    impl RateProvider for FixedProvider {
        fn name(&self) -> &'static str {
            "FIXED"
        }

        async fn latest_rate(&self, _from: &str, _to: &str) -> Result<Decimal> {
            Ok(self.rate)
        }

        async fn historical_rate(
            &self,
            _from: &str,
            _to: &str,
            _date: NaiveDate,
        ) -> Result<Decimal> {
            Ok(self.rate)
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl RateProvider for FailingProvider {
        fn name(&self) -> &'static str {
            "FAILING"
        }

        async fn latest_rate(&self, _from: &str, _to: &str) -> Result<Decimal> {
            Err(ProviderError::Api("Invalid access key".to_string()).into())
        }

        async fn historical_rate(
            &self,
            _from: &str,
            _to: &str,
            _date: NaiveDate,
        ) -> Result<Decimal> {
            Err(ProviderError::Api("Invalid access key".to_string()).into())
        }
    }

    fn setup() -> (TempDir, ForexService, Arc<RateHistoryRepository>) {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("fx.db");
        let db_path = db_path.to_str().unwrap();

        db::init(db_path).unwrap();
        let pool = db::create_pool(db_path).unwrap();
        db::run_migrations(&pool).unwrap();

        let repository = Arc::new(RateHistoryRepository::new(pool.clone()));
        let settings = Arc::new(SettingsRepository::new(pool));
        let service = ForexService::new(settings, repository.clone());

        (dir, service, repository)
    }

    #[tokio::test]
    async fn miss_fetches_and_persists_one_latest_record() {
        let (_dir, service, repository) = setup();
        let provider = FixedProvider { rate: dec!(0.92) };

        let rate = service
            .resolve_current(&provider, "USD", "EUR", 24)
            .await
            .unwrap();
        assert_eq!(rate, dec!(0.92));

        let latest = repository.latest_rates().unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].rate, dec!(0.92));
        assert!(latest[0].is_latest);
    }

    #[tokio::test]
    async fn second_fetch_supersedes_the_first() {
        let (_dir, service, repository) = setup();

        // A zero freshness window forces a refetch on both calls.
        service
            .resolve_current(&FixedProvider { rate: dec!(0.92) }, "USD", "EUR", 0)
            .await
            .unwrap();
        let rate = service
            .resolve_current(&FixedProvider { rate: dec!(0.95) }, "USD", "EUR", 0)
            .await
            .unwrap();
        assert_eq!(rate, dec!(0.95));

        let latest = repository.latest_rates().unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].rate, dec!(0.95));

        let since = Utc::now().naive_utc() - chrono::Duration::days(1);
        assert_eq!(repository.recent_rates(since).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn fresh_cached_rate_skips_the_provider() {
        let (_dir, service, _repository) = setup();

        service
            .resolve_current(&FixedProvider { rate: dec!(0.92) }, "USD", "EUR", 24)
            .await
            .unwrap();

        // The failing provider proves the second call never fetches.
        let rate = service
            .resolve_current(&FailingProvider, "USD", "EUR", 24)
            .await
            .unwrap();
        assert_eq!(rate, dec!(0.92));
    }

    #[tokio::test]
    async fn provider_failure_stores_nothing() {
        let (_dir, service, repository) = setup();

        let err = service
            .resolve_current(&FailingProvider, "USD", "EUR", 24)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Rate provider operation failed: Invalid access key"
        );

        assert!(repository.latest_rates().unwrap().is_empty());
    }

    #[tokio::test]
    async fn dated_fetch_stores_a_non_latest_record_and_caches_it() {
        let (_dir, service, repository) = setup();
        // Must sit inside the 90 day historical window to be cacheable.
        let date = Utc::now().date_naive() - chrono::Duration::days(10);

        let rate = service
            .resolve_on(&FixedProvider { rate: dec!(0.9) }, "USD", "EUR", date)
            .await
            .unwrap();
        assert_eq!(rate, dec!(0.9));
        assert!(repository.latest_rates().unwrap().is_empty());

        // Exact-date hit; a later fetch for the same date never goes out.
        let cached = service
            .resolve_on(&FailingProvider, "USD", "EUR", date)
            .await
            .unwrap();
        assert_eq!(cached, dec!(0.9));

        // The next day misses and reaches the provider again.
        let err = service
            .resolve_on(&FailingProvider, "USD", "EUR", date + chrono::Duration::days(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
    }

    #[tokio::test]
    async fn empty_currency_codes_are_rejected_before_any_io() {
        let (_dir, service, _repository) = setup();

        let err = service.get_conversion_rate("", "EUR", 24).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = service.get_conversion_rate("USD", "", 24).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn first_of_month_normalizes_the_day() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(
            first_of_month(date),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );

        let already_first = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(first_of_month(already_first), already_first);
    }
}
