use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::currency_layer::CurrencyLayerClient;
use super::strike_iron::StrikeIronClient;
use crate::errors::Result;
use crate::settings::ForexSettings;

/// Common rate-fetch capability implemented by both provider clients.
/// Fetching has no persistence side effects; the resolver stores results.
#[async_trait]
pub trait RateProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn latest_rate(&self, from: &str, to: &str) -> Result<Decimal>;
    async fn historical_rate(&self, from: &str, to: &str, date: NaiveDate) -> Result<Decimal>;
}

/// The provider chosen for one resolution. Selection is re-evaluated on
/// every call; nothing sticks between resolutions.
pub enum SelectedProvider {
    CurrencyLayer(CurrencyLayerClient),
    StrikeIron(StrikeIronClient),
}

/// StrikeIron only serves accounts that configured it before CurrencyLayer
/// existed and never entered an API key; any configured API key wins.
pub fn select_provider(settings: &ForexSettings) -> SelectedProvider {
    if settings.has_legacy_credentials() && settings.api_key.is_empty() {
        SelectedProvider::StrikeIron(StrikeIronClient::new(
            settings.user_id.clone(),
            settings.password.clone(),
        ))
    } else {
        SelectedProvider::CurrencyLayer(CurrencyLayerClient::new(
            settings.api_key.clone(),
            settings.use_https,
        ))
    }
}

impl SelectedProvider {
    /// CurrencyLayer rejects multi-currency destination lists, so that
    /// path keeps only the first three characters. The legacy path sends
    /// the code through untouched.
    pub fn normalize_destination<'a>(&self, to: &'a str) -> &'a str {
        match self {
            SelectedProvider::CurrencyLayer(_) if to.len() > 3 => &to[..3],
            _ => to,
        }
    }
}

#[async_trait]
impl RateProvider for SelectedProvider {
    fn name(&self) -> &'static str {
        match self {
            SelectedProvider::CurrencyLayer(client) => client.name(),
            SelectedProvider::StrikeIron(client) => client.name(),
        }
    }

    async fn latest_rate(&self, from: &str, to: &str) -> Result<Decimal> {
        match self {
            SelectedProvider::CurrencyLayer(client) => client.latest_rate(from, to).await,
            SelectedProvider::StrikeIron(client) => client.latest_rate(from, to).await,
        }
    }

    async fn historical_rate(&self, from: &str, to: &str, date: NaiveDate) -> Result<Decimal> {
        match self {
            SelectedProvider::CurrencyLayer(client) => {
                client.historical_rate(from, to, date).await
            }
            SelectedProvider::StrikeIron(client) => client.historical_rate(from, to, date).await,
        }
    }
}
