use std::collections::HashMap;
use std::str::FromStr;

use chrono::NaiveDate;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::errors::{ConfigError, Error, ProviderError, Result};

const BASE_HOST: &str = "api.currencylayer.com";

const API_KEY_NOT_CONFIGURED: &str =
    "The CurrencyLayer API Key in the Foreign Exchange Settings is not setup";

pub struct CurrencyLayerClient {
    client: Client,
    api_key: String,
    use_https: bool,
}

#[derive(Debug, Deserialize)]
struct LiveResponse {
    error: Option<LiveError>,
    quotes: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct LiveError {
    info: Option<String>,
}

impl CurrencyLayerClient {
    pub fn new(api_key: String, use_https: bool) -> Self {
        CurrencyLayerClient {
            client: Client::new(),
            api_key,
            use_https,
        }
    }

    pub fn name(&self) -> &'static str {
        "CURRENCY_LAYER"
    }

    pub async fn latest_rate(&self, from: &str, to: &str) -> Result<Decimal> {
        self.fetch_rate(from, to, None).await
    }

    pub async fn historical_rate(&self, from: &str, to: &str, date: NaiveDate) -> Result<Decimal> {
        self.fetch_rate(from, to, Some(date)).await
    }

    async fn fetch_rate(&self, from: &str, to: &str, date: Option<NaiveDate>) -> Result<Decimal> {
        if self.api_key.is_empty() {
            return Err(ConfigError::NotConfigured(API_KEY_NOT_CONFIGURED.to_string()).into());
        }

        let url = self.live_url(from, to, date)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let reason = status
                .canonical_reason()
                .unwrap_or_else(|| status.as_str())
                .to_string();
            return Err(ProviderError::Transport(reason).into());
        }

        let body: LiveResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        parse_live_response(body, from, to)
    }

    fn live_url(&self, from: &str, to: &str, date: Option<NaiveDate>) -> Result<reqwest::Url> {
        let scheme = if self.use_https { "https" } else { "http" };
        let base = format!("{}://{}/live", scheme, BASE_HOST);

        let mut params = vec![
            ("access_key", self.api_key.clone()),
            ("source", from.to_string()),
            ("currencies", to.to_string()),
        ];
        if let Some(date) = date {
            params.push(("date", date.format("%Y-%m-%d").to_string()));
        }

        reqwest::Url::parse_with_params(&base, &params)
            .map_err(|e| ProviderError::Transport(format!("Failed to build URL: {}", e)).into())
    }
}

/// Pulls the quote at `quotes.{FROM}{TO}` out of a live/historical
/// response, surfacing the provider's own `error.info` text when present.
fn parse_live_response(body: LiveResponse, from: &str, to: &str) -> Result<Decimal> {
    if let Some(error) = body.error {
        let info = error
            .info
            .unwrap_or_else(|| "CurrencyLayer reported an error".to_string());
        return Err(ProviderError::Api(info).into());
    }

    let quote_key = format!("{}{}", from, to);
    let value = body
        .quotes
        .as_ref()
        .and_then(|quotes| quotes.get(&quote_key))
        .ok_or_else(|| {
            Error::from(ProviderError::Parse(format!(
                "quote {} missing from response",
                quote_key
            )))
        })?;

    parse_quote(value)
}

fn parse_quote(value: &serde_json::Value) -> Result<Decimal> {
    let raw = match value {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    Decimal::from_str(&raw).map_err(|e| ProviderError::Parse(e.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn url_carries_key_pair_and_scheme() {
        let client = CurrencyLayerClient::new("secret".to_string(), false);
        let url = client.live_url("USD", "EUR", None).unwrap();

        assert_eq!(url.scheme(), "http");
        assert_eq!(url.host_str(), Some("api.currencylayer.com"));
        assert_eq!(url.path(), "/live");
        let query = url.query().unwrap();
        assert!(query.contains("access_key=secret"));
        assert!(query.contains("source=USD"));
        assert!(query.contains("currencies=EUR"));
        assert!(!query.contains("date="));
    }

    #[test]
    fn https_setting_switches_scheme() {
        let client = CurrencyLayerClient::new("secret".to_string(), true);
        let url = client.live_url("USD", "EUR", None).unwrap();
        assert_eq!(url.scheme(), "https");
    }

    #[test]
    fn historical_url_formats_date() {
        let client = CurrencyLayerClient::new("secret".to_string(), false);
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let url = client.live_url("USD", "EUR", Some(date)).unwrap();
        assert!(url.query().unwrap().contains("date=2024-01-05"));
    }

    #[test]
    fn quote_is_extracted_from_quotes_object() {
        let body: LiveResponse =
            serde_json::from_str(r#"{"success":true,"quotes":{"USDEUR":0.92}}"#).unwrap();
        let rate = parse_live_response(body, "USD", "EUR").unwrap();
        assert_eq!(rate, dec!(0.92));
    }

    #[test]
    fn provider_error_info_is_surfaced_verbatim() {
        let body: LiveResponse = serde_json::from_str(
            r#"{"success":false,"error":{"code":101,"info":"Invalid access key"}}"#,
        )
        .unwrap();
        let err = parse_live_response(body, "USD", "EUR").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Rate provider operation failed: Invalid access key"
        );
    }

    #[test]
    fn missing_quote_is_a_parse_error() {
        let body: LiveResponse =
            serde_json::from_str(r#"{"success":true,"quotes":{"USDGBP":0.79}}"#).unwrap();
        let err = parse_live_response(body, "USD", "EUR").unwrap_err();
        assert!(matches!(
            err,
            Error::Provider(ProviderError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn empty_api_key_is_a_configuration_error() {
        let client = CurrencyLayerClient::new("".to_string(), false);
        let err = client.latest_rate("USD", "EUR").await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("CurrencyLayer API Key"));
    }
}
