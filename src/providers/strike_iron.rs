use chrono::{Duration, NaiveDate};
use log::warn;
use quick_xml::escape::escape;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::errors::{ConfigError, ProviderError, Result};

const ENDPOINT: &str = "http://wsparam.strikeiron.com/StrikeIron/ForeignExchangeRate3/CurrencyRates";
const SOAP_NS: &str = "http://www.strikeiron.com";

const CREDENTIALS_NOT_CONFIGURED: &str =
    "The StrikeIron.com credentials in the Foreign Exchange Settings are not setup";

const DEPRECATION_NOTICE: &str = "The StrikeIron exchange rate service is deprecated. \
    Configure a CurrencyLayer API key in the Foreign Exchange Settings instead.";

pub struct StrikeIronClient {
    client: Client,
    user_id: String,
    password: String,
}

impl StrikeIronClient {
    pub fn new(user_id: String, password: String) -> Self {
        StrikeIronClient {
            client: Client::new(),
            user_id,
            password,
        }
    }

    pub fn name(&self) -> &'static str {
        "STRIKE_IRON"
    }

    pub async fn latest_rate(&self, from: &str, to: &str) -> Result<Decimal> {
        warn!("{}", DEPRECATION_NOTICE);
        self.ensure_credentials()?;

        let envelope = self.latest_rate_envelope(from, to);
        let xml = self.call("GetLatestRate", envelope).await?;
        parse_latest_response(&xml)
    }

    pub async fn historical_rate(&self, from: &str, to: &str, date: NaiveDate) -> Result<Decimal> {
        warn!("{}", DEPRECATION_NOTICE);
        self.ensure_credentials()?;

        let envelope = self.historical_rate_envelope(from, to, date, date + Duration::days(1));
        let xml = self.call("GetHistoricalRate", envelope).await?;
        parse_historical_response(&xml)
    }

    fn ensure_credentials(&self) -> Result<()> {
        if self.user_id.is_empty() || self.password.is_empty() {
            return Err(
                ConfigError::NotConfigured(CREDENTIALS_NOT_CONFIGURED.to_string()).into(),
            );
        }
        Ok(())
    }

    async fn call(&self, action: &str, envelope: String) -> Result<String> {
        let response = self
            .client
            .post(ENDPOINT)
            .header("Content-Type", "text/xml; charset=utf-8")
            .header("SOAPAction", format!("\"{}/{}\"", SOAP_NS, action))
            .body(envelope)
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

        Ok(response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?)
    }

    fn latest_rate_envelope(&self, from: &str, to: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/" xmlns="{ns}">
  <soap:Header>
    <LicenseInfo>
      <RegisteredUser>
        <UserID>{user}</UserID>
        <Password>{password}</Password>
      </RegisteredUser>
    </LicenseInfo>
  </soap:Header>
  <soap:Body>
    <GetLatestRate>
      <SourceCurrency>{from}</SourceCurrency>
      <DestinationCurrency>{to}</DestinationCurrency>
    </GetLatestRate>
  </soap:Body>
</soap:Envelope>"#,
            ns = SOAP_NS,
            user = escape(self.user_id.as_str()),
            password = escape(self.password.as_str()),
            from = escape(from),
            to = escape(to),
        )
    }

    fn historical_rate_envelope(
        &self,
        from: &str,
        to: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/" xmlns="{ns}">
  <soap:Header>
    <LicenseInfo>
      <RegisteredUser>
        <UserID>{user}</UserID>
        <Password>{password}</Password>
      </RegisteredUser>
    </LicenseInfo>
  </soap:Header>
  <soap:Body>
    <GetHistoricalRate>
      <SourceCurrency>{from}</SourceCurrency>
      <DestinationCurrency>{to}</DestinationCurrency>
      <StartDate>{start}</StartDate>
      <EndDate>{end}</EndDate>
    </GetHistoricalRate>
  </soap:Body>
</soap:Envelope>"#,
            ns = SOAP_NS,
            user = escape(self.user_id.as_str()),
            password = escape(self.password.as_str()),
            from = escape(from),
            to = escape(to),
            start = legacy_date(start),
            end = legacy_date(end),
        )
    }
}

/// The remote service wants unpadded `M/d/yyyy` dates.
fn legacy_date(date: NaiveDate) -> String {
    use chrono::Datelike;
    format!("{}/{}/{}", date.month(), date.day(), date.year())
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(
        rename = "Body",
        alias = "soap:Body",
        alias = "SOAP-ENV:Body",
        alias = "s:Body"
    )]
    body: T,
}

#[derive(Debug, Deserialize)]
struct LatestRateBody {
    #[serde(rename = "GetLatestRateResponse")]
    response: LatestRateResponse,
}

#[derive(Debug, Deserialize)]
struct LatestRateResponse {
    #[serde(rename = "GetLatestRateResult")]
    result: ServiceOutcome<RateValue>,
}

#[derive(Debug, Deserialize)]
struct HistoricalRateBody {
    #[serde(rename = "GetHistoricalRateResponse")]
    response: HistoricalRateResponse,
}

#[derive(Debug, Deserialize)]
struct HistoricalRateResponse {
    #[serde(rename = "GetHistoricalRateResult")]
    result: ServiceOutcome<HistoricalResultSet>,
}

#[derive(Debug, Deserialize)]
struct ServiceOutcome<T> {
    #[serde(rename = "ServiceStatus")]
    status: ServiceStatus,
    #[serde(rename = "ServiceResult")]
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ServiceStatus {
    #[serde(rename = "StatusNbr")]
    status_nbr: i32,
    #[serde(rename = "StatusDescription", default)]
    status_description: String,
}

#[derive(Debug, Deserialize)]
struct RateValue {
    #[serde(rename = "Value")]
    value: Decimal,
}

#[derive(Debug, Deserialize)]
struct HistoricalResultSet {
    #[serde(rename = "Results")]
    results: Option<HistoricalResults>,
}

#[derive(Debug, Deserialize)]
struct HistoricalResults {
    #[serde(rename = "HistoricalRate", default)]
    items: Vec<RateValue>,
}

fn check_status(status: &ServiceStatus) -> Result<()> {
    if status.status_nbr > 300 {
        return Err(ProviderError::Transport(format!(
            "Service Error: {}",
            status.status_description
        ))
        .into());
    }
    Ok(())
}

fn parse_latest_response(xml: &str) -> Result<Decimal> {
    let envelope: Envelope<LatestRateBody> =
        quick_xml::de::from_str(xml).map_err(|e| ProviderError::Parse(e.to_string()))?;

    let outcome = envelope.body.response.result;
    check_status(&outcome.status)?;

    outcome
        .result
        .map(|r| r.value)
        .ok_or_else(|| ProviderError::Parse("rate value missing from response".to_string()).into())
}

fn parse_historical_response(xml: &str) -> Result<Decimal> {
    let envelope: Envelope<HistoricalRateBody> =
        quick_xml::de::from_str(xml).map_err(|e| ProviderError::Parse(e.to_string()))?;

    let outcome = envelope.body.response.result;
    check_status(&outcome.status)?;

    // The service returns a result list; only the first entry is used.
    outcome
        .result
        .and_then(|r| r.results)
        .map(|r| r.items)
        .unwrap_or_default()
        .into_iter()
        .next()
        .map(|r| r.value)
        .ok_or_else(|| ProviderError::NoRates.into())
}
