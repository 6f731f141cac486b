use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

use super::util::{
    RetryPolicy, body_text, date_or_today, http_client, is_transient, with_retry,
};
use crate::core::currency::CurrencyPair;
use crate::core::fx::{FxRateProvider, FxResult};

pub const DEFAULT_BASE_URL: &str = "https://open.er-api.com/v6";

/// Providers that publish a full rate table per base currency at
/// `{base_url}/latest/{BASE}`, e.g. exchangerate-api.com.
pub struct ExchangeRateApiProvider {
    name: String,
    base_url: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl ExchangeRateApiProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            name: "exchangerate-api".to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client(timeout)?,
            retry: RetryPolicy::new(2, Duration::from_millis(250), Duration::from_millis(250)),
        })
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    result: Option<String>,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
    #[serde(default)]
    rates: HashMap<String, f64>,
    date: Option<String>,
    time_last_update_utc: Option<String>,
}

#[async_trait]
impl FxRateProvider for ExchangeRateApiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "ExchangeRateApiFetch", skip(self), fields(pair = %pair))]
    async fn fetch_rate(&self, pair: &CurrencyPair) -> Result<FxResult> {
        let url = format!("{}/latest/{}", self.base_url, pair.base());
        debug!("Requesting FX table from {}", url);

        let response = with_retry(&self.retry, || self.client.get(&url).send(), is_transient)
            .await
            .map_err(|e| anyhow!("Request error: {} for currency pair: {}", e.without_url(), pair))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for currency pair: {}",
                response.status(),
                pair
            ));
        }

        let text = body_text(response).await?;
        let data: LatestRatesResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", pair, e))?;

        if data.result.as_deref() == Some("error") {
            return Err(anyhow!(
                "Provider error for {}: {}",
                pair,
                data.error_type.unwrap_or_else(|| "unknown".to_string())
            ));
        }

        let rate = *data
            .rates
            .get(pair.quote())
            .ok_or_else(|| anyhow!("No rate data found for currency pair: {}", pair))?;

        // Only the RFC 2822 timestamp is published by some mirrors
        let date = data.date.as_deref().map(|d| date_or_today(Some(d))).unwrap_or_else(|| {
            data.time_last_update_utc
                .as_deref()
                .and_then(|ts| chrono::DateTime::parse_from_rfc2822(ts).ok())
                .map(|dt| dt.date_naive())
                .unwrap_or_else(|| date_or_today(None))
        });

        Ok(FxResult {
            rate,
            date,
            provider: self.name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(base: &str, status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/latest/{base}")))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn provider(server: &MockServer) -> ExchangeRateApiProvider {
        ExchangeRateApiProvider::new(&server.uri(), Duration::from_secs(5))
            .unwrap()
            .with_retry_policy(RetryPolicy::none())
    }

    #[tokio::test]
    async fn test_rate_from_table() {
        let mock_server = create_mock_server(
            "USD",
            200,
            r#"{"rates": {"EUR": 0.92, "GBP": 0.79}, "date": "2025-06-30"}"#,
        )
        .await;

        let result = provider(&mock_server)
            .with_name("secondary")
            .fetch_rate(&CurrencyPair::new("USD", "EUR").unwrap())
            .await
            .unwrap();

        assert_eq!(result.rate, 0.92);
        assert_eq!(result.provider, "secondary");
        assert_eq!(result.date.to_string(), "2025-06-30");
    }

    #[tokio::test]
    async fn test_date_from_update_timestamp() {
        let mock_server = create_mock_server(
            "USD",
            200,
            r#"{"result": "success", "time_last_update_utc": "Mon, 30 Jun 2025 00:02:31 +0000", "rates": {"EUR": 0.92}}"#,
        )
        .await;

        let result = provider(&mock_server)
            .fetch_rate(&CurrencyPair::new("USD", "EUR").unwrap())
            .await
            .unwrap();

        assert_eq!(result.date.to_string(), "2025-06-30");
    }

    #[tokio::test]
    async fn test_quote_missing_from_table() {
        let mock_server =
            create_mock_server("USD", 200, r#"{"rates": {"GBP": 0.79}}"#).await;

        let result = provider(&mock_server)
            .fetch_rate(&CurrencyPair::new("USD", "EUR").unwrap())
            .await;

        assert_eq!(
            result.unwrap_err().to_string(),
            "No rate data found for currency pair: USD/EUR"
        );
    }

    #[tokio::test]
    async fn test_provider_reported_error() {
        let mock_server = create_mock_server(
            "XYZ",
            200,
            r#"{"result": "error", "error-type": "unsupported-code"}"#,
        )
        .await;

        let result = provider(&mock_server)
            .fetch_rate(&CurrencyPair::new("XYZ", "ABC").unwrap())
            .await;

        assert!(result.unwrap_err().to_string().contains("unsupported-code"));
    }

    #[tokio::test]
    async fn test_not_found_status() {
        let mock_server = create_mock_server("USD", 404, "").await;

        let result = provider(&mock_server)
            .fetch_rate(&CurrencyPair::new("USD", "EUR").unwrap())
            .await;

        assert!(result.unwrap_err().to_string().starts_with("HTTP error: 404"));
    }
}
