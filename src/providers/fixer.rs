use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

use super::util::{
    RetryPolicy, body_text, date_or_today, http_client, is_transient, with_retry,
};
use crate::core::currency::CurrencyPair;
use crate::core::fx::{FxRateProvider, FxResult};

pub const DEFAULT_BASE_URL: &str = "https://data.fixer.io/api";

/// Fixer.io `/latest`. The free plan only quotes against EUR, so other
/// pairs are crossed through EUR.
pub struct FixerProvider {
    name: String,
    base_url: String,
    access_key: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl FixerProvider {
    pub fn new(base_url: &str, access_key: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            name: "fixer".to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_key,
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
struct FixerResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    rates: HashMap<String, f64>,
    date: Option<String>,
    error: Option<FixerError>,
}

#[derive(Debug, Deserialize)]
struct FixerError {
    code: Option<i64>,
    #[serde(rename = "type")]
    kind: Option<String>,
    info: Option<String>,
}

/// Computes base -> quote from a EUR-based table.
fn cross_rate(pair: &CurrencyPair, rates: &HashMap<String, f64>) -> Option<f64> {
    let eur_to = |code: &str| -> Option<f64> {
        if code == "EUR" {
            Some(1.0)
        } else {
            rates.get(code).copied().filter(|r| *r > 0.0)
        }
    };
    Some(eur_to(pair.quote())? / eur_to(pair.base())?)
}

#[async_trait]
impl FxRateProvider for FixerProvider {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "FixerFetch", skip(self), fields(pair = %pair))]
    async fn fetch_rate(&self, pair: &CurrencyPair) -> Result<FxResult> {
        let symbols: Vec<&str> = [pair.base(), pair.quote()]
            .into_iter()
            .filter(|code| *code != "EUR")
            .collect();
        let symbols = symbols.join(",");
        let url = Url::parse_with_params(
            &format!("{}/latest", self.base_url),
            &[("access_key", self.access_key.as_str()), ("symbols", symbols.as_str())],
        )?;
        debug!("Requesting Fixer rates for {}", symbols);

        let response = with_retry(
            &self.retry,
            || self.client.get(url.clone()).send(),
            is_transient,
        )
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
        let data: FixerResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", pair, e))?;

        if !data.success {
            let (code, info) = data
                .error
                .map(|e| {
                    (
                        e.code.unwrap_or_default(),
                        e.info.or(e.kind).unwrap_or_default(),
                    )
                })
                .unwrap_or_default();
            return Err(anyhow!("Fixer error {} for {}: {}", code, pair, info));
        }

        let rate = cross_rate(pair, &data.rates)
            .ok_or_else(|| anyhow!("No rate data found for currency pair: {}", pair))?;

        Ok(FxResult {
            rate,
            date: date_or_today(data.date.as_deref()),
            provider: self.name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(symbols: &str, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest"))
            .and(query_param("access_key", "test-key"))
            .and(query_param("symbols", symbols))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn provider(server: &MockServer) -> FixerProvider {
        FixerProvider::new(&server.uri(), "test-key".to_string(), Duration::from_secs(5))
            .unwrap()
            .with_retry_policy(RetryPolicy::none())
    }

    #[tokio::test]
    async fn test_eur_base_direct() {
        let mock_server = create_mock_server(
            "AED",
            r#"{"success": true, "date": "2025-06-30", "rates": {"AED": 4.0}}"#,
        )
        .await;

        let result = provider(&mock_server)
            .fetch_rate(&CurrencyPair::new("EUR", "AED").unwrap())
            .await
            .unwrap();
        assert_eq!(result.rate, 4.0);
        assert_eq!(result.provider, "fixer");
    }

    #[tokio::test]
    async fn test_eur_quote_is_inverted() {
        let mock_server =
            create_mock_server("USD", r#"{"success": true, "rates": {"USD": 1.25}}"#).await;

        let result = provider(&mock_server)
            .fetch_rate(&CurrencyPair::new("USD", "EUR").unwrap())
            .await
            .unwrap();
        assert!((result.rate - 0.8).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_cross_rate_through_eur() {
        let mock_server = create_mock_server(
            "EGP,AED",
            r#"{"success": true, "rates": {"EGP": 54.0, "AED": 4.0}}"#,
        )
        .await;

        let result = provider(&mock_server)
            .fetch_rate(&CurrencyPair::new("EGP", "AED").unwrap())
            .await
            .unwrap();
        assert!((result.rate - 4.0 / 54.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_error_payload() {
        let mock_server = create_mock_server(
            "USD",
            r#"{"success": false, "error": {"code": 105, "info": "base_currency_access_restricted"}}"#,
        )
        .await;

        let result = provider(&mock_server)
            .fetch_rate(&CurrencyPair::new("USD", "EUR").unwrap())
            .await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "Fixer error 105 for USD/EUR: base_currency_access_restricted"
        );
    }

    #[tokio::test]
    async fn test_missing_symbol() {
        let mock_server =
            create_mock_server("EGP,AED", r#"{"success": true, "rates": {"EGP": 54.0}}"#).await;

        let result = provider(&mock_server)
            .fetch_rate(&CurrencyPair::new("EGP", "AED").unwrap())
            .await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "No rate data found for currency pair: EGP/AED"
        );
    }

    #[tokio::test]
    async fn test_errors_never_expose_access_key() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("symbols", "AED"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("symbols", "GBP"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("symbols", "JPY"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&mock_server)
            .await;

        let provider = FixerProvider::new(
            &mock_server.uri(),
            "test-key".to_string(),
            Duration::from_millis(100),
        )
        .unwrap()
        .with_retry_policy(RetryPolicy::none());

        for quote in ["AED", "GBP", "JPY"] {
            let pair = CurrencyPair::new("EUR", quote).unwrap();
            let err = provider.fetch_rate(&pair).await.unwrap_err();
            let message = format!("{err:#}");
            assert!(!message.contains("test-key"), "{message}");
        }
    }
}
