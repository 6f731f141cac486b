use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use super::util::{
    RetryPolicy, body_text, date_or_today, http_client, is_transient, with_retry,
};
use crate::core::currency::CurrencyPair;
use crate::core::fx::{FxRateProvider, FxResult};

pub const DEFAULT_BASE_URL: &str = "https://api.exchangerate.host";

/// exchangerate.host `/convert` endpoint.
pub struct ExchangeRateHostProvider {
    name: String,
    base_url: String,
    access_key: Option<String>,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl ExchangeRateHostProvider {
    pub fn new(base_url: &str, access_key: Option<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            name: "exchangerate.host".to_string(),
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
struct ConvertResponse {
    success: Option<bool>,
    result: Option<f64>,
    info: Option<ConvertInfo>,
    date: Option<String>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ConvertInfo {
    rate: Option<f64>,
    quote: Option<f64>,
}

#[async_trait]
impl FxRateProvider for ExchangeRateHostProvider {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "ExchangeRateHostFetch", skip(self), fields(pair = %pair))]
    async fn fetch_rate(&self, pair: &CurrencyPair) -> Result<FxResult> {
        let mut params = vec![("from", pair.base()), ("to", pair.quote())];
        if let Some(key) = &self.access_key {
            params.push(("access_key", key.as_str()));
        }
        let url = Url::parse_with_params(&format!("{}/convert", self.base_url), &params)?;
        debug!("Requesting FX rate from {}", url.path());

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
        let data: ConvertResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", pair, e))?;

        if data.success == Some(false) || data.error.is_some() {
            return Err(anyhow!(
                "Provider error for {}: {}",
                pair,
                data.error.map(|e| e.to_string()).unwrap_or_default()
            ));
        }

        let rate = data
            .result
            .or_else(|| data.info.as_ref().and_then(|i| i.rate.or(i.quote)))
            .ok_or_else(|| anyhow!("No rate data found for currency pair: {}", pair))?;

        Ok(FxResult {
            rate,
            date: date_or_today(data.date.as_deref()),
            provider: self.name.clone(),
        })
    }
}
