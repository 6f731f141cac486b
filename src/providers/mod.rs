pub mod chat_completions;
pub mod exchangerate_api;
pub mod exchangerate_host;
pub mod fixer;
pub mod geodb;
pub mod open_meteo;
pub mod util;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::core::cities::CitySearch;
use crate::core::config::{CitiesConfig, FxConfig, FxProviderKind, LlmConfig, WeatherConfig};
use crate::core::fx::FxRateProvider;
use crate::core::llm::{CompletionClient, RetryingClient};
use crate::core::weather::WeatherProvider;

pub use chat_completions::ChatCompletionsClient;
pub use exchangerate_api::ExchangeRateApiProvider;
pub use exchangerate_host::ExchangeRateHostProvider;
pub use fixer::FixerProvider;
pub use geodb::GeoDbProvider;
pub use open_meteo::OpenMeteoProvider;

/// Builds the FX chain in configured order. Fixer is skipped without a key.
pub fn fx_providers(config: &FxConfig) -> Result<Vec<Arc<dyn FxRateProvider>>> {
    let timeout = config.timeout();
    let mut providers: Vec<Arc<dyn FxRateProvider>> = Vec::new();

    for entry in &config.providers {
        let base_url = entry.base_url();
        let provider: Arc<dyn FxRateProvider> = match entry.kind {
            FxProviderKind::ExchangerateHost => {
                let mut p = ExchangeRateHostProvider::new(base_url, entry.api_key.clone(), timeout)?;
                if let Some(name) = &entry.name {
                    p = p.with_name(name);
                }
                Arc::new(p)
            }
            FxProviderKind::ExchangerateApi => {
                let mut p = ExchangeRateApiProvider::new(base_url, timeout)?;
                if let Some(name) = &entry.name {
                    p = p.with_name(name);
                }
                Arc::new(p)
            }
            FxProviderKind::Fixer => {
                let Some(key) = entry.api_key.clone().filter(|k| !k.trim().is_empty()) else {
                    debug!("Skipping Fixer provider: no API key");
                    continue;
                };
                let mut p = FixerProvider::new(base_url, key, timeout)?;
                if let Some(name) = &entry.name {
                    p = p.with_name(name);
                }
                Arc::new(p)
            }
        };
        providers.push(provider);
    }

    info!(
        "FX providers: {}",
        providers
            .iter()
            .map(|p| p.name())
            .collect::<Vec<_>>()
            .join(" -> ")
    );
    Ok(providers)
}

/// `None` when no API key is configured; itinerary requests then get the
/// fallback plan.
pub fn completion_client(config: &LlmConfig) -> Result<Option<Arc<dyn CompletionClient>>> {
    let Some(api_key) = config.api_key.clone().filter(|k| !k.trim().is_empty()) else {
        return Ok(None);
    };
    let client = ChatCompletionsClient::new(
        &config.base_url,
        api_key,
        config.model.clone(),
        config.timeout(),
    )?;
    Ok(Some(Arc::new(RetryingClient::new(
        client,
        config.retry_policy(),
    ))))
}

pub fn weather_provider(config: &WeatherConfig) -> Result<Option<Arc<dyn WeatherProvider>>> {
    if !config.enabled {
        return Ok(None);
    }
    Ok(Some(Arc::new(OpenMeteoProvider::new(
        &config.geocoding_url,
        &config.forecast_url,
        Duration::from_secs(config.timeout_secs),
    )?)))
}

pub fn city_search(config: &CitiesConfig) -> Result<Option<Arc<dyn CitySearch>>> {
    let Some(api_key) = config.api_key.clone().filter(|k| !k.trim().is_empty()) else {
        return Ok(None);
    };
    Ok(Some(Arc::new(GeoDbProvider::new(
        &config.base_url,
        api_key,
        Duration::from_secs(config.timeout_secs),
    )?)))
}
