use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use super::util::{body_text, http_client};
use crate::core::cities::{CitySearch, CitySuggestion};

pub const DEFAULT_BASE_URL: &str = "https://wft-geo-db.p.rapidapi.com";
const RAPIDAPI_HOST: &str = "wft-geo-db.p.rapidapi.com";
const RESULT_LIMIT: &str = "10";

/// GeoDB Cities through RapidAPI.
pub struct GeoDbProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeoDbProvider {
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client: http_client(timeout)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CitiesResponse {
    #[serde(default)]
    data: Vec<City>,
}

#[derive(Debug, Deserialize)]
struct City {
    city: String,
    region: Option<String>,
    country: Option<String>,
}

impl From<City> for CitySuggestion {
    fn from(c: City) -> Self {
        let label = [Some(c.city.as_str()), c.region.as_deref(), c.country.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ");
        let value = match &c.country {
            Some(country) => format!("{}, {}", c.city, country),
            None => c.city.clone(),
        };
        CitySuggestion { label, value }
    }
}

#[async_trait]
impl CitySearch for GeoDbProvider {
    #[instrument(name = "GeoDbSearch", skip(self))]
    async fn search(&self, prefix: &str) -> Result<Vec<CitySuggestion>> {
        let url = Url::parse_with_params(
            &format!("{}/v1/geo/cities", self.base_url),
            &[("limit", RESULT_LIMIT), ("namePrefix", prefix)],
        )?;
        debug!("Searching cities");

        let response = self
            .client
            .get(url)
            .header("X-RapidAPI-Key", &self.api_key)
            .header("X-RapidAPI-Host", RAPIDAPI_HOST)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {}", e.without_url()))?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {} for city search", response.status()));
        }

        let text = body_text(response).await?;
        let data: CitiesResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for city search: {}", e))?;
        Ok(data.data.into_iter().map(CitySuggestion::from).collect())
    }
}
