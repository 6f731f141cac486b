use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use super::util::{body_text, http_client};
use crate::core::weather::{WeatherOutlook, WeatherProvider};

pub const DEFAULT_GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com";
pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com";

/// How far ahead the forecast endpoint publishes daily values.
const FORECAST_HORIZON_DAYS: u64 = 15;

/// Open-Meteo geocoding + daily forecast. No API key required.
pub struct OpenMeteoProvider {
    geocoding_url: String,
    forecast_url: String,
    client: reqwest::Client,
}

impl OpenMeteoProvider {
    pub fn new(geocoding_url: &str, forecast_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            geocoding_url: geocoding_url.trim_end_matches('/').to_string(),
            forecast_url: forecast_url.trim_end_matches('/').to_string(),
            client: http_client(timeout)?,
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: Url) -> Result<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {}", e.without_url()))?;
        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {}", response.status()));
        }
        let text = body_text(response).await?;
        serde_json::from_str(&text).context("Failed to parse JSON response")
    }
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<Place>,
}

#[derive(Debug, Deserialize)]
struct Place {
    name: String,
    latitude: f64,
    longitude: f64,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    daily: DailyForecast,
}

#[derive(Debug, Deserialize)]
struct DailyForecast {
    #[serde(default)]
    temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    temperature_2m_min: Vec<Option<f64>>,
}

fn mean(values: &[Option<f64>]) -> Option<f64> {
    let known: Vec<f64> = values.iter().flatten().copied().collect();
    if known.is_empty() {
        None
    } else {
        Some(known.iter().sum::<f64>() / known.len() as f64)
    }
}

/// Trip dates clipped to the published forecast window, if they overlap it.
fn forecast_window(from: NaiveDate, to: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let today = Utc::now().date_naive();
    let horizon = today.checked_add_days(Days::new(FORECAST_HORIZON_DAYS))?;
    let start = from.max(today);
    let end = to.min(horizon);
    (start <= end).then_some((start, end))
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    #[instrument(name = "OpenMeteoOutlook", skip(self))]
    async fn outlook(
        &self,
        place: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Option<WeatherOutlook>> {
        let city = place.split(',').next().unwrap_or(place).trim();
        if city.is_empty() {
            return Ok(None);
        }

        let url = Url::parse_with_params(
            &format!("{}/v1/search", self.geocoding_url),
            &[("name", city), ("count", "1")],
        )?;
        let geo: GeocodingResponse = self.get_json(url).await?;
        let Some(found) = geo.results.into_iter().next() else {
            debug!("No geocoding result for {city}");
            return Ok(None);
        };

        let mut params = vec![
            ("latitude", found.latitude.to_string()),
            ("longitude", found.longitude.to_string()),
            ("daily", "temperature_2m_max,temperature_2m_min".to_string()),
            ("timezone", "auto".to_string()),
        ];
        if let Some((start, end)) = forecast_window(from, to) {
            params.push(("start_date", start.to_string()));
            params.push(("end_date", end.to_string()));
        }
        let url = Url::parse_with_params(&format!("{}/v1/forecast", self.forecast_url), &params)?;
        let forecast: ForecastResponse = self.get_json(url).await?;

        let (Some(high_c), Some(low_c)) = (
            mean(&forecast.daily.temperature_2m_max),
            mean(&forecast.daily.temperature_2m_min),
        ) else {
            return Ok(None);
        };

        let place = match found.country {
            Some(country) => format!("{}, {}", found.name, country),
            None => found.name,
        };
        Ok(Some(WeatherOutlook {
            place,
            high_c,
            low_c,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OpenMeteoProvider {
        OpenMeteoProvider::new(&server.uri(), &server.uri(), Duration::from_secs(5)).unwrap()
    }

    fn dates() -> (NaiveDate, NaiveDate) {
        let today = Utc::now().date_naive();
        (today, today.checked_add_days(Days::new(2)).unwrap())
    }

    #[tokio::test]
    async fn test_outlook_averages_daily_values() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .and(query_param("name", "Dubai"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"results": [{"name": "Dubai", "latitude": 25.07, "longitude": 55.17, "country": "United Arab Emirates"}]}"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("timezone", "auto"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"daily": {"time": ["a", "b"], "temperature_2m_max": [40.0, 42.0], "temperature_2m_min": [30.0, null]}}"#,
            ))
            .mount(&server)
            .await;

        let (from, to) = dates();
        let outlook = provider(&server)
            .outlook("Dubai, UAE", from, to)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outlook.place, "Dubai, United Arab Emirates");
        assert_eq!(outlook.high_c, 41.0);
        assert_eq!(outlook.low_c, 30.0);
    }

    #[tokio::test]
    async fn test_unknown_place() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"generationtime_ms": 0.5}"#))
            .mount(&server)
            .await;

        let (from, to) = dates();
        let outlook = provider(&server).outlook("Atlantis", from, to).await.unwrap();
        assert!(outlook.is_none());
    }

    #[tokio::test]
    async fn test_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let (from, to) = dates();
        let result = provider(&server).outlook("Dubai", from, to).await;
        assert!(result.unwrap_err().to_string().starts_with("HTTP error: 503"));
    }

    #[test]
    fn test_forecast_window() {
        let today = Utc::now().date_naive();
        let far = today.checked_add_days(Days::new(60)).unwrap();
        assert_eq!(forecast_window(far, far), None);

        let end = today.checked_add_days(Days::new(40)).unwrap();
        let (start, clipped) = forecast_window(today, end).unwrap();
        assert_eq!(start, today);
        assert_eq!(
            clipped,
            today.checked_add_days(Days::new(FORECAST_HORIZON_DAYS)).unwrap()
        );
    }
}
