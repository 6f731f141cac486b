//! HTTP surface.

pub mod cities;
pub mod error;
pub mod fx;
pub mod health;
pub mod itinerary;

use anyhow::{Context, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::core::cities::CitySearch;
use crate::core::config::{AppConfig, ServerConfig};
use crate::core::currency::CurrencyPair;
use crate::core::fx::FxService;
use crate::core::log::ErrorLog;
use crate::core::planner::Planner;
use crate::core::sanity::SanityValidator;
use crate::providers;
use crate::store::MemoryCache;

pub struct AppState {
    pub planner: Planner,
    pub cities: Option<Arc<dyn CitySearch>>,
}

impl AppState {
    pub fn new(planner: Planner, cities: Option<Arc<dyn CitySearch>>) -> Arc<Self> {
        Arc::new(Self { planner, cities })
    }

    /// Wires every collaborator from configuration. Optional services without
    /// credentials are left out.
    pub fn from_config(config: &AppConfig) -> Result<Arc<Self>> {
        Ok(Self::new(planner_from_config(config)?, providers::city_search(&config.cities)?))
    }
}

pub fn fx_service_from_config(config: &AppConfig) -> Result<FxService> {
    let last_resort = config
        .fx
        .last_resort
        .iter()
        .map(|r| {
            CurrencyPair::new(&r.base, &r.quote)
                .map(|pair| (pair, r.rate))
                .with_context(|| format!("Invalid last_resort pair {}/{}", r.base, r.quote))
        })
        .collect::<Result<HashMap<_, _>>>()?;

    Ok(FxService::new(
        providers::fx_providers(&config.fx)?,
        Arc::new(MemoryCache::new()),
        config.fx.cache_ttl(),
    )
    .with_validator(SanityValidator::new(config.fx.sanity_bands.clone()))
    .with_last_resort(last_resort))
}

pub fn planner_from_config(config: &AppConfig) -> Result<Planner> {
    let fx = Arc::new(fx_service_from_config(config)?);
    let mut planner = Planner::new(fx, providers::completion_client(&config.llm)?)
        .with_sampling(config.llm.temperature, config.llm.max_tokens)
        .with_error_log(config.dev_error_log.clone().map(ErrorLog::new));
    if let Some(weather) = providers::weather_provider(&config.weather)? {
        planner = planner.with_weather(weather);
    }
    Ok(planner)
}

fn cors_layer(config: &ServerConfig) -> Result<CorsLayer> {
    if config.cors_origins.is_empty() || config.cors_origins.iter().any(|o| o == "*") {
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any));
    }
    let origins = config
        .cors_origins
        .iter()
        .map(|o| {
            o.parse::<HeaderValue>()
                .with_context(|| format!("Invalid CORS origin: {o}"))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any))
}

pub fn app_router(state: Arc<AppState>, config: &ServerConfig) -> Result<Router> {
    let api = Router::new()
        .route("/itinerary", post(itinerary::create_itinerary))
        .route("/fx", get(fx::get_rate))
        .route("/cities", get(cities::search_cities))
        .route("/health", get(health::health));

    Ok(Router::new()
        .nest("/api", api)
        .with_state(state)
        .layer(cors_layer(config)?)
        .layer(TraceLayer::new_for_http()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_router_mounts_every_route() {
        let config = AppConfig::default();
        let router = app_router(AppState::from_config(&config).unwrap(), &config.server).unwrap();

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/cities?q=")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_cors_rejects_bad_origin() {
        let config = ServerConfig {
            cors_origins: vec!["http://ok.example".to_string(), "bad\norigin".to_string()],
            ..ServerConfig::default()
        };
        assert!(cors_layer(&config).is_err());
    }
}
