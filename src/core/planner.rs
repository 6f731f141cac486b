//! End-to-end itinerary generation for one trip request.

use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::currency::currency_code;
use crate::core::fx::{FxService, FxSnapshot};
use crate::core::itinerary::Itinerary;
use crate::core::llm::{CompletionClient, LlmError};
use crate::core::log::ErrorLog;
use crate::core::prompt;
use crate::core::repair::{RepairContext, RepairError, parse_itinerary, repair};
use crate::core::trip::{TripError, TripRequest};
use crate::core::weather::WeatherProvider;

/// Used when a place cannot be mapped to a currency.
pub const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    InvalidRequest(#[from] TripError),

    /// The LLM could not be reached or kept failing.
    #[error("AI service temporarily unavailable: {0}")]
    Unavailable(LlmError),

    /// The LLM rejected the request outright.
    #[error("AI service rejected the request: {0}")]
    Rejected(LlmError),

    #[error(transparent)]
    Malformed(#[from] RepairError),

    #[error("Malformed AI response: {0}")]
    MissingToolCall(LlmError),
}

impl From<LlmError> for PlanError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::ParseError(_) => PlanError::MissingToolCall(err),
            LlmError::ApiError { .. } => PlanError::Rejected(err),
            _ => PlanError::Unavailable(err),
        }
    }
}

pub struct Planner {
    fx: Arc<FxService>,
    llm: Option<Arc<dyn CompletionClient>>,
    weather: Option<Arc<dyn WeatherProvider>>,
    error_log: Option<ErrorLog>,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl Planner {
    pub fn new(fx: Arc<FxService>, llm: Option<Arc<dyn CompletionClient>>) -> Self {
        Self {
            fx,
            llm,
            weather: None,
            error_log: None,
            temperature: 0.7,
            max_tokens: None,
        }
    }

    pub fn with_weather(mut self, weather: Arc<dyn WeatherProvider>) -> Self {
        self.weather = Some(weather);
        self
    }

    pub fn with_error_log(mut self, error_log: Option<ErrorLog>) -> Self {
        self.error_log = error_log;
        self
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: Option<u32>) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn fx(&self) -> &FxService {
        &self.fx
    }

    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    pub fn error_log(&self) -> Option<&ErrorLog> {
        self.error_log.as_ref()
    }

    async fn record(&self, scope: &str, err: &(dyn std::fmt::Display + Sync)) {
        if let Some(log) = &self.error_log {
            log.append(scope, err).await;
        }
    }

    /// Home and destination currencies for a trip.
    pub fn currencies(trip: &TripRequest) -> (String, String) {
        let resolve = |place: &str| {
            currency_code(place).unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
        };
        (resolve(&trip.country), resolve(&trip.destination))
    }

    async fn weather_summary(&self, trip: &TripRequest) -> Option<String> {
        let provider = self.weather.as_ref()?;
        let range = trip.date_range;
        match provider.outlook(&trip.destination, range.from, range.to).await {
            Ok(outlook) => outlook.map(|o| o.summary()),
            Err(e) => {
                warn!("[Weather] lookup failed for {}: {e:#}", trip.destination);
                self.record("weather", &e).await;
                None
            }
        }
    }

    pub async fn fx_snapshot(&self, trip: &TripRequest) -> FxSnapshot {
        let (home, dest) = Self::currencies(trip);
        let snapshot = self.fx.snapshot(&home, &dest).await;
        if !snapshot.is_same_currency() && !snapshot.is_measured() {
            self.record("fx", &format!("no live rate for {home}/{dest}")).await;
        }
        snapshot
    }

    pub async fn plan(&self, trip: &TripRequest) -> Result<Itinerary, PlanError> {
        let days = trip.validate()?;

        let Some(llm) = &self.llm else {
            let err = LlmError::NotConfigured("no LLM API key configured".to_string());
            self.record("llm", &err).await;
            return Err(PlanError::Unavailable(err));
        };

        let fx = self.fx_snapshot(trip).await;
        let weather = self.weather_summary(trip).await;

        let request = prompt::itinerary_request(
            trip,
            days,
            &fx,
            weather.as_deref(),
            self.temperature,
            self.max_tokens,
        );
        info!(
            "Planning {days}-day trip to {} ({} -> {}) with {}",
            trip.destination,
            fx.home,
            fx.dest,
            llm.model_name()
        );

        let arguments = match llm.complete(&request).await {
            Ok(arguments) => arguments,
            Err(e) => {
                warn!("[LLM] itinerary generation failed: {e}");
                self.record("llm", &e).await;
                return Err(e.into());
            }
        };

        let itinerary = match parse_itinerary(&arguments) {
            Ok(itinerary) => itinerary,
            Err(e) => {
                warn!("[LLM] {e}");
                self.record("json-parse", &e).await;
                return Err(e.into());
            }
        };

        let dates: Vec<_> = trip.date_range.dates().collect();
        Ok(repair(
            itinerary,
            &RepairContext {
                destination: &trip.destination,
                dates: &dates,
                fx: &fx,
                weather: weather.as_deref(),
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::CurrencyPair;
    use crate::core::fx::{FxRateProvider, FxResult};
    use crate::core::llm::CompletionRequest;
    use crate::core::weather::WeatherOutlook;
    use crate::store::MemoryCache;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    struct FixedRate(f64);

    #[async_trait]
    impl FxRateProvider for FixedRate {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn fetch_rate(&self, pair: &CurrencyPair) -> Result<FxResult> {
            let rate = if pair.base() == "EGP" { self.0 } else { 1.0 / self.0 };
            Ok(FxResult {
                rate,
                date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
                provider: "fixed".to_string(),
            })
        }
    }

    #[derive(Debug)]
    struct CannedLlm {
        response: Result<String, u16>,
        last_prompt: Mutex<Option<String>>,
    }

    #[async_trait]
    impl CompletionClient for CannedLlm {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
            *self.last_prompt.lock().unwrap() = Some(request.messages[1].content.clone());
            self.response.clone().map_err(|status| LlmError::ApiError {
                status,
                message: "canned".to_string(),
            })
        }

        fn model_name(&self) -> &str {
            "canned"
        }
    }

    struct Sunny;

    #[async_trait]
    impl WeatherProvider for Sunny {
        async fn outlook(
            &self,
            _place: &str,
            _from: NaiveDate,
            _to: NaiveDate,
        ) -> Result<Option<WeatherOutlook>> {
            Ok(Some(WeatherOutlook {
                place: "Dubai".to_string(),
                high_c: 41.0,
                low_c: 30.0,
            }))
        }
    }

    struct Broken;

    #[async_trait]
    impl WeatherProvider for Broken {
        async fn outlook(
            &self,
            _place: &str,
            _from: NaiveDate,
            _to: NaiveDate,
        ) -> Result<Option<WeatherOutlook>> {
            Err(anyhow!("connection refused"))
        }
    }

    fn fx_service() -> Arc<FxService> {
        Arc::new(FxService::new(
            vec![Arc::new(FixedRate(0.074))],
            Arc::new(MemoryCache::new()),
            Duration::from_secs(3600),
        ))
    }

    fn trip() -> TripRequest {
        serde_json::from_value(json!({
            "destination": "Dubai",
            "country": "Egypt",
            "dateRange": {"from": "2025-07-01", "to": "2025-07-03"},
            "dailyBudget": 3000
        }))
        .unwrap()
    }

    fn llm(response: Result<String, u16>) -> Arc<CannedLlm> {
        Arc::new(CannedLlm {
            response,
            last_prompt: Mutex::new(None),
        })
    }

    #[test]
    fn test_currencies() {
        assert_eq!(
            Planner::currencies(&trip()),
            ("EGP".to_string(), "AED".to_string())
        );
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn test_plan_future_is_send() {
        let planner = Planner::new(fx_service(), Some(llm(Ok("{}".to_string()))))
            .with_error_log(Some(ErrorLog::new("errors.jsonl")));
        let trip = trip();
        let future = planner.plan(&trip);
        assert_send(&future);
    }

    #[tokio::test]
    async fn test_plan_repairs_model_output() {
        let canned = llm(Ok(json!({"intro": "Hello Dubai", "days": []}).to_string()));
        let planner = Planner::new(fx_service(), Some(canned.clone())).with_weather(Arc::new(Sunny));

        let itinerary = planner.plan(&trip()).await.unwrap();

        assert_eq!(itinerary.days.len(), 2);
        assert_eq!(itinerary.food_list.len(), 10);
        assert_eq!(
            itinerary.weather.as_deref(),
            Some("Expect highs around 41°C and lows around 30°C in Dubai.")
        );
        let currency = itinerary.currency.unwrap();
        assert_eq!(currency.home_to_destination.as_deref(), Some("1 EGP = 0.0740 AED"));

        let prompt = canned.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("1 EGP = 0.0740 AED"));
        assert!(prompt.contains("WEATHER"));
    }

    #[tokio::test]
    async fn test_weather_failure_is_not_fatal() {
        let canned = llm(Ok(json!({"intro": "Hi"}).to_string()));
        let planner = Planner::new(fx_service(), Some(canned.clone())).with_weather(Arc::new(Broken));

        let itinerary = planner.plan(&trip()).await.unwrap();

        assert!(itinerary.weather.is_none());
        let prompt = canned.last_prompt.lock().unwrap().clone().unwrap();
        assert!(!prompt.contains("WEATHER"));
    }

    #[tokio::test]
    async fn test_invalid_request_skips_llm() {
        let canned = llm(Ok("{}".to_string()));
        let planner = Planner::new(fx_service(), Some(canned.clone()));
        let mut bad = trip();
        bad.country = String::new();

        let err = planner.plan(&bad).await.unwrap_err();

        assert!(matches!(err, PlanError::InvalidRequest(TripError::MissingField("country"))));
        assert!(canned.last_prompt.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_error_mapping() {
        let planner = Planner::new(fx_service(), Some(llm(Err(400))));
        assert!(matches!(planner.plan(&trip()).await, Err(PlanError::Rejected(_))));

        let planner = Planner::new(fx_service(), Some(llm(Ok("[]".to_string()))));
        assert!(matches!(planner.plan(&trip()).await, Err(PlanError::Malformed(_))));

        let planner = Planner::new(fx_service(), None);
        assert!(matches!(planner.plan(&trip()).await, Err(PlanError::Unavailable(_))));
    }
}
