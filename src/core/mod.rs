//! Domain types and logic: FX lookup, itinerary generation and repair.

pub mod cache;
pub mod cities;
pub mod config;
pub mod cost;
pub mod currency;
pub mod fx;
pub mod itinerary;
pub mod llm;
pub mod log;
pub mod planner;
pub mod prompt;
pub mod repair;
pub mod sanity;
pub mod trip;
pub mod weather;

// Re-export main types for cleaner imports
pub use cache::Cache;
pub use currency::{CurrencyPair, currency_code};
pub use fx::{FxRateProvider, FxResult, FxService, FxSnapshot};
pub use itinerary::Itinerary;
pub use llm::{CompletionClient, LlmError, RetryingClient};
pub use planner::{PlanError, Planner};
pub use trip::TripRequest;
