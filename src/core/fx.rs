//! Exchange-rate lookup with a prioritized provider chain, plausibility
//! checks and a short-lived cache.

use crate::core::cache::Cache;
use crate::core::currency::CurrencyPair;
use crate::core::sanity::SanityValidator;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Provider tag used when no upstream answered.
pub const FALLBACK_PROVIDER: &str = "fallback";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FxResult {
    /// Price of one unit of base expressed in quote.
    pub rate: f64,
    pub date: NaiveDate,
    pub provider: String,
}

impl FxResult {
    pub fn fallback(rate: f64) -> Self {
        Self {
            rate,
            date: Utc::now().date_naive(),
            provider: FALLBACK_PROVIDER.to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.provider == FALLBACK_PROVIDER
    }

    /// The same quote read in the opposite direction.
    pub fn inverted(&self) -> Self {
        Self {
            rate: 1.0 / self.rate,
            date: self.date,
            provider: self.provider.clone(),
        }
    }
}

/// One upstream source of exchange rates.
///
/// Implementations report every failure (transport, status, error payload,
/// missing rate) as `Err`; the chain decides what to do next.
#[async_trait]
pub trait FxRateProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_rate(&self, pair: &CurrencyPair) -> Result<FxResult>;
}

/// Rates in both directions between a traveller's home currency and the
/// destination currency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FxSnapshot {
    pub home: String,
    pub dest: String,
    /// 1 home = `forward.rate` dest.
    pub forward: FxResult,
    /// 1 dest = `reverse.rate` home.
    pub reverse: FxResult,
}

impl FxSnapshot {
    pub fn is_same_currency(&self) -> bool {
        self.home == self.dest
    }

    /// True when the forward rate came from a real provider.
    pub fn is_measured(&self) -> bool {
        !self.is_same_currency() && !self.forward.is_fallback()
    }

    /// Short provenance line for the rates.
    pub fn note(&self) -> String {
        if self.is_same_currency() {
            "Same currency".to_string()
        } else if self.is_measured() {
            format!("{} · {}", self.forward.provider, self.forward.date)
        } else {
            "Estimated rate, live FX unavailable".to_string()
        }
    }
}

pub struct FxService {
    providers: Vec<Arc<dyn FxRateProvider>>,
    validator: SanityValidator,
    cache: Arc<dyn Cache<CurrencyPair, FxResult>>,
    ttl: Duration,
    last_resort: HashMap<CurrencyPair, f64>,
}

impl FxService {
    pub fn new(
        providers: Vec<Arc<dyn FxRateProvider>>,
        cache: Arc<dyn Cache<CurrencyPair, FxResult>>,
        ttl: Duration,
    ) -> Self {
        Self {
            providers,
            validator: SanityValidator::default(),
            cache,
            ttl,
            last_resort: HashMap::new(),
        }
    }

    pub fn with_validator(mut self, validator: SanityValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Fixed rates returned, still tagged as fallback, when every provider
    /// fails for these pairs.
    pub fn with_last_resort(mut self, rates: HashMap<CurrencyPair, f64>) -> Self {
        self.last_resort = rates;
        self
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Looks up the rate for `base` -> `quote`. Never fails: malformed codes,
    /// identical currencies and exhausted providers all degrade to a fallback
    /// result.
    pub async fn get_rate(&self, base: &str, quote: &str) -> FxResult {
        let pair = match CurrencyPair::new(base, quote) {
            Ok(pair) => pair,
            Err(e) => {
                warn!("FX lookup with invalid pair '{base}'/'{quote}': {e}");
                return FxResult::fallback(1.0);
            }
        };
        self.get_pair_rate(&pair).await
    }

    /// Fetches home -> dest, then dest -> home. When only one direction
    /// reached a provider the other is derived from it.
    pub async fn snapshot(&self, home: &str, dest: &str) -> FxSnapshot {
        let mut forward = self.get_rate(home, dest).await;
        let mut reverse = self.get_rate(dest, home).await;
        if reverse.is_fallback() && !forward.is_fallback() {
            reverse = forward.inverted();
        } else if forward.is_fallback() && !reverse.is_fallback() {
            forward = reverse.inverted();
        }
        FxSnapshot {
            home: home.to_string(),
            dest: dest.to_string(),
            forward,
            reverse,
        }
    }

    pub async fn get_pair_rate(&self, pair: &CurrencyPair) -> FxResult {
        if pair.is_identity() {
            return FxResult::fallback(1.0);
        }

        if let Some(cached) = self.cache.get(pair).await {
            return cached;
        }

        for provider in &self.providers {
            match provider.fetch_rate(pair).await {
                Ok(result) if self.validator.accepts(pair, result.rate) => {
                    debug!(
                        "FX {pair} = {} from {} ({})",
                        result.rate, result.provider, result.date
                    );
                    self.cache
                        .put(pair.clone(), result.clone(), Some(self.ttl))
                        .await;
                    return result;
                }
                Ok(result) => {
                    warn!(
                        "[FX] {} returned implausible rate {} for {pair}, trying next provider",
                        provider.name(),
                        result.rate
                    );
                }
                Err(e) => {
                    warn!("[FX] {} failed for {pair}: {e:#}", provider.name());
                }
            }
        }

        let rate = self.last_resort.get(pair).copied().unwrap_or(1.0);
        error!("[FX] all sources failed for {pair}, returning {rate}");
        FxResult::fallback(rate)
    }
}
