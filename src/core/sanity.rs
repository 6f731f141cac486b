//! Plausibility checks for rates returned by FX providers.

use crate::core::currency::CurrencyPair;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Expected range for one direction of a currency pair. The inverse direction
/// is checked against the inverted band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateBand {
    pub base: String,
    pub quote: String,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Default)]
pub struct SanityValidator {
    bands: Vec<RateBand>,
}

impl SanityValidator {
    pub fn new(bands: Vec<RateBand>) -> Self {
        Self { bands }
    }

    /// Non-positive and non-finite rates are always rejected. Pairs without a
    /// configured band accept any other rate.
    pub fn accepts(&self, pair: &CurrencyPair, rate: f64) -> bool {
        if !rate.is_finite() || rate <= 0.0 {
            return false;
        }

        for band in &self.bands {
            let (low, high) = if band.base.eq_ignore_ascii_case(pair.base())
                && band.quote.eq_ignore_ascii_case(pair.quote())
            {
                (band.min, band.max)
            } else if band.base.eq_ignore_ascii_case(pair.quote())
                && band.quote.eq_ignore_ascii_case(pair.base())
            {
                (1.0 / band.max, 1.0 / band.min)
            } else {
                continue;
            };

            if rate < low || rate > high {
                debug!("Rate {rate} for {pair} outside expected band [{low}, {high}]");
                return false;
            }
        }
        true
    }
}
