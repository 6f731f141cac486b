use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherOutlook {
    /// Resolved place name, e.g. "Dubai, United Arab Emirates".
    pub place: String,
    pub high_c: f64,
    pub low_c: f64,
}

impl WeatherOutlook {
    pub fn summary(&self) -> String {
        format!(
            "Expect highs around {:.0}°C and lows around {:.0}°C in {}.",
            self.high_c, self.low_c, self.place
        )
    }
}

/// Forecast source used to enrich prompts.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// `Ok(None)` when the place is unknown.
    async fn outlook(
        &self,
        place: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Option<WeatherOutlook>>;
}
