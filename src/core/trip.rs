//! The travel-preferences form submitted by a client.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Longest trip we will plan in one request.
pub const MAX_TRIP_DAYS: i64 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TripError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Trip end date {to} is before start date {from}")]
    EndBeforeStart { from: NaiveDate, to: NaiveDate },

    #[error("Trip of {days} days exceeds the {max} day limit")]
    TooLong { days: i64, max: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(deserialize_with = "flexible_date", serialize_with = "iso_date")]
    pub from: NaiveDate,
    #[serde(deserialize_with = "flexible_date", serialize_with = "iso_date")]
    pub to: NaiveDate,
}

impl DateRange {
    /// Number of planned days: the span between the two dates, at least one.
    pub fn duration_days(&self) -> i64 {
        (self.to - self.from).num_days().max(1)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.from.iter_days().take(self.duration_days() as usize)
    }
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp, as sent by browsers.
fn flexible_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .map_err(|_| serde::de::Error::custom(format!("invalid date '{raw}'")))
}

fn iso_date<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&date.format("%Y-%m-%d").to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripRequest {
    pub destination: String,
    /// Home country of the travellers.
    pub country: String,
    pub date_range: DateRange,
    /// In US dollars, whatever the home currency.
    #[serde(default, alias = "budgetPerDay")]
    pub daily_budget: Option<f64>,
    #[serde(default)]
    pub group_type: Option<String>,
    #[serde(default)]
    pub travel_vibe: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub dietary: Option<String>,
    #[serde(default)]
    pub accommodation: Option<String>,
    #[serde(default)]
    pub transport_pref: Option<String>,
    #[serde(default)]
    pub occasion: Option<String>,
    #[serde(default)]
    pub must_see: Option<String>,
    #[serde(default)]
    pub avoid: Option<String>,
}

impl TripRequest {
    /// Checks the request and returns the trip length in days.
    pub fn validate(&self) -> Result<i64, TripError> {
        if self.destination.trim().is_empty() {
            return Err(TripError::MissingField("destination"));
        }
        if self.country.trim().is_empty() {
            return Err(TripError::MissingField("country"));
        }
        let DateRange { from, to } = self.date_range;
        if to < from {
            return Err(TripError::EndBeforeStart { from, to });
        }
        let days = self.date_range.duration_days();
        if days > MAX_TRIP_DAYS {
            return Err(TripError::TooLong {
                days,
                max: MAX_TRIP_DAYS,
            });
        }
        Ok(days)
    }

    pub fn duration_days(&self) -> i64 {
        self.date_range.duration_days()
    }
}
