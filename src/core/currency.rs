//! Currency codes, currency pairs and place-to-currency resolution.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// An ordered (base, quote) pair of ISO-4217 codes.
///
/// Both codes are trimmed and uppercased on construction; anything that is
/// not exactly three ASCII letters is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    base: String,
    quote: String,
}

impl CurrencyPair {
    pub fn new(base: &str, quote: &str) -> Result<Self> {
        Ok(Self {
            base: normalize_code(base)?,
            quote: normalize_code(quote)?,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }

    /// A pair whose base and quote are the same currency always converts at 1.
    pub fn is_identity(&self) -> bool {
        self.base == self.quote
    }

    pub fn inverse(&self) -> Self {
        Self {
            base: self.quote.clone(),
            quote: self.base.clone(),
        }
    }
}

impl Display for CurrencyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl FromStr for CurrencyPair {
    type Err = anyhow::Error;

    /// Accepts `USD/EUR`, `USD:EUR`, `USD-EUR` or `USDEUR`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some((base, quote)) = s.split_once(['/', ':', '-']) {
            return Self::new(base, quote);
        }
        if s.len() == 6 && s.is_ascii() {
            return Self::new(&s[..3], &s[3..]);
        }
        bail!("Invalid currency pair: {s}")
    }
}

fn normalize_code(code: &str) -> Result<String> {
    let code = code.trim();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        bail!("Invalid currency code: '{code}'");
    }
    Ok(code.to_ascii_uppercase())
}

const PLACE_TO_CURRENCY: &[(&str, &str)] = &[
    // GCC + MENA
    ("UNITED ARAB EMIRATES", "AED"),
    ("UAE", "AED"),
    ("DUBAI", "AED"),
    ("ABU DHABI", "AED"),
    ("SHARJAH", "AED"),
    ("EGYPT", "EGP"),
    ("CAIRO", "EGP"),
    ("ALEXANDRIA", "EGP"),
    ("LUXOR", "EGP"),
    ("SAUDI ARABIA", "SAR"),
    ("SAUDI", "SAR"),
    ("RIYADH", "SAR"),
    ("JEDDAH", "SAR"),
    ("QATAR", "QAR"),
    ("DOHA", "QAR"),
    ("KUWAIT", "KWD"),
    ("KUWAIT CITY", "KWD"),
    ("MOROCCO", "MAD"),
    ("MARRAKECH", "MAD"),
    ("JORDAN", "JOD"),
    ("AMMAN", "JOD"),
    // Europe
    ("BELGIUM", "EUR"),
    ("BRUSSELS", "EUR"),
    ("FRANCE", "EUR"),
    ("PARIS", "EUR"),
    ("GERMANY", "EUR"),
    ("BERLIN", "EUR"),
    ("ITALY", "EUR"),
    ("ROME", "EUR"),
    ("SPAIN", "EUR"),
    ("MADRID", "EUR"),
    ("BARCELONA", "EUR"),
    ("NETHERLANDS", "EUR"),
    ("AMSTERDAM", "EUR"),
    ("PORTUGAL", "EUR"),
    ("LISBON", "EUR"),
    ("GREECE", "EUR"),
    ("ATHENS", "EUR"),
    ("UNITED KINGDOM", "GBP"),
    ("UK", "GBP"),
    ("LONDON", "GBP"),
    ("SWITZERLAND", "CHF"),
    ("ZURICH", "CHF"),
    ("TURKEY", "TRY"),
    ("ISTANBUL", "TRY"),
    // Americas
    ("UNITED STATES", "USD"),
    ("USA", "USD"),
    ("NEW YORK", "USD"),
    ("CANADA", "CAD"),
    ("TORONTO", "CAD"),
    ("MEXICO", "MXN"),
    ("BRAZIL", "BRL"),
    // Asia-Pacific
    ("JAPAN", "JPY"),
    ("TOKYO", "JPY"),
    ("AUSTRALIA", "AUD"),
    ("SYDNEY", "AUD"),
    ("THAILAND", "THB"),
    ("BANGKOK", "THB"),
    ("SINGAPORE", "SGD"),
    ("MALAYSIA", "MYR"),
    ("KUALA LUMPUR", "MYR"),
    ("INDIA", "INR"),
    ("MUMBAI", "INR"),
    ("DELHI", "INR"),
    ("CHINA", "CNY"),
    ("INDONESIA", "IDR"),
    ("BALI", "IDR"),
];

fn lookup(place: &str) -> Option<&'static str> {
    PLACE_TO_CURRENCY
        .iter()
        .find(|(name, _)| *name == place)
        .map(|(_, code)| *code)
}

/// Resolves a country or city name to its ISO-4217 currency code.
///
/// The whole string is looked up first; three-letter inputs that are not a
/// known place are treated as codes and returned uppercased. Otherwise each part of a
/// `"City, Country"` or `"City - Region"` string, then its last word.
/// Returns `None` for unknown places.
pub fn currency_code(place: &str) -> Option<String> {
    let place = place.trim().to_uppercase();
    if place.is_empty() {
        return None;
    }
    // "UAE" and "USA" are places, not codes
    if let Some(code) = lookup(&place) {
        return Some(code.to_string());
    }
    if place.len() == 3 && place.chars().all(|c| c.is_ascii_alphabetic()) {
        return Some(place);
    }

    let parts: Vec<&str> = place
        .split([',', '-', '–'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    for part in &parts {
        if let Some(code) = lookup(part) {
            return Some(code.to_string());
        }
    }

    parts
        .first()
        .and_then(|first| first.split_whitespace().last())
        .and_then(lookup)
        .map(str::to_string)
}
