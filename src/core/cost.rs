//! Parsing of dual-currency cost strings such as `"25 EUR (27 USD)"`.

use regex::Regex;
use serde::Serialize;

use crate::core::fx::FxSnapshot;

const AMOUNT: &str = r"(\d[\d,]*(?:\.\d+)?)";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ParsedCost {
    /// Amount in the destination currency.
    pub dest: f64,
    /// Amount in the home currency.
    pub home: f64,
}

impl ParsedCost {
    pub const ZERO: ParsedCost = ParsedCost { dest: 0.0, home: 0.0 };

    fn mirrored(amount: f64) -> Self {
        Self {
            dest: amount,
            home: amount,
        }
    }
}

impl std::ops::Add for ParsedCost {
    type Output = ParsedCost;

    fn add(self, rhs: ParsedCost) -> ParsedCost {
        ParsedCost {
            dest: self.dest + rhs.dest,
            home: self.home + rhs.home,
        }
    }
}

fn amount(s: &str) -> Option<f64> {
    s.replace(',', "").parse().ok()
}

/// What a cost string says, before any currency conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cost {
    /// `"Free"`, `"Included"` or blank.
    Zero,
    /// Both currencies were given.
    Both(ParsedCost),
    DestOnly(f64),
    HomeOnly(f64),
    /// A number with no recognisable currency.
    Unlabelled(f64),
}

impl Cost {
    /// Display reading: a missing side mirrors the amount that was given.
    pub fn mirrored(self) -> ParsedCost {
        match self {
            Cost::Zero => ParsedCost::ZERO,
            Cost::Both(cost) => cost,
            Cost::DestOnly(a) | Cost::HomeOnly(a) | Cost::Unlabelled(a) => ParsedCost::mirrored(a),
        }
    }

    /// Fills a missing side from measured rates. `None` when that would
    /// require guessing a rate or a currency.
    pub fn converted(self, fx: &FxSnapshot) -> Option<ParsedCost> {
        match self {
            Cost::Zero => Some(ParsedCost::ZERO),
            Cost::Both(cost) => Some(cost),
            _ if fx.is_same_currency() => Some(self.mirrored()),
            Cost::DestOnly(dest) if fx.is_measured() => Some(ParsedCost {
                dest,
                home: dest * fx.reverse.rate,
            }),
            Cost::HomeOnly(home) if fx.is_measured() => Some(ParsedCost {
                dest: home * fx.forward.rate,
                home,
            }),
            _ => None,
        }
    }
}

/// Cost patterns for one destination/home currency pair, compiled once.
#[derive(Debug, Clone)]
pub struct CostParser {
    dest_then_home: Regex,
    home_then_dest: Regex,
    dest_only: Regex,
    home_only: Regex,
    any_number: Regex,
}

impl CostParser {
    pub fn new(dest_iso: &str, home_iso: &str) -> Result<Self, regex::Error> {
        let dest = regex::escape(dest_iso);
        let home = regex::escape(home_iso);
        let pattern = |body: String| Regex::new(&format!("(?i){body}"));

        Ok(Self {
            // "25 EUR (27 USD)" / "150 EGP ($5 USD)"
            dest_then_home: pattern(format!(
                r"{AMOUNT}\s*{dest}\s*\(\s*\$?{AMOUNT}\s*{home}\s*\)"
            ))?,
            // "$27 USD (25 EUR)"
            home_then_dest: pattern(format!(
                r"\$?{AMOUNT}\s*{home}\s*\(\s*{AMOUNT}\s*{dest}\s*\)"
            ))?,
            dest_only: pattern(format!(r"\$?{AMOUNT}\s*{dest}"))?,
            home_only: pattern(format!(r"\$?{AMOUNT}\s*{home}"))?,
            any_number: Regex::new(AMOUNT)?,
        })
    }

    /// `None` when the text carries no amount at all.
    pub fn classify(&self, text: &str) -> Option<Cost> {
        let text = text.trim();
        if text.is_empty()
            || text.eq_ignore_ascii_case("free")
            || text.eq_ignore_ascii_case("included")
        {
            return Some(Cost::Zero);
        }

        if let Some(caps) = self.dest_then_home.captures(text) {
            return Some(Cost::Both(ParsedCost {
                dest: amount(&caps[1])?,
                home: amount(&caps[2])?,
            }));
        }
        if let Some(caps) = self.home_then_dest.captures(text) {
            return Some(Cost::Both(ParsedCost {
                dest: amount(&caps[2])?,
                home: amount(&caps[1])?,
            }));
        }
        if let Some(caps) = self.dest_only.captures(text) {
            return amount(&caps[1]).map(Cost::DestOnly);
        }
        if let Some(caps) = self.home_only.captures(text) {
            return amount(&caps[1]).map(Cost::HomeOnly);
        }
        self.any_number
            .captures(text)
            .and_then(|caps| amount(&caps[1]))
            .map(Cost::Unlabelled)
    }
}

/// Like [`parse_cost`], but `None` when the text carries no amount at all.
pub fn try_parse_cost(text: &str, dest_iso: &str, home_iso: &str) -> Option<ParsedCost> {
    let parser = CostParser::new(dest_iso, home_iso).ok()?;
    parser.classify(text).map(Cost::mirrored)
}

/// Parses a cost string into destination and home amounts, zero when nothing
/// can be read. A single-currency amount is mirrored into the other side.
pub fn parse_cost(text: &str, dest_iso: &str, home_iso: &str) -> ParsedCost {
    try_parse_cost(text, dest_iso, home_iso).unwrap_or(ParsedCost::ZERO)
}
