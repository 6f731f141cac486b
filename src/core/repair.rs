//! Validation and repair of model output.
//!
//! One policy for every itinerary: lists are padded to their minimum length
//! with entries marked as placeholders, measured data replaces model guesses,
//! and numbers are never invented. Each repair leaves a line in `notices`.

use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::core::cost::{CostParser, ParsedCost};
use crate::core::fx::FxSnapshot;
use crate::core::itinerary::{CurrencyInfo, Day, FoodItem, Itinerary, Step};

pub const MIN_FOOD_ITEMS: usize = 10;

#[derive(Debug, Error)]
pub enum RepairError {
    #[error("Malformed AI JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Malformed AI JSON: expected an object, got {0}")]
    NotAnObject(&'static str),
}

/// What the server knows about the trip independently of the model.
#[derive(Debug, Clone, Copy)]
pub struct RepairContext<'a> {
    pub destination: &'a str,
    pub dates: &'a [NaiveDate],
    pub fx: &'a FxSnapshot,
    /// Forecast summary, used when the model left `weather` empty.
    pub weather: Option<&'a str>,
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parses raw tool-call arguments into the canonical shape.
pub fn parse_itinerary(raw: &str) -> Result<Itinerary, RepairError> {
    let value: Value = serde_json::from_str(raw)?;
    if !value.is_object() {
        return Err(RepairError::NotAnObject(kind_of(&value)));
    }
    Ok(serde_json::from_value(value)?)
}

pub fn repair(mut itinerary: Itinerary, ctx: &RepairContext<'_>) -> Itinerary {
    let mut notices = Vec::new();

    if itinerary.intro.as_deref().is_none_or(|s| s.trim().is_empty()) {
        itinerary.intro = Some(format!(
            "Your {}-day trip to {}.",
            ctx.dates.len(),
            ctx.destination
        ));
        notices.push("Introduction was missing and has been replaced with a placeholder.".to_string());
    }

    if itinerary.weather.as_deref().is_none_or(|s| s.trim().is_empty())
        && let Some(weather) = ctx.weather
    {
        itinerary.weather = Some(weather.to_string());
        notices.push("Weather was filled in from the forecast.".to_string());
    }

    repair_food_list(&mut itinerary.food_list, &mut notices);
    repair_days(&mut itinerary.days, ctx.dates, &mut notices);
    repair_currency(&mut itinerary.currency, ctx.fx, &mut notices);

    if itinerary.total_cost.as_deref().is_none_or(|s| s.trim().is_empty()) {
        itinerary.total_cost = None;
        if let Some(total) = sum_day_costs(&itinerary.days, ctx.fx) {
            itinerary.total_cost = Some(format!(
                "{} {} ({} {})",
                format_amount(total.dest),
                ctx.fx.dest,
                format_amount(total.home),
                ctx.fx.home
            ));
            notices.push("Total cost was computed from the daily costs.".to_string());
        }
    }

    if !notices.is_empty() {
        debug!("Applied {} repairs to itinerary", notices.len());
    }
    itinerary.notices.extend(notices);
    itinerary
}

fn repair_food_list(food: &mut Vec<FoodItem>, notices: &mut Vec<String>) {
    food.retain(|item| !item.name.trim().is_empty());
    if food.len() >= MIN_FOOD_ITEMS {
        return;
    }
    let missing = MIN_FOOD_ITEMS - food.len();
    for n in 1..=missing {
        food.push(FoodItem {
            name: format!("Local recommendation {n}"),
            note: Some("Ask locals or check recent reviews for a nearby favourite.".to_string()),
            placeholder: true,
            ..FoodItem::default()
        });
    }
    notices.push(format!(
        "Food list had fewer than {MIN_FOOD_ITEMS} entries; {missing} placeholder recommendations were added."
    ));
}

fn repair_days(days: &mut Vec<Day>, dates: &[NaiveDate], notices: &mut Vec<String>) {
    let expected = dates.len();

    if days.len() > expected {
        notices.push(format!(
            "Itinerary had {} days for a {expected}-day trip; extra days were removed.",
            days.len()
        ));
        days.truncate(expected);
    }

    let mut filled_dates = 0;
    for (day, date) in days.iter_mut().zip(dates) {
        if day.date.trim().is_empty() {
            day.date = date.format("%Y-%m-%d").to_string();
            filled_dates += 1;
        }
    }
    if filled_dates > 0 {
        notices.push(format!("{filled_dates} days were missing a date."));
    }

    if days.len() < expected {
        let missing = expected - days.len();
        for (index, date) in dates.iter().enumerate().skip(days.len()) {
            days.push(Day {
                date: date.format("%Y-%m-%d").to_string(),
                title: format!("Day {}: free exploration", index + 1),
                cost: None,
                steps: vec![Step {
                    text: "Free time to explore at your own pace.".to_string(),
                    ..Step::default()
                }],
            });
        }
        notices.push(format!(
            "Itinerary was missing {missing} of {expected} days; placeholder days were added."
        ));
    }
}

fn repair_currency(
    currency: &mut Option<CurrencyInfo>,
    fx: &FxSnapshot,
    notices: &mut Vec<String>,
) {
    if !fx.is_measured() && !fx.is_same_currency() {
        return;
    }

    let info = currency.get_or_insert_with(CurrencyInfo::default);
    let home_to_destination = format!("1 {} = {:.4} {}", fx.home, fx.forward.rate, fx.dest);
    let destination_to_home = format!("1 {} = {:.4} {}", fx.dest, fx.reverse.rate, fx.home);

    let model_disagrees = [
        (&info.home_to_destination, &home_to_destination),
        (&info.destination_to_home, &destination_to_home),
    ]
    .iter()
    .any(|(given, measured)| given.as_deref().is_some_and(|g| g != measured.as_str()));

    info.destination_code = Some(fx.dest.clone());
    info.home_to_destination = Some(home_to_destination);
    info.destination_to_home = Some(destination_to_home);
    info.source = Some(fx.note());

    if model_disagrees {
        notices.push(format!(
            "Exchange rates were replaced with measured values ({}).",
            fx.note()
        ));
    }
}

/// Sum of every day's cost, or `None` if any day has no readable cost or
/// names one currency while no measured rate is available to fill the other.
fn sum_day_costs(days: &[Day], fx: &FxSnapshot) -> Option<ParsedCost> {
    if days.is_empty() {
        return None;
    }
    let parser = CostParser::new(&fx.dest, &fx.home).ok()?;
    days.iter().try_fold(ParsedCost::ZERO, |total, day| {
        let cost = parser.classify(day.cost.as_deref()?)?.converted(fx)?;
        Some(total + cost)
    })
}

fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{amount:.0}")
    } else {
        format!("{amount:.2}")
    }
}
