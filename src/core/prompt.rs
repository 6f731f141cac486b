//! Prompt assembly for itinerary generation.

use serde_json::{Value, json};
use std::fmt::Write;

use crate::core::fx::FxSnapshot;
use crate::core::llm::{ChatMessage, CompletionRequest, ToolSpec};
use crate::core::repair::MIN_FOOD_ITEMS;
use crate::core::trip::TripRequest;

pub const TOOL_NAME: &str = "generate_itinerary";

const SYSTEM_PROMPT: &str = "You are an expert travel consultant. \
Respond only by calling the generate_itinerary function with a JSON object \
that follows its schema. Do not write any other text.";

fn or_default<'a>(value: &'a Option<String>, default: &'a str) -> &'a str {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
}

pub fn user_message(
    trip: &TripRequest,
    days: i64,
    fx: &FxSnapshot,
    weather: Option<&str>,
) -> String {
    let (home, dest) = (&fx.home, &fx.dest);
    let mut msg = String::new();

    let _ = writeln!(
        msg,
        "Write a 2-sentence snapshot of what makes {} special, then plan the full trip.",
        trip.destination
    );
    let _ = writeln!(
        msg,
        "List 8-10 destination-specific things to do before leaving, and the visa situation \
         for {} citizens (type, cost in both currencies, how to apply, processing time).",
        trip.country
    );

    msg.push_str("\nTRIP INFO\n");
    let _ = writeln!(
        msg,
        "Dates: {} to {} ({days} days)",
        trip.date_range.from, trip.date_range.to
    );
    if let Some(budget) = trip.daily_budget {
        let _ = writeln!(msg, "Budget: ${budget} USD per day");
    }
    let _ = writeln!(
        msg,
        "Group: {} · {}",
        or_default(&trip.group_type, "Any"),
        or_default(&trip.travel_vibe, "Balanced")
    );
    let interests = if trip.interests.is_empty() {
        "General".to_string()
    } else {
        trip.interests.join(", ")
    };
    let _ = writeln!(msg, "Interests: {interests}");
    let _ = writeln!(msg, "Diet: {}", or_default(&trip.dietary, "None"));
    let optional = [
        ("Accommodation", &trip.accommodation),
        ("Transport", &trip.transport_pref),
        ("Occasion", &trip.occasion),
        ("Must see", &trip.must_see),
        ("Avoid", &trip.avoid),
    ];
    for (label, value) in optional {
        if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
            let _ = writeln!(msg, "{label}: {}", value.trim());
        }
    }

    msg.push_str("\nCURRENCY\n");
    let _ = writeln!(msg, "1 {home} = {:.4} {dest}", fx.forward.rate);
    let _ = writeln!(msg, "1 {dest} = {:.4} {home}", fx.reverse.rate);
    let _ = writeln!(msg, "{}", fx.note());

    if let Some(weather) = weather {
        msg.push_str("\nWEATHER\n");
        let _ = writeln!(msg, "{weather}");
    }

    msg.push_str("\nRULES\n");
    let _ = writeln!(
        msg,
        "- At least {MIN_FOOD_ITEMS} food items, each with a price, rating and source."
    );
    let _ = writeln!(
        msg,
        "- Every price shows both currencies: \"{dest} amount ({home} amount)\"."
    );
    let _ = writeln!(msg, "- Exactly {days} entries in days, one per date.");
    msg.push_str("- Emergency numbers must be strings.\n");
    msg.push_str("- Follow the function schema exactly.\n");
    msg
}

pub fn itinerary_tool() -> ToolSpec {
    ToolSpec {
        name: TOOL_NAME.to_string(),
        description: "Return the complete travel itinerary.".to_string(),
        parameters: itinerary_schema(),
    }
}

pub fn itinerary_request(
    trip: &TripRequest,
    days: i64,
    fx: &FxSnapshot,
    weather: Option<&str>,
    temperature: f32,
    max_tokens: Option<u32>,
) -> CompletionRequest {
    CompletionRequest {
        messages: vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(user_message(trip, days, fx, weather)),
        ],
        tool: itinerary_tool(),
        temperature,
        max_tokens,
    }
}

fn itinerary_schema() -> Value {
    let text = json!({"type": "string"});
    let text_list = json!({"type": "array", "items": {"type": "string"}});

    json!({
        "type": "object",
        "properties": {
            "intro": text,
            "beforeYouGo": text_list,
            "visa": {
                "type": "object",
                "properties": {
                    "required": {"type": "boolean"},
                    "type": text,
                    "applicationMethod": text,
                    "processingTime": text,
                    "fee": text,
                    "validityPeriod": text,
                    "appointmentWarning": text,
                    "additionalRequirements": text_list
                },
                "required": ["required", "type"]
            },
            "currency": {
                "type": "object",
                "properties": {
                    "destinationCode": text,
                    "homeToDestination": text,
                    "destinationToHome": text,
                    "cashCulture": text,
                    "tippingNorms": text,
                    "atmAvailability": text,
                    "cardAcceptance": text
                },
                "required": ["destinationCode", "homeToDestination", "destinationToHome"]
            },
            "averages": {
                "type": "object",
                "properties": {"hostel": text, "midHotel": text, "highEnd": text}
            },
            "weather": text,
            "cultureTips": text_list,
            "foodList": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": text,
                        "note": text,
                        "price": text,
                        "rating": {"type": "number"},
                        "source": text
                    },
                    "required": ["name", "source"]
                }
            },
            "practicalInfo": {
                "type": "object",
                "properties": {
                    "powerPlugType": text,
                    "simCardOptions": text_list,
                    "emergencyNumbers": {
                        "type": "object",
                        "properties": {
                            "police": text,
                            "medical": text,
                            "fire": text,
                            "tourist": text
                        }
                    },
                    "commonScams": text_list,
                    "safetyApps": text_list,
                    "healthRequirements": text_list
                }
            },
            "tips": text,
            "days": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "date": text,
                        "title": text,
                        "cost": text,
                        "steps": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "time": text,
                                    "text": text,
                                    "mode": text,
                                    "cost": text
                                },
                                "required": ["time", "text"]
                            }
                        }
                    },
                    "required": ["date", "title", "steps"]
                }
            },
            "totalCost": text,
            "footer": {
                "type": "object",
                "properties": {"disclaimers": text_list}
            }
        },
        "required": ["intro", "beforeYouGo", "visa", "currency", "cultureTips", "foodList", "days"]
    })
}
