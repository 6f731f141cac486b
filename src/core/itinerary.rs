//! Canonical itinerary document returned to clients.
//!
//! Deserialization is lenient about the shapes models commonly get wrong:
//! a string where a list is expected, numbers where strings are expected.
//! Fields the schema does not know are kept in `extra` and passed through.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Itinerary {
    #[serde(default, deserialize_with = "lenient_string")]
    pub intro: Option<String>,
    #[serde(default, deserialize_with = "string_or_list", skip_serializing_if = "Vec::is_empty")]
    pub before_you_go: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visa: Option<Visa>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<CurrencyInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub averages: Option<Averages>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub weather: Option<String>,
    #[serde(default, deserialize_with = "string_or_list", skip_serializing_if = "Vec::is_empty")]
    pub culture_tips: Vec<String>,
    #[serde(default)]
    pub food_list: Vec<FoodItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub practical_info: Option<PracticalInfo>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub tips: Option<String>,
    #[serde(default)]
    pub days: Vec<Day>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<Footer>,
    /// Repairs applied by the server, in the order they were made.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visa {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(rename = "type", default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub application_method: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub fee: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub validity_period: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub appointment_warning: Option<String>,
    #[serde(default, deserialize_with = "string_or_list", skip_serializing_if = "Vec::is_empty")]
    pub additional_requirements: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyInfo {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub destination_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub home_to_destination: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub destination_to_home: Option<String>,
    /// Where the quoted rates came from, e.g. `"exchangerate.host · 2025-06-30"`.
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub cash_culture: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub tipping_norms: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub atm_availability: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub card_acceptance: Option<String>,
}

/// Typical nightly accommodation prices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Averages {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub hostel: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub mid_hotel: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub high_end: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodItem {
    #[serde(default, deserialize_with = "required_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Set on entries the server added to reach the minimum list length.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub placeholder: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticalInfo {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub power_plug_type: Option<String>,
    #[serde(default, deserialize_with = "string_or_list", skip_serializing_if = "Vec::is_empty")]
    pub sim_card_options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_numbers: Option<EmergencyNumbers>,
    #[serde(default, deserialize_with = "string_or_list", skip_serializing_if = "Vec::is_empty")]
    pub common_scams: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list", skip_serializing_if = "Vec::is_empty")]
    pub safety_apps: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list", skip_serializing_if = "Vec::is_empty")]
    pub health_requirements: Vec<String>,
}

/// Either a structured set of numbers or one free-text line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmergencyNumbers {
    Listed(EmergencyContacts),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmergencyContacts {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub police: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub medical: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub fire: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub tourist: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Day {
    #[serde(default, deserialize_with = "required_string")]
    pub date: String,
    #[serde(default, deserialize_with = "required_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub cost: Option<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "required_string")]
    pub text: String,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub cost: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub map_link: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Footer {
    #[serde(default, deserialize_with = "string_or_list")]
    pub disclaimers: Vec<String>,
}

impl Itinerary {
    /// Generic plan served when no model output can be used.
    pub fn fallback(destination: &str) -> Self {
        let place = if destination.trim().is_empty() {
            "your destination"
        } else {
            destination.trim()
        };
        let day = |n: usize, title: &str, steps: [&str; 3]| Day {
            date: format!("Day {n}"),
            title: title.to_string(),
            cost: None,
            steps: steps
                .iter()
                .map(|text| Step {
                    text: text.to_string(),
                    ..Step::default()
                })
                .collect(),
        };

        Itinerary {
            intro: Some(format!(
                "We could not generate a personalised itinerary for {place} right now. \
                 Here is a simple outline to get you started; please try again shortly."
            )),
            days: vec![
                day(
                    1,
                    "Arrival",
                    [
                        "Check into accommodation",
                        "Explore the local area",
                        "Welcome dinner",
                    ],
                ),
                day(
                    2,
                    "Main attractions",
                    [
                        "Visit popular landmarks",
                        "Cultural experiences",
                        "Local cuisine tasting",
                    ],
                ),
                day(
                    3,
                    "Adventure day",
                    [
                        "Outdoor activities",
                        "Hidden gems exploration",
                        "Sunset viewing",
                    ],
                ),
            ],
            footer: Some(Footer {
                disclaimers: vec!["This is a fallback itinerary due to technical issues.".to_string()],
            }),
            notices: vec!["Fallback itinerary: the AI service could not be used.".to_string()],
            ..Itinerary::default()
        }
    }
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_to_string(Value::deserialize(deserializer)?))
}

fn required_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.unwrap_or_default())
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches("/5").trim().parse().ok(),
        _ => None,
    })
}

/// A list of strings, a single string (split on newlines and bullets) or null.
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().filter_map(scalar_to_string).collect(),
        Value::String(s) => s
            .lines()
            .map(|line| line.trim().trim_start_matches(['•', '-', '*']).trim())
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
        Value::Null => Vec::new(),
        other => scalar_to_string(other).into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lenient_shapes() {
        let itinerary: Itinerary = serde_json::from_value(json!({
            "intro": "Welcome",
            "beforeYouGo": "• Get an eSIM\n• Book the Burj Khalifa",
            "foodList": [{"name": "Al Ustad", "rating": "4.6", "source": "Google"}],
            "practicalInfo": {
                "simCardOptions": "du or Etisalat",
                "emergencyNumbers": {"police": 999, "medical": "998"}
            },
            "averages": {"hostel": 30, "midHotel": "120 AED"},
            "days": []
        }))
        .unwrap();

        assert_eq!(itinerary.before_you_go, vec!["Get an eSIM", "Book the Burj Khalifa"]);
        assert_eq!(itinerary.food_list[0].rating, Some(4.6));
        let info = itinerary.practical_info.unwrap();
        assert_eq!(info.sim_card_options, vec!["du or Etisalat"]);
        assert_eq!(
            info.emergency_numbers,
            Some(EmergencyNumbers::Listed(EmergencyContacts {
                police: Some("999".to_string()),
                medical: Some("998".to_string()),
                ..EmergencyContacts::default()
            }))
        );
        assert_eq!(itinerary.averages.unwrap().hostel, Some("30".to_string()));
    }

    #[test]
    fn test_unknown_fields_pass_through() {
        let itinerary: Itinerary = serde_json::from_value(json!({
            "intro": "Hi",
            "totalCostLocal": "500 AED",
            "days": []
        }))
        .unwrap();
        assert_eq!(itinerary.extra.get("totalCostLocal"), Some(&json!("500 AED")));

        let out = serde_json::to_value(&itinerary).unwrap();
        assert_eq!(out["totalCostLocal"], "500 AED");
    }

    #[test]
    fn test_placeholder_flag_serialization() {
        let real = FoodItem {
            name: "Ravi".to_string(),
            ..FoodItem::default()
        };
        let placeholder = FoodItem {
            name: "Local recommendation 1".to_string(),
            placeholder: true,
            ..FoodItem::default()
        };
        assert!(serde_json::to_value(&real).unwrap().get("placeholder").is_none());
        assert_eq!(serde_json::to_value(&placeholder).unwrap()["placeholder"], true);
    }

    #[test]
    fn test_fallback_is_complete() {
        let fallback = Itinerary::fallback("Dubai");
        assert!(fallback.intro.as_deref().unwrap().contains("Dubai"));
        assert_eq!(fallback.days.len(), 3);
        assert!(fallback.days.iter().all(|d| d.steps.len() == 3));
        assert!(!fallback.notices.is_empty());
    }
}
