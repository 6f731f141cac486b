use super::ui;
use crate::core::itinerary::Itinerary;
use crate::core::planner::{PlanError, Planner};
use crate::core::trip::TripRequest;
use anyhow::{Context, Result};
use std::path::Path;

/// Reads a trip request from a JSON file.
pub fn read_request(path: &Path) -> Result<TripRequest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read trip request: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid trip request in {}", path.display()))
}

/// Plans a trip and prints the itinerary as JSON. On failure the fallback
/// itinerary is printed before the error is returned, except for requests
/// that never passed validation.
pub async fn run(planner: &Planner, request_path: &Path) -> Result<()> {
    let trip = read_request(request_path)?;

    match planner.plan(&trip).await {
        Ok(itinerary) => print_itinerary(&itinerary),
        Err(err @ PlanError::InvalidRequest(_)) => {
            Err(err).context("Trip request failed validation")
        }
        Err(err) => {
            eprintln!(
                "{}",
                ui::style_text(
                    "Live planning failed, showing a generic itinerary instead.",
                    ui::StyleType::Warning
                )
            );
            print_itinerary(&Itinerary::fallback(&trip.destination))?;
            Err(err.into())
        }
    }
}

fn print_itinerary(itinerary: &Itinerary) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(itinerary)?);
    for notice in &itinerary.notices {
        eprintln!("{}", ui::style_text(notice, ui::StyleType::Subtle));
    }
    Ok(())
}
