use axum::{Json, extract::State, extract::rejection::JsonRejection};
use std::sync::Arc;
use tracing::warn;

use super::AppState;
use super::error::{ApiError, ApiResult};
use crate::core::itinerary::Itinerary;
use crate::core::trip::TripRequest;

pub async fn create_itinerary(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TripRequest>, JsonRejection>,
) -> ApiResult<Json<Itinerary>> {
    let Json(trip) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            let reason = rejection.body_text();
            warn!("Rejected itinerary request: {reason}");
            if let Some(log) = state.planner.error_log() {
                log.append("bad-json", &reason).await;
            }
            return Err(ApiError::BadRequest(format!("Invalid request: {reason}")));
        }
    };

    state
        .planner
        .plan(&trip)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_plan(e, &trip.destination))
}
