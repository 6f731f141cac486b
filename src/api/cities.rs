use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use super::AppState;
use crate::core::cities::CitySuggestion;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CityQuery {
    q: String,
}

pub async fn search_cities(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CityQuery>,
) -> Json<Vec<CitySuggestion>> {
    let q = query.q.trim();
    if q.is_empty() {
        return Json(Vec::new());
    }

    let Some(search) = &state.cities else {
        return Json(vec![CitySuggestion::echo(q)]);
    };

    match search.search(q).await {
        Ok(results) => Json(results),
        Err(e) => {
            warn!("[Cities] search for '{q}' failed: {e:#}");
            if let Some(log) = state.planner.error_log() {
                log.append("cities", &e).await;
            }
            Json(vec![CitySuggestion::echo(q)])
        }
    }
}
