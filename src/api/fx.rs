use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::AppState;
use crate::core::fx::FxResult;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FxQuery {
    base: String,
    quote: String,
}

/// Always 200: bad or missing codes degrade to the identity rate.
pub async fn get_rate(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FxQuery>,
) -> Json<FxResult> {
    Json(state.planner.fx().get_rate(&query.base, &query.quote).await)
}
