use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;

use super::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    status: &'static str,
    version: &'static str,
    fx_providers: Vec<String>,
    llm_configured: bool,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        fx_providers: state
            .planner
            .fx()
            .provider_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
        llm_configured: state.planner.has_llm(),
    })
}
