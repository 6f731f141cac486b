use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::core::itinerary::Itinerary;
use crate::core::planner::PlanError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    /// A failure on the itinerary route; the body still carries a usable plan.
    #[error("{message}")]
    WithFallback {
        status: StatusCode,
        message: String,
        fallback: Box<Itinerary>,
    },
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fallback: Option<Box<Itinerary>>,
}

impl ApiError {
    /// Maps a planning failure to its HTTP response for `destination`.
    pub fn from_plan(err: PlanError, destination: &str) -> Self {
        let (status, message) = match &err {
            PlanError::InvalidRequest(e) => return ApiError::BadRequest(e.to_string()),
            PlanError::Unavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "AI service temporarily unavailable. Please try again.",
            ),
            PlanError::Rejected(_) => (
                StatusCode::BAD_GATEWAY,
                "AI service rejected the request. Please try again.",
            ),
            PlanError::Malformed(_) | PlanError::MissingToolCall(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Malformed AI JSON, please retry.",
            ),
        };
        ApiError::WithFallback {
            status,
            message: message.to_string(),
            fallback: Box::new(Itinerary::fallback(destination)),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(reason) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: reason,
                    fallback: None,
                },
            ),
            ApiError::WithFallback {
                status,
                message,
                fallback,
            } => (
                status,
                ErrorBody {
                    error: message,
                    fallback: Some(fallback),
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
