//! Briefing trigger endpoint

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Local;
use serde::Serialize;

use super::ApiState;
use crate::{Error, RunStage};

/// Body sent once the context is built and generation has been handed off
pub const ACK_BODY: &str = "Generating audio";

/// Build briefing router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new().route("/day", get(day)).with_state(state)
}

/// Trigger a briefing
///
/// Collects weather and calendars before answering; generation and playback
/// continue after the response has been sent.
async fn day(State(state): State<Arc<ApiState>>) -> Result<&'static str, DayError> {
    let run = state
        .pipeline
        .aggregate(&Local::now())
        .await
        .map_err(DayError::from)?;

    tracing::info!(run_id = %run.id, stage = %RunStage::Acknowledged, "briefing acknowledged");
    // Detached: the handle is dropped and the run outlives this request
    drop(state.pipeline.spawn_generation(run));

    Ok(ACK_BODY)
}

/// Briefing trigger errors
#[derive(Debug)]
pub enum DayError {
    WeatherUnavailable(String),
    Internal(String),
}

impl From<Error> for DayError {
    fn from(error: Error) -> Self {
        match error {
            Error::Weather(_) => Self::WeatherUnavailable(error.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for DayError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: ErrorBody,
        }

        #[derive(Serialize)]
        struct ErrorBody {
            code: &'static str,
            message: String,
        }

        let (status, code, message) = match self {
            Self::WeatherUnavailable(msg) => (StatusCode::BAD_GATEWAY, "weather_unavailable", msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg),
        };

        (status, Json(ErrorResponse { error: ErrorBody { code, message } })).into_response()
    }
}
