//! The single error surface of the HTTP boundary.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Any failure in the voice pipeline.
///
/// Every variant surfaces to the client the same way: status 500 with a
/// JSON `{"error": message}` body.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Speech(#[from] alexo_speech::SpeechError),

    #[error(transparent)]
    Intent(#[from] alexo_intent::IntentError),

    #[error(transparent)]
    Calendar(#[from] alexo_providers::CalendarError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        error!(error = %self, "voice request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}
