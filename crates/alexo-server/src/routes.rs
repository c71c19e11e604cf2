//! Request routing: the voice endpoint and static file serving.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::DateTime;
use tracing::{debug, info};

use alexo_core::{CalendarEventDetails, ListEventsOptions, VoiceResponse};
use alexo_intent::{Action, IntentClient};
use alexo_providers::CalendarService;
use alexo_speech::Transcriber;

use crate::error::ServerError;

/// Shared state behind the main router.
#[derive(Clone)]
pub struct AppState {
    pub transcriber: Arc<Transcriber>,
    pub intent: Arc<IntentClient>,
    pub calendar: Arc<CalendarService>,
    pub static_dir: PathBuf,
}

/// Builds the main router: the voice endpoint, with static file serving
/// for everything else.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/process-voice", post(process_voice))
        .fallback(serve_static)
        .with_state(state)
}

/// The voice pipeline: transcribe, decide, act.
async fn process_voice(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<VoiceResponse>, ServerError> {
    let transcription = state.transcriber.transcribe(&body).await?;
    info!(transcription = %transcription.trim(), "audio transcribed");

    let decision = state.intent.determine_action(&transcription).await?;
    debug!(action = decision.action.as_str(), reason = %decision.reason, "action decided");

    let mut response = VoiceResponse::new(
        &transcription,
        decision.action.as_str(),
        Some(decision.reason),
    );

    match decision.action {
        Action::Create => {
            let details = state.intent.parse_create_event(&transcription).await?;
            response.action_details = Some(create_details(&details));
            response.event = Some(state.calendar.create_event(&details).await?);
        }
        Action::List => {
            let options = state.intent.parse_list_options(&transcription).await?;
            response.action_details = Some(list_details(&options));
            response.events = Some(state.calendar.list_events(&options).await?);
        }
        Action::Unknown => {}
    }

    Ok(Json(response))
}

/// `Creating a new calendar event: "<summary>"`.
fn create_details(details: &CalendarEventDetails) -> String {
    format!(
        "Creating a new calendar event: \"{}\"",
        details.summary.as_deref().unwrap_or("New Event")
    )
}

/// `Listing upcoming events`, or the explicit range and limit when the
/// utterance carried them.
fn list_details(options: &ListEventsOptions) -> String {
    let range = match (&options.time_min, &options.time_max) {
        (Some(min), Some(max)) => {
            format!("events from {} to {}", date_part(min), date_part(max))
        }
        _ => "upcoming events".to_string(),
    };
    let limit = options
        .max_results
        .map(|max| format!(" (limited to {max} events)"))
        .unwrap_or_default();
    format!("Listing {range}{limit}")
}

/// The calendar-date part of an ISO timestamp, for human-readable strings.
/// Timestamps the model produced without an offset pass through as-is.
fn date_part(timestamp: &str) -> String {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}

/// Serves files from the static directory. `/` maps to `index.html`.
async fn serve_static(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    if method != Method::GET {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let request_path = uri.path();
    let relative = if request_path == "/" {
        "index.html"
    } else {
        request_path.trim_start_matches('/')
    };

    let Some(file_path) = resolve_static(&state.static_dir, relative) else {
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    };

    match tokio::fs::read(&file_path).await {
        Ok(content) => (
            [(header::CONTENT_TYPE, content_type(&file_path))],
            content,
        )
            .into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}

/// Joins a request path under the static dir, rejecting anything that is
/// not a plain relative path (`..`, absolute components).
fn resolve_static(static_dir: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    if relative
        .components()
        .any(|component| !matches!(component, Component::Normal(_)))
    {
        return None;
    }
    Some(static_dir.join(relative))
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") => "text/html",
        Some("js") => "text/javascript",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use alexo_intent::IntentConfig;
    use alexo_providers::{CallbackSlot, GoogleConfig};
    use alexo_speech::SpeechConfig;

    /// State whose transcriber points at a nonexistent binary, so the
    /// pipeline fails at its first step; static serving works normally.
    fn test_state(static_dir: &Path) -> AppState {
        let speech = SpeechConfig::new().with_ffmpeg_path("/nonexistent/alexo-test-ffmpeg");
        let google = GoogleConfig::new()
            .with_credentials_path(static_dir.join("oauth_credentials.json"))
            .with_token_path(static_dir.join("token.json"));
        AppState {
            transcriber: Arc::new(Transcriber::new(speech)),
            intent: Arc::new(IntentClient::new(IntentConfig::new("test-key"))),
            calendar: Arc::new(CalendarService::new(google, Arc::new(CallbackSlot::new()))),
            static_dir: static_dir.to_path_buf(),
        }
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[tokio::test]
    async fn root_serves_index_html() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>alexo</html>").unwrap();
        let app = build_router(test_state(dir.path()));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html");
        assert!(body_string(response).await.contains("alexo"));
    }

    #[tokio::test]
    async fn javascript_gets_its_content_type() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();
        let app = build_router(test_state(dir.path()));

        let response = app
            .oneshot(Request::builder().uri("/app.js").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/javascript");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()));

        let response = app
            .oneshot(Request::builder().uri("/missing.png").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn parent_traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/../token.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn non_get_methods_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()));

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/index.html")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn pipeline_failure_surfaces_as_json_500() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/process-voice")
                    .body(Body::from("fake audio bytes"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert!(body["error"].as_str().unwrap().contains("transcription pipeline"));
    }

    #[test]
    fn create_details_quotes_the_summary() {
        let details = CalendarEventDetails {
            summary: Some("Team Meeting".into()),
            location: None,
            description: None,
            start_time: "2025-03-02T15:00:00".into(),
            end_time: "2025-03-02T16:00:00".into(),
            time_zone: None,
            attendees: None,
            hangout_link: None,
        };
        assert_eq!(
            create_details(&details),
            "Creating a new calendar event: \"Team Meeting\""
        );
    }

    #[test]
    fn list_details_without_window_is_generic() {
        assert_eq!(
            list_details(&ListEventsOptions::default()),
            "Listing upcoming events"
        );
    }

    #[test]
    fn list_details_with_window_and_limit() {
        let options = ListEventsOptions {
            time_min: Some("2025-03-02T00:00:00Z".into()),
            time_max: Some("2025-03-09T00:00:00Z".into()),
            max_results: Some(5),
        };
        assert_eq!(
            list_details(&options),
            "Listing events from 2025-03-02 to 2025-03-09 (limited to 5 events)"
        );
    }

    #[test]
    fn date_part_passes_unparseable_strings_through() {
        assert_eq!(date_part("2025-03-02T10:00:00Z"), "2025-03-02");
        assert_eq!(date_part("next tuesday"), "next tuesday");
    }
}
