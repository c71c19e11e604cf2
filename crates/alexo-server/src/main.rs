//! alexo server entry point.

use std::process::ExitCode;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use alexo_intent::{IntentClient, IntentConfig};
use alexo_providers::{CalendarService, CallbackSlot, GoogleConfig, serve_callback};
use alexo_server::config::ServerConfig;
use alexo_server::routes::{AppState, build_router};
use alexo_speech::{SpeechConfig, Transcriber};

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("alexo=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            eprintln!(
                "Set GEMINI_API_KEY (and optionally CALENDAR_ID) in the environment or a .env file."
            );
            return ExitCode::FAILURE;
        }
    };

    debug!(
        calendar_id = %config.calendar_id,
        timezone = %config.timezone,
        static_dir = %config.static_dir.display(),
        "configuration loaded"
    );

    if let Err(err) = run(config).await {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(config: ServerConfig) -> std::io::Result<()> {
    let slot = Arc::new(CallbackSlot::new());

    // Standalone callback listener; shares the slot with the authorizer.
    let callback_slot = slot.clone();
    let redirect_port = config.redirect_port;
    tokio::spawn(async move {
        if let Err(err) = serve_callback(callback_slot, redirect_port).await {
            error!(error = %err, "authorization callback listener failed");
        }
    });

    let mut speech = SpeechConfig::new();
    if let Some(path) = &config.ffmpeg_path {
        speech = speech.with_ffmpeg_path(path.as_path());
    }
    if let Some(path) = &config.whisper_path {
        speech = speech.with_whisper_path(path.as_path());
    }
    if let Some(path) = &config.whisper_model_path {
        speech = speech.with_model_path(path.as_path());
    }

    let google = GoogleConfig::new()
        .with_credentials_path(config.credentials_path.as_path())
        .with_token_path(config.token_path.as_path())
        .with_calendar_id(config.calendar_id.as_str())
        .with_redirect_port(config.redirect_port)
        .with_consent_timeout(config.consent_timeout);

    let intent = IntentConfig::new(config.gemini_api_key.as_str())
        .with_locale(config.locale.as_str())
        .with_timezone(config.timezone.as_str());

    let state = AppState {
        transcriber: Arc::new(Transcriber::new(speech)),
        intent: Arc::new(IntentClient::new(intent)),
        calendar: Arc::new(CalendarService::new(google, slot)),
        static_dir: config.static_dir.clone(),
    };

    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!(port = config.port, "listening on http://localhost:{}", config.port);
    axum::serve(listener, build_router(state)).await
}
