//! Environment-driven server configuration, read once at startup.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use alexo_providers::GoogleConfig;

/// Default port of the main HTTP listener.
pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY environment variable is not set")]
    MissingGeminiApiKey,

    #[error("invalid value {value:?} for {name}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: PathBuf,
    pub calendar_id: String,
    pub gemini_api_key: String,
    pub locale: String,
    pub timezone: String,
    pub redirect_port: u16,
    /// Bound on the interactive consent wait; absent means no timeout.
    pub consent_timeout: Option<Duration>,
    pub credentials_path: PathBuf,
    pub token_path: PathBuf,
    pub ffmpeg_path: Option<PathBuf>,
    pub whisper_path: Option<PathBuf>,
    pub whisper_model_path: Option<PathBuf>,
}

impl ServerConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let gemini_api_key = lookup("GEMINI_API_KEY")
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingGeminiApiKey)?;

        Ok(Self {
            port: parse_or("ALEXO_PORT", lookup("ALEXO_PORT"), DEFAULT_PORT)?,
            static_dir: lookup("ALEXO_STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("static")),
            calendar_id: lookup("CALENDAR_ID").unwrap_or_else(|| "primary".to_string()),
            gemini_api_key,
            locale: lookup("ALEXO_LOCALE").unwrap_or_else(|| "en-US".to_string()),
            timezone: lookup("ALEXO_TIMEZONE").unwrap_or_else(|| "UTC".to_string()),
            redirect_port: parse_or(
                "OAUTH_REDIRECT_PORT",
                lookup("OAUTH_REDIRECT_PORT"),
                GoogleConfig::DEFAULT_REDIRECT_PORT,
            )?,
            consent_timeout: parse_optional_secs(
                "ALEXO_CONSENT_TIMEOUT_SECS",
                lookup("ALEXO_CONSENT_TIMEOUT_SECS"),
            )?,
            credentials_path: lookup("ALEXO_CREDENTIALS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("credentials/oauth_credentials.json")),
            token_path: lookup("ALEXO_TOKEN_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("credentials/token.json")),
            ffmpeg_path: lookup("ALEXO_FFMPEG").map(PathBuf::from),
            whisper_path: lookup("ALEXO_WHISPER").map(PathBuf::from),
            whisper_model_path: lookup("ALEXO_WHISPER_MODEL").map(PathBuf::from),
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match value {
        Some(value) => value.parse().map_err(|err: T::Err| ConfigError::Invalid {
            name,
            value,
            reason: err.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_optional_secs(
    name: &'static str,
    value: Option<String>,
) -> Result<Option<Duration>, ConfigError> {
    value
        .map(|value| {
            value
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|err| ConfigError::Invalid {
                    name,
                    value,
                    reason: err.to_string(),
                })
        })
        .transpose()
}
