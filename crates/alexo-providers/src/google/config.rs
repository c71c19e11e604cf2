//! Google provider configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::google::callback::CALLBACK_PATH;

/// Configuration for Google OAuth and the Calendar API client.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// Path to the OAuth client JSON (nested `installed` object).
    pub credentials_path: PathBuf,

    /// Path where the token record is persisted.
    pub token_path: PathBuf,

    /// OAuth scopes to request.
    pub scopes: Vec<String>,

    /// Local port the authorization redirect lands on. The redirect URI
    /// is derived from it.
    pub redirect_port: u16,

    /// Calendar the assistant operates on.
    pub calendar_id: String,

    /// Request timeout for token and calendar calls.
    pub timeout: Duration,

    /// How long to wait for interactive consent. `None` waits forever.
    pub consent_timeout: Option<Duration>,
}

impl GoogleConfig {
    /// Default OAuth scope: full calendar access.
    pub const DEFAULT_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar";

    /// Default local port for the authorization redirect.
    pub const DEFAULT_REDIRECT_PORT: u16 = 8080;

    /// Default request timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    pub fn new() -> Self {
        Self {
            credentials_path: PathBuf::from("credentials/oauth_credentials.json"),
            token_path: PathBuf::from("credentials/token.json"),
            scopes: vec![Self::DEFAULT_SCOPE.to_string()],
            redirect_port: Self::DEFAULT_REDIRECT_PORT,
            calendar_id: "primary".to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            consent_timeout: None,
        }
    }

    /// Sets the credentials file path.
    pub fn with_credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = path.into();
        self
    }

    /// Sets the token file path.
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Sets the OAuth scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Sets the local redirect port.
    pub fn with_redirect_port(mut self, port: u16) -> Self {
        self.redirect_port = port;
        self
    }

    /// Sets the calendar to operate on.
    pub fn with_calendar_id(mut self, id: impl Into<String>) -> Self {
        self.calendar_id = id.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Bounds the interactive consent wait. `None` keeps the default of
    /// waiting indefinitely.
    pub fn with_consent_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.consent_timeout = timeout;
        self
    }

    /// Redirect URI the provider sends the browser back to.
    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}{}", self.redirect_port, CALLBACK_PATH)
    }

    /// The space-joined scope string used in requests.
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self::new()
    }
}
