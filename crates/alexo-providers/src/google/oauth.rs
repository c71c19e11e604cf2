//! OAuth 2.0 authorization-code flow with local callback capture.
//!
//! [`Authorizer::authorize`] produces a bearer token for API calls,
//! touching the network only when it has to:
//!
//! 1. Load the client credentials (fails closed).
//! 2. A persisted token whose expiry is strictly in the future is
//!    returned directly.
//! 3. An expired token with a refresh token is refreshed; a refresh
//!    failure is logged and falls through, never propagated.
//! 4. Otherwise the full interactive flow runs: open the authorization
//!    URL in a browser (best effort), block on the callback slot until
//!    the redirect arrives, exchange the code for tokens, persist.
//!
//! Only one interactive flow should be in flight per process; the
//! callback slot is a mailbox, not a queue.

use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

use crate::error::{AuthError, TokenRefreshError};
use crate::google::callback::CallbackSlot;
use crate::google::config::GoogleConfig;
use crate::google::credentials::{CredentialStore, Credentials};
use crate::google::tokens::{BearerToken, Token, TokenStore, now_ms};

/// How the authorization URL reaches the user.
///
/// The flow never fails because a browser could not be launched; a
/// launch failure falls back to printing the URL for manual visiting.
pub trait BrowserLauncher: Send + Sync {
    fn open(&self, url: &str) -> std::io::Result<()>;
}

/// Opens the platform default browser.
#[derive(Debug, Default)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> std::io::Result<()> {
        open::that(url)
    }
}

/// Never launches anything; for headless deployments, where the printed
/// URL is the only channel.
#[derive(Debug, Default)]
pub struct NoBrowser;

impl BrowserLauncher for NoBrowser {
    fn open(&self, _url: &str) -> std::io::Result<()> {
        Err(std::io::Error::other("browser launch disabled"))
    }
}

/// Outcome of a refresh-token grant.
///
/// Failure is an ordinary value rather than a propagated error, so the
/// fall-through to full interactive authorization stays visible at the
/// call site.
#[derive(Debug)]
pub enum RefreshOutcome {
    Refreshed(Token),
    Failed(TokenRefreshError),
}

/// Orchestrates credential loading, token validity, refresh and the
/// interactive authorization-code flow.
pub struct Authorizer {
    config: GoogleConfig,
    credentials: CredentialStore,
    tokens: TokenStore,
    slot: Arc<CallbackSlot>,
    browser: Box<dyn BrowserLauncher>,
    http: reqwest::Client,
}

impl Authorizer {
    /// Creates an authorizer over the stores named in `config`, sharing
    /// `slot` with the callback listener.
    pub fn new(config: GoogleConfig, slot: Arc<CallbackSlot>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("failed to create HTTP client");
        let credentials = CredentialStore::new(&config.credentials_path);
        let tokens = TokenStore::new(&config.token_path);
        Self {
            config,
            credentials,
            tokens,
            slot,
            browser: Box::new(SystemBrowser),
            http,
        }
    }

    /// Replaces the browser launcher.
    pub fn with_browser(mut self, browser: Box<dyn BrowserLauncher>) -> Self {
        self.browser = browser;
        self
    }

    pub fn token_store(&self) -> &TokenStore {
        &self.tokens
    }

    /// Produces a valid bearer token, running the interactive flow only
    /// when no valid or refreshable token exists.
    pub async fn authorize(&self) -> Result<BearerToken, AuthError> {
        let credentials = self.credentials.load()?;
        let existing = self.tokens.load();

        if let Some(token) = existing.as_ref() {
            if token.is_valid_at(now_ms()) {
                debug!("using persisted access token");
                return Ok(self.bearer(token));
            }
        }

        if let Some(refresh_token) = existing.as_ref().and_then(|t| t.refresh_token.as_deref()) {
            match self.refresh(&credentials, refresh_token).await {
                RefreshOutcome::Refreshed(token) => return Ok(self.bearer(&token)),
                RefreshOutcome::Failed(err) => {
                    warn!(error = %err, "token refresh failed, falling back to interactive authorization");
                }
            }
        }

        let token = self.interactive(&credentials).await?;
        Ok(self.bearer(&token))
    }

    /// Runs the refresh-token grant, reporting the outcome as a value.
    pub async fn refresh(
        &self,
        credentials: &Credentials,
        refresh_token: &str,
    ) -> RefreshOutcome {
        match self.try_refresh(credentials, refresh_token).await {
            Ok(token) => RefreshOutcome::Refreshed(token),
            Err(err) => RefreshOutcome::Failed(err),
        }
    }

    async fn try_refresh(
        &self,
        credentials: &Credentials,
        refresh_token: &str,
    ) -> Result<Token, TokenRefreshError> {
        let params = [
            ("refresh_token", refresh_token),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http
            .post(&credentials.token_uri)
            .form(&params)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(TokenRefreshError::Endpoint { status, body });
        }

        let mut token: Token = serde_json::from_str(&body)?;
        // Refresh responses may omit the refresh token; carry the old one
        // forward so the next refresh still works.
        token.refresh_token = token
            .refresh_token
            .or_else(|| Some(refresh_token.to_string()));
        token.stamp_expiry(now_ms());
        self.tokens.save(&token);
        info!("access token refreshed");
        Ok(token)
    }

    /// The full interactive flow: browser consent, callback wait, code
    /// exchange.
    async fn interactive(&self, credentials: &Credentials) -> Result<Token, AuthError> {
        let auth_url = build_auth_url(
            credentials,
            &self.config.redirect_uri(),
            &self.config.scope_string(),
        )?;

        info!("starting interactive authorization");
        if let Err(err) = self.browser.open(auth_url.as_str()) {
            warn!(error = %err, "failed to open browser");
            println!("Please visit this URL to authorize the application:\n\n{auth_url}\n");
        }

        // Without a configured timeout this waits for as long as the user
        // takes to grant or deny consent.
        let callback = match self.config.consent_timeout {
            Some(limit) => tokio::time::timeout(limit, self.slot.wait())
                .await
                .map_err(|_| AuthError::ConsentTimeout)?,
            None => self.slot.wait().await,
        };

        if let Some(error) = callback.error {
            return Err(AuthError::Denied(error));
        }
        if callback.code.is_empty() {
            return Err(AuthError::NoCode);
        }

        self.exchange_code(credentials, &callback.code).await
    }

    async fn exchange_code(
        &self,
        credentials: &Credentials,
        code: &str,
    ) -> Result<Token, AuthError> {
        let redirect_uri = self.config.redirect_uri();
        let params = [
            ("code", code),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .http
            .post(&credentials.token_uri)
            .form(&params)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AuthError::TokenEndpoint { status, body });
        }

        let mut token: Token = serde_json::from_str(&body)?;
        token.stamp_expiry(now_ms());
        self.tokens.save(&token);
        info!("authorization complete, token persisted");
        Ok(token)
    }

    fn bearer(&self, token: &Token) -> BearerToken {
        BearerToken {
            access_token: token.access_token.clone(),
            token_type: token.token_type.clone(),
            scope: token
                .scope
                .clone()
                .unwrap_or_else(|| self.config.scope_string()),
        }
    }
}

/// Builds the browser-directed authorization URL.
pub fn build_auth_url(
    credentials: &Credentials,
    redirect_uri: &str,
    scope: &str,
) -> Result<Url, AuthError> {
    Url::parse_with_params(
        &credentials.auth_uri,
        [
            ("client_id", credentials.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("access_type", "offline"),
            ("scope", scope),
        ],
    )
    .map_err(|source| AuthError::InvalidAuthUri {
        uri: credentials.auth_uri.clone(),
        source,
    })
}
