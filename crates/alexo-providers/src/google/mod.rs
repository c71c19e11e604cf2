//! Google Calendar integration.
//!
//! # Authorization flow
//!
//! 1. OAuth client credentials are read from a local JSON file
//!    (`installed` section from the Google Cloud Console).
//! 2. A persisted token that is still valid backs requests directly.
//! 3. An expired token with a refresh token is refreshed; a failed
//!    refresh falls back to the interactive flow.
//! 4. Interactive flow: the browser opens the consent page, the provider
//!    redirects to the local callback listener, the code is exchanged for
//!    tokens, and the result is persisted for next time.
//!
//! The callback listener and the authorizer communicate through a
//! [`CallbackSlot`], a single-slot mailbox owned by whoever wires the two
//! together (the server binary, here).

mod calendar;
mod callback;
mod config;
mod credentials;
mod oauth;
mod tokens;

pub use calendar::CalendarService;
pub use callback::{CALLBACK_PATH, CallbackResult, CallbackSlot, callback_router, serve_callback};
pub use config::GoogleConfig;
pub use credentials::{CredentialStore, Credentials};
pub use oauth::{
    Authorizer, BrowserLauncher, NoBrowser, RefreshOutcome, SystemBrowser, build_auth_url,
};
pub use tokens::{BearerToken, Token, TokenStore, now_ms};
