//! Calendar access for the alexo voice assistant.
//!
//! The hard part of this crate is the OAuth token lifecycle:
//!
//! - [`Authorizer`] - acquire, persist, refresh and re-acquire tokens
//! - [`CallbackSlot`] - the single-slot handoff between the local
//!   authorization callback listener and the flow waiting on it
//! - [`TokenStore`] / [`CredentialStore`] - the file-backed stores
//!
//! [`CalendarService`] layers the Calendar v3 operations (create, list,
//! delete) on top, authorizing before every call.
//!
//! Single-process by design: the token file and the callback slot are
//! process-wide state without cross-process locking, and only one
//! interactive authorization may be in flight at a time.

pub mod error;
pub mod google;

pub use error::{AuthError, CalendarError, CredentialsError, TokenRefreshError};
pub use google::{
    Authorizer, BearerToken, BrowserLauncher, CALLBACK_PATH, CalendarService, CallbackResult,
    CallbackSlot, CredentialStore, Credentials, GoogleConfig, NoBrowser, RefreshOutcome,
    SystemBrowser, Token, TokenStore, callback_router, serve_callback,
};
