//! Error types for authorization and calendar operations.
//!
//! The taxonomy mirrors how failures propagate: credential problems are
//! fatal setup errors, refresh failures only trigger the fallback to a
//! full interactive authorization, and authorization or API failures are
//! fatal for the current operation and bubble up to the HTTP boundary.

use std::path::PathBuf;

use thiserror::Error;

/// Errors loading the OAuth client credentials file.
///
/// Always fatal: there is no fallback, the operator has to fix the file.
#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error(
        "credentials file not found at {}; create it with the OAuth client JSON \
         downloaded from the Google Cloud Console",
        path.display()
    )]
    NotFound { path: PathBuf },

    #[error("failed to read credentials file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("credentials file {} is not valid JSON: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(
        "credentials file {} is missing required fields: {}",
        path.display(),
        fields.join(", ")
    )]
    MissingFields { path: PathBuf, fields: Vec<String> },
}

/// Errors from the refresh-token grant.
///
/// Never fatal on their own: the authorizer logs the failure and falls
/// back to full interactive authorization.
#[derive(Debug, Error)]
pub enum TokenRefreshError {
    #[error("token refresh request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("token refresh failed ({status}): {body}")]
    Endpoint {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("token refresh response was not valid JSON: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

/// Errors from [`Authorizer::authorize`](crate::Authorizer::authorize).
///
/// Fatal for the current call; surfaced to whoever requested the calendar
/// operation.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Credentials(#[from] CredentialsError),

    /// The user denied consent, or the provider redirected with an error.
    #[error("authorization failed: {0}")]
    Denied(String),

    #[error("no authorization code received")]
    NoCode,

    #[error("invalid authorization endpoint {uri}: {source}")]
    InvalidAuthUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    #[error("token request failed ({status}): {body}")]
    TokenEndpoint {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("token endpoint request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("token response was not valid JSON: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    #[error("timed out waiting for the authorization callback")]
    ConsentTimeout,
}

/// Errors from calendar API calls.
#[derive(Debug, Error)]
pub enum CalendarError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("calendar API request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("calendar API error ({status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("calendar API response was not valid JSON: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}
