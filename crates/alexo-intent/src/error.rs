//! Intent error types.

use thiserror::Error;

/// Errors from the language-model API.
#[derive(Debug, Error)]
pub enum IntentError {
    #[error("language model request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("language model request failed ({status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The response arrived but did not contain usable JSON.
    #[error("failed to parse language model response: {0}")]
    InvalidResponse(String),
}
