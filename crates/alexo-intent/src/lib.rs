//! Intent extraction over the Gemini API.
//!
//! Free-form transcriptions go in; structured decisions come out:
//!
//! - [`IntentClient::determine_action`] - create, list, or unknown
//! - [`IntentClient::parse_create_event`] - event details for "create"
//! - [`IntentClient::parse_list_options`] - listing window for "list"
//!
//! The model is instructed to answer with a raw JSON object; responses
//! that arrive wrapped in markdown code fences are unfenced before
//! parsing. Everything here is a thin, stateless wrapper over the
//! `generateContent` endpoint.

mod error;
mod gemini;

pub use error::IntentError;
pub use gemini::{Action, ActionDecision, IntentClient, IntentConfig, strip_code_fences};
