//! Response body of the voice-processing endpoint.

use serde::{Deserialize, Serialize};

use crate::event::CalendarEvent;

/// What the voice endpoint returns to the frontend.
///
/// `event` is set for "create" actions, `events` for "list" actions;
/// an "unknown" action carries only the transcription and the reason.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceResponse {
    pub transcription: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<CalendarEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<CalendarEvent>>,
    /// Human-readable summary of what was done, e.g.
    /// `Creating a new calendar event: "Team Meeting"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_details: Option<String>,
}

impl VoiceResponse {
    /// Creates a response carrying the transcription and decided action.
    pub fn new(
        transcription: impl Into<String>,
        action: impl Into<String>,
        reason: Option<String>,
    ) -> Self {
        Self {
            transcription: transcription.into(),
            action: action.into(),
            reason,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_branches_are_omitted() {
        let response = VoiceResponse::new("hello", "unknown", Some("unclear".into()));
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["transcription"], "hello");
        assert_eq!(value["action"], "unknown");
        assert_eq!(value["reason"], "unclear");
        assert!(value.get("event").is_none());
        assert!(value.get("events").is_none());
        assert!(value.get("actionDetails").is_none());
    }

    #[test]
    fn action_details_serializes_camel_case() {
        let mut response = VoiceResponse::new("list my week", "list", None);
        response.action_details = Some("Listing upcoming events".into());
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["actionDetails"], "Listing upcoming events");
    }
}
