//! Gemini `generateContent` client and prompt construction.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use alexo_core::{CalendarEventDetails, ListEventsOptions};

use crate::error::IntentError;

/// What the user wants done, as decided by the language model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    List,
    #[serde(other)]
    Unknown,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::List => "list",
            Self::Unknown => "unknown",
        }
    }
}

/// The decided action and the model's one-line justification.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionDecision {
    pub action: Action,
    #[serde(default)]
    pub reason: String,
}

/// Configuration for the Gemini client.
#[derive(Debug, Clone)]
pub struct IntentConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    /// Language the transcriptions are in; passed to the model as context.
    pub locale: String,
    /// IANA timezone stamped onto parsed events and passed as context.
    pub timezone: String,
    pub timeout: Duration,
}

impl IntentConfig {
    pub const DEFAULT_MODEL: &'static str = "gemini-2.0-flash";
    pub const DEFAULT_API_BASE: &'static str =
        "https://generativelanguage.googleapis.com/v1beta";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: Self::DEFAULT_MODEL.to_string(),
            api_base: Self::DEFAULT_API_BASE.to_string(),
            locale: "en-US".to_string(),
            timezone: "UTC".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Client for the Gemini `generateContent` endpoint.
pub struct IntentClient {
    config: IntentConfig,
    http: reqwest::Client,
}

impl IntentClient {
    pub fn new(config: IntentConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("failed to create HTTP client");
        Self { config, http }
    }

    /// Decides whether the utterance asks to create or list events.
    pub async fn determine_action(&self, text: &str) -> Result<ActionDecision, IntentError> {
        let raw = self.generate(&action_prompt(text)).await?;
        let decision: ActionDecision = parse_model_json(&raw)?;
        debug!(action = decision.action.as_str(), "action decided");
        Ok(decision)
    }

    /// Extracts event details from an utterance asking to create an event.
    ///
    /// The configured timezone is stamped onto the result.
    pub async fn parse_create_event(
        &self,
        text: &str,
    ) -> Result<CalendarEventDetails, IntentError> {
        let prompt = create_event_prompt(text, &self.config, Utc::now());
        let raw = self.generate(&prompt).await?;
        let mut details: CalendarEventDetails = parse_model_json(&raw)?;
        details.time_zone = Some(self.config.timezone.clone());
        Ok(details)
    }

    /// Extracts a listing window from an utterance asking to see events.
    pub async fn parse_list_options(&self, text: &str) -> Result<ListEventsOptions, IntentError> {
        let prompt = list_options_prompt(text, &self.config, Utc::now());
        let raw = self.generate(&prompt).await?;
        parse_model_json(&raw)
    }

    async fn generate(&self, prompt: &str) -> Result<String, IntentError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.api_base, self.config.model
        );

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&GenerateRequest::single(prompt))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(IntentError::Api { status, body });
        }

        let parsed: GenerateResponse = serde_json::from_str(&body).map_err(|err| {
            IntentError::InvalidResponse(format!("unexpected response shape: {err}"))
        })?;
        parsed
            .first_text()
            .ok_or_else(|| IntentError::InvalidResponse("response carried no candidates".into()))
    }
}

/// Parses the model's answer as JSON, tolerating markdown code fences.
fn parse_model_json<T: DeserializeOwned>(raw: &str) -> Result<T, IntentError> {
    let cleaned = strip_code_fences(raw);
    serde_json::from_str(cleaned.trim()).map_err(|err| {
        error!(raw, "model returned unparseable JSON");
        IntentError::InvalidResponse(format!("failed to parse model output: {err}"))
    })
}

/// Strips the ```json fences the model sometimes wraps its output in,
/// despite being told not to.
pub fn strip_code_fences(text: &str) -> String {
    text.trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
        .to_string()
}

fn action_prompt(text: &str) -> String {
    format!(
        r#"Analyze this text and determine if the user wants to:
1. Create/schedule a calendar event
2. List/show existing calendar events

If the user says he has something to do, then the action is "create".
If the user says he wants to see his calendar, then the action is "list".
If the user says he doesn't know what to do, then the action is "unknown".

Text: "{text}"

Return ONLY a raw JSON object with these fields:
- action: either "create", "list", or "unknown"
- reason: brief explanation of why you chose this action

DO NOT include any markdown, code blocks, or additional text. Return ONLY the JSON object."#
    )
}

fn create_event_prompt(text: &str, config: &IntentConfig, now: DateTime<Utc>) -> String {
    format!(
        r#"Parse this text into a calendar event: "{text}"

The text is in {locale}.
Today is {date}. Right now is {time}.
The timezone is {timezone}.

Return ONLY a raw JSON object with these fields:
- summary (title of the event)
- description (any additional details or, if there's no additional details, just return the full text)
- startTime (in ISO format)
- endTime (in ISO format, if not specified, assume 1 hour duration)
- location (if mentioned, otherwise exclude this field)

DO NOT include any markdown, code blocks, or additional text. Return ONLY the JSON object."#,
        locale = config.locale,
        date = now.format("%d/%m/%Y"),
        time = now.format("%H:%M"),
        timezone = config.timezone,
    )
}

fn list_options_prompt(text: &str, config: &IntentConfig, now: DateTime<Utc>) -> String {
    format!(
        r#"Extract calendar listing options from this text: "{text}"

Today is {date}. Right now is {time}.
The timezone is {timezone}.

Return ONLY a raw JSON object with these optional fields:
- timeMin (start of the window the user asked about, in ISO format)
- timeMax (end of the window, in ISO format)
- maxResults (a number, only if the user limited how many events to show)

Omit every field the text does not specify.
DO NOT include any markdown, code blocks, or additional text. Return ONLY the JSON object."#,
        date = now.format("%d/%m/%Y"),
        time = now.format("%H:%M"),
        timezone = config.timezone,
    )
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    top_k: u32,
    top_p: f64,
}

impl GenerateRequest {
    /// A single-part request with near-deterministic sampling; the
    /// prompts ask for machine-readable JSON, not prose.
    fn single(prompt: &str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.1,
                top_k: 1,
                top_p: 1.0,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    fn first_text(self) -> Option<String> {
        let candidate = self.candidates.into_iter().next()?;
        let part = candidate.content?.parts.into_iter().next()?;
        Some(part.text.trim().to_string())
    }
}
