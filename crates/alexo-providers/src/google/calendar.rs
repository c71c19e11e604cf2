//! Google Calendar API client.
//!
//! A thin client over the Calendar v3 REST API. Every operation calls
//! [`Authorizer::authorize`] first, so each request is backed by a valid
//! bearer token, refreshed or interactively granted as needed.

use std::sync::Arc;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use alexo_core::{CalendarEvent, CalendarEventDetails, ListEventsOptions};

use crate::error::CalendarError;
use crate::google::callback::CallbackSlot;
use crate::google::config::GoogleConfig;
use crate::google::oauth::Authorizer;

/// Base URL for Google Calendar API v3.
const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Suffix stamped onto the summary and description of created events.
const BRANDING_SUFFIX: &str = " - Powered by Alexo";

/// Events returned by a listing when the caller sets no limit.
const DEFAULT_MAX_RESULTS: u32 = 10;

/// Days ahead a listing covers when the caller sets no upper bound.
const DEFAULT_WINDOW_DAYS: i64 = 7;

/// Calendar API client.
pub struct CalendarService {
    authorizer: Authorizer,
    http: reqwest::Client,
    calendar_id: String,
    api_base: String,
}

impl CalendarService {
    /// Creates a service over the configured calendar, sharing `slot`
    /// with the callback listener.
    pub fn new(config: GoogleConfig, slot: Arc<CallbackSlot>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("failed to create HTTP client");
        let calendar_id = config.calendar_id.clone();
        Self {
            authorizer: Authorizer::new(config, slot),
            http,
            calendar_id,
            api_base: CALENDAR_API_BASE.to_string(),
        }
    }

    pub fn authorizer(&self) -> &Authorizer {
        &self.authorizer
    }

    /// Creates an event on the configured calendar.
    pub async fn create_event(
        &self,
        details: &CalendarEventDetails,
    ) -> Result<CalendarEvent, CalendarError> {
        let auth = self.authorizer.authorize().await?;
        let url = format!(
            "{}/calendars/{}/events",
            self.api_base,
            urlencoding::encode(&self.calendar_id)
        );

        let body = EventRequest::from_details(details);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&auth.access_token)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(CalendarError::Api { status, body: text });
        }

        let event: CalendarEvent = serde_json::from_str(&text)?;
        info!(
            link = event.html_link.as_deref().unwrap_or("-"),
            "event created"
        );
        Ok(event)
    }

    /// Lists events on the configured calendar, ordered by start time.
    ///
    /// When the configured calendar is not `primary`, the primary
    /// calendar is fetched as well and the two lists merged.
    pub async fn list_events(
        &self,
        options: &ListEventsOptions,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let auth = self.authorizer.authorize().await?;
        let params = list_params(options, Utc::now());

        let mut events = self
            .fetch_events(&auth.access_token, &self.calendar_id, &params)
            .await?;

        if self.calendar_id != "primary" {
            let primary = self
                .fetch_events(&auth.access_token, "primary", &params)
                .await?;
            events.extend(primary);
            events.sort_by(|a, b| a.start_key().cmp(&b.start_key()));
        }

        if events.is_empty() {
            debug!("no upcoming events found");
        }
        Ok(events)
    }

    /// Deletes an event from the configured calendar.
    pub async fn delete_event(&self, event_id: &str) -> Result<(), CalendarError> {
        let auth = self.authorizer.authorize().await?;
        let url = format!(
            "{}/calendars/{}/events/{}",
            self.api_base,
            urlencoding::encode(&self.calendar_id),
            urlencoding::encode(event_id)
        );

        let response = self
            .http
            .delete(&url)
            .bearer_auth(&auth.access_token)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CalendarError::Api { status, body });
        }

        info!(event_id, "event deleted");
        Ok(())
    }

    async fn fetch_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        params: &[(String, String)],
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let url = format!(
            "{}/calendars/{}/events",
            self.api_base,
            urlencoding::encode(calendar_id)
        );

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(params)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(CalendarError::Api { status, body: text });
        }

        let list: EventListResponse = serde_json::from_str(&text)?;
        debug!(
            count = list.items.len(),
            calendar_id, "fetched calendar events"
        );
        Ok(list.items)
    }
}

/// Query parameters for an event listing, defaults applied: from now,
/// one week ahead, at most 10 results, recurring events expanded.
fn list_params(options: &ListEventsOptions, now: DateTime<Utc>) -> Vec<(String, String)> {
    let time_min = options
        .time_min
        .clone()
        .unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::Secs, true));
    let time_max = options.time_max.clone().unwrap_or_else(|| {
        (now + Duration::days(DEFAULT_WINDOW_DAYS)).to_rfc3339_opts(SecondsFormat::Secs, true)
    });
    let max_results = options.max_results.unwrap_or(DEFAULT_MAX_RESULTS);

    vec![
        ("timeMin".to_string(), time_min),
        ("timeMax".to_string(), time_max),
        ("maxResults".to_string(), max_results.to_string()),
        ("singleEvents".to_string(), "true".to_string()),
        ("orderBy".to_string(), "startTime".to_string()),
    ]
}

/// Request body for event creation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventRequest {
    summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    description: String,
    start: RequestTime,
    end: RequestTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    attendees: Option<Vec<RequestAttendee>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hangout_link: Option<String>,
    reminders: Reminders,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestTime {
    date_time: String,
    time_zone: String,
}

#[derive(Debug, Serialize)]
struct RequestAttendee {
    email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Reminders {
    use_default: bool,
}

impl EventRequest {
    fn from_details(details: &CalendarEventDetails) -> Self {
        let time_zone = details
            .time_zone
            .clone()
            .unwrap_or_else(|| "UTC".to_string());
        Self {
            summary: format!(
                "{}{BRANDING_SUFFIX}",
                details.summary.as_deref().unwrap_or("New Event")
            ),
            location: details.location.clone(),
            description: format!(
                "{}{BRANDING_SUFFIX}",
                details.description.as_deref().unwrap_or_default()
            ),
            start: RequestTime {
                date_time: details.start_time.clone(),
                time_zone: time_zone.clone(),
            },
            end: RequestTime {
                date_time: details.end_time.clone(),
                time_zone,
            },
            attendees: details.attendees.as_ref().map(|attendees| {
                attendees
                    .iter()
                    .map(|email| RequestAttendee {
                        email: email.clone(),
                    })
                    .collect()
            }),
            hangout_link: details.hangout_link.clone(),
            reminders: Reminders { use_default: true },
        }
    }
}

/// Response from the events listing endpoint.
#[derive(Debug, Deserialize)]
struct EventListResponse {
    #[serde(default)]
    items: Vec<CalendarEvent>,
}
