//! Shared types for the alexo voice assistant.
//!
//! This crate holds the wire types that cross crate boundaries:
//!
//! - [`CalendarEventDetails`] - an event to be created, as extracted from speech
//! - [`CalendarEvent`] - an event as returned by the calendar API
//! - [`ListEventsOptions`] - a listing window extracted from speech
//! - [`VoiceResponse`] - the response body of the voice-processing endpoint
//!
//! All of them serialize in camelCase to match the JSON the calendar API
//! and the web frontend exchange.

pub mod event;
pub mod voice;

pub use event::{Attendee, CalendarEvent, CalendarEventDetails, EventTime, ListEventsOptions};
pub use voice::VoiceResponse;
