use std::sync::Arc;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};
use crate::google::auth::ServiceAccountAuth;

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3/";

/// Start or end of an event: either an all-day `date` or a `dateTime`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventDateTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(rename = "dateTime", skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(rename = "timeZone", skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// Calendar event resource.
///
/// Fields this service never touches are kept in `extra` so a full `PUT`
/// sends them back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub start: EventDateTime,
    #[serde(default)]
    pub end: EventDateTime,
    #[serde(rename = "htmlLink", skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Thin client over the Calendar v3 `events` API, bound to one calendar.
pub struct CalendarClient {
    client: reqwest::Client,
    auth: Arc<ServiceAccountAuth>,
    calendar_id: String,
}

impl CalendarClient {
    pub fn new(
        client: reqwest::Client,
        auth: Arc<ServiceAccountAuth>,
        calendar_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            auth,
            calendar_id: calendar_id.into(),
        }
    }

    fn events_endpoint(&self) -> AppResult<Url> {
        events_url(&self.calendar_id)
    }

    fn event_endpoint(&self, event_id: &str) -> AppResult<Url> {
        let mut url = events_url(&self.calendar_id)?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                AppError::Calendar("Calendar events URL cannot be a base".to_string())
            })?;
            segments.push(event_id);
        }
        Ok(url)
    }

    fn ensure_event_id(event_id: &str) -> AppResult<()> {
        if event_id.trim().is_empty() {
            return Err(AppError::NotFound("Calendar event id is empty".to_string()));
        }
        Ok(())
    }

    async fn parse_event(response: reqwest::Response, action: &str) -> AppResult<CalendarEvent> {
        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AppError::Calendar(format!("Failed to read {} response: {}", action, e))
        })?;

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("Calendar event not found: {}", body)));
        }
        if !status.is_success() {
            return Err(AppError::Calendar(format!(
                "Calendar API error while trying to {} ({}): {}",
                action, status, body
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| AppError::Calendar(format!("Invalid {} payload: {}", action, e)))
    }

    pub async fn get_event(&self, event_id: &str) -> AppResult<CalendarEvent> {
        Self::ensure_event_id(event_id)?;
        let url = self.event_endpoint(event_id)?;
        let token = self.auth.access_token().await?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::Calendar(format!("Failed to fetch event: {}", e)))?;

        Self::parse_event(response, "fetch the event").await
    }

    pub async fn update_event(&self, event_id: &str, event: &CalendarEvent) -> AppResult<()> {
        Self::ensure_event_id(event_id)?;
        let url = self.event_endpoint(event_id)?;
        let token = self.auth.access_token().await?;
        let response = self
            .client
            .put(url)
            .bearer_auth(token)
            .json(event)
            .send()
            .await
            .map_err(|e| AppError::Calendar(format!("Failed to update event: {}", e)))?;

        Self::parse_event(response, "update the event").await.map(|_| ())
    }

    pub async fn insert_event(&self, event: &CalendarEvent) -> AppResult<CalendarEvent> {
        let url = self.events_endpoint()?;
        let token = self.auth.access_token().await?;
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(event)
            .send()
            .await
            .map_err(|e| AppError::Calendar(format!("Failed to create event: {}", e)))?;

        Self::parse_event(response, "create the event").await
    }
}

/// `calendars/{id}/events`, with the calendar id percent-encoded as one segment.
fn events_url(calendar_id: &str) -> AppResult<Url> {
    let mut url = Url::parse(CALENDAR_API_BASE)
        .map_err(|e| AppError::Calendar(format!("Invalid calendar api base url: {}", e)))?;
    {
        let mut segments = url.path_segments_mut().map_err(|_| {
            AppError::Calendar("Calendar API base URL cannot be a base".to_string())
        })?;
        segments.pop_if_empty();
        segments.push("calendars");
        segments.push(calendar_id);
        segments.push("events");
    }
    Ok(url)
}
