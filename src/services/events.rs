use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

use crate::error::AppResult;
use crate::google::calendar::{CalendarClient, CalendarEvent, EventDateTime};
use crate::models::Deadline;

/// Calendar persistence for the events mirroring marketing requests.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn get(&self, event_id: &str) -> AppResult<CalendarEvent>;

    async fn save(&self, event_id: &str, event: &CalendarEvent) -> AppResult<()>;

    /// Create an event and return it as stored (with id and link).
    async fn insert(&self, event: &CalendarEvent) -> AppResult<CalendarEvent>;
}

#[async_trait]
impl EventStore for CalendarClient {
    async fn get(&self, event_id: &str) -> AppResult<CalendarEvent> {
        self.get_event(event_id).await
    }

    async fn save(&self, event_id: &str, event: &CalendarEvent) -> AppResult<()> {
        self.update_event(event_id, event).await
    }

    async fn insert(&self, event: &CalendarEvent) -> AppResult<CalendarEvent> {
        self.insert_event(event).await
    }
}

/// Fetch an event, apply `mutate` and write it back.
///
/// A failed save leaves the remote event as it was.
pub async fn update_event<F>(store: &dyn EventStore, event_id: &str, mutate: F) -> AppResult<()>
where
    F: FnOnce(&mut CalendarEvent) + Send,
{
    let mut event = store.get(event_id).await?;
    mutate(&mut event);
    store.save(event_id, &event).await?;
    tracing::info!("Updated calendar event {}", event_id);
    Ok(())
}

/// Event for a newly created request: from `now` until noon on the deadline.
pub fn new_request_event(
    project_name: &str,
    description: &str,
    deadline: &Deadline,
    now: DateTime<FixedOffset>,
    time_zone: Option<&str>,
) -> CalendarEvent {
    let offset = *now.offset();
    CalendarEvent {
        summary: Some(format!("Marketing Project: {}", project_name)),
        description: Some(format!(
            "Project: {}\nDescription: {}\nDeadline: {}",
            project_name, description, deadline
        )),
        start: EventDateTime {
            date_time: Some(now.to_rfc3339()),
            time_zone: time_zone.map(str::to_string),
            ..Default::default()
        },
        end: EventDateTime {
            date_time: Some(deadline.calendar_end(offset).to_rfc3339()),
            time_zone: time_zone.map(str::to_string),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn mark_assigned(event: &mut CalendarEvent, assignee: &str) {
    let summary = event.summary.take().unwrap_or_default();
    event.summary = Some(format!("{} - Assigned to {}", summary, assignee));
}

pub fn mark_completed(event: &mut CalendarEvent) {
    let summary = event.summary.take().unwrap_or_default();
    event.summary = Some(format!("{} - Completed", summary));
}

/// Move the end of the event to the new deadline.
///
/// Timed events end at noon on the deadline in the start's time zone;
/// all-day events get the deadline date.
pub fn move_deadline(event: &mut CalendarEvent, deadline: &Deadline, offset: FixedOffset) {
    if event.start.date_time.is_some() {
        event.end = EventDateTime {
            date_time: Some(deadline.calendar_end(offset).to_rfc3339()),
            time_zone: event.start.time_zone.clone(),
            date: None,
        };
    } else {
        event.end = EventDateTime {
            date: Some(deadline.iso_date()),
            ..Default::default()
        };
    }
    event.description = Some(format!("Deadline updated to {}.", deadline));
}
