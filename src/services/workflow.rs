//! Marketing request actions.
//!
//! Every action touches up to three systems: the record row (source of
//! truth), the calendar event and the chat thread. The record is written
//! first; when a later system fails the action still reports success for the
//! record, appends a short notice to the reply and leaves a failed step in the
//! action journal for operators.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::google::calendar::CalendarEvent;
use crate::models::title;
use crate::models::{Completion, Deadline, Record, RecordField, StoredRecord, ThreadStatus};
use crate::services::access::{
    require_admin, require_team_role, require_text_channel, require_thread, ChannelRef, Invoker,
};
use crate::services::events::{self, EventStore};
use crate::services::journal::{ActionJournal, ActionKind, Step, StepOutcome};
use crate::services::locks::ThreadLocks;
use crate::services::records::{find_by_thread_id, RecordStore};
use crate::services::report;
use crate::services::settings::RoleSettings;

pub const MAX_PROJECT_NAME_CHARS: usize = 80;
pub const MAX_COMBINED_INPUT_CHARS: usize = 3900;
pub const MAX_ASSIGNEE_CHARS: usize = 100;

pub const CREATE_SUCCESS_MESSAGE: &str = "Success. See thread below.";
pub const CREATE_FAILURE_MESSAGE: &str = "There was an error recording your data. Please try again.";
pub const RETRIEVE_FAILURE_MESSAGE: &str = "There was an error retrieving the data. Please try again.";
pub const CONFIGURE_FAILURE_MESSAGE: &str =
    "There was an error updating the role ID. Please try again.";
pub const COMPLETE_SUCCESS_MESSAGE: &str = "The thread has been marked as completed.";
pub const NO_MATCH_MESSAGE: &str = "No matching row found for this thread.";
pub const PROJECT_TOO_LONG_MESSAGE: &str =
    "The project name must not exceed 80 characters. Please try again.";
pub const INPUT_TOO_LONG_MESSAGE: &str = "The combined length of your inputs is too long. Please reduce the length of your inputs, particularly the project description.";
pub const MISSING_USERNAME_MESSAGE: &str = "You didn't fill in a username.";
pub const ASSIGNEE_TOO_LONG_MESSAGE: &str =
    "The username is too long. Please keep it under 100 characters.";
pub const MISSING_DEADLINE_MESSAGE: &str = "You didn't fill in a deadline.";
pub const EVENT_CREATE_FAILED_MESSAGE: &str = "There was an error creating the calendar event.";

const EVENT_NOTICE: &str = "Note: the calendar event could not be updated.";
const EVENT_MISSING_NOTICE: &str = "Note: no calendar event is linked to this request.";
const THREAD_NOTICE: &str = "Note: the thread title could not be updated.";
const ARCHIVE_NOTICE: &str = "Note: the thread could not be archived.";

/// Thread operations on the chat platform.
#[async_trait]
pub trait ChatSurface: Send + Sync {
    /// Open a public thread under `channel_id` and return its id.
    async fn create_thread(&self, channel_id: &str, name: &str) -> AppResult<String>;

    async fn send_message(&self, channel_id: &str, content: &str) -> AppResult<()>;

    async fn thread_name(&self, thread_id: &str) -> AppResult<String>;

    async fn rename_thread(&self, thread_id: &str, name: &str) -> AppResult<()>;

    async fn archive_thread(&self, thread_id: &str) -> AppResult<()>;
}

/// Inputs collected by the create modal.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub channel: ChannelRef,
    pub project_name: String,
    pub description: String,
    pub deadline: String,
}

impl CreateRequest {
    /// First message posted in the new thread.
    pub fn summary_message(&self) -> String {
        format!(
            "Project: {}\nYour description: {}\nDeadline: {}",
            self.project_name, self.description, self.deadline
        )
    }
}

fn compose(headline: String, notices: Vec<Option<&'static str>>) -> String {
    let mut lines = vec![headline];
    lines.extend(notices.into_iter().flatten().map(str::to_string));
    lines.join("\n")
}

pub struct MarketingService {
    records: Arc<dyn RecordStore>,
    events: Arc<dyn EventStore>,
    chat: Arc<dyn ChatSurface>,
    settings: Arc<RoleSettings>,
    journal: Arc<ActionJournal>,
    locks: ThreadLocks,
    offset: FixedOffset,
    time_zone: Option<String>,
}

impl MarketingService {
    pub fn new(
        records: Arc<dyn RecordStore>,
        events: Arc<dyn EventStore>,
        chat: Arc<dyn ChatSurface>,
        settings: Arc<RoleSettings>,
        journal: Arc<ActionJournal>,
        offset: FixedOffset,
        time_zone: Option<String>,
    ) -> Self {
        Self {
            records,
            events,
            chat,
            settings,
            journal,
            locks: ThreadLocks::new(),
            offset,
            time_zone,
        }
    }

    fn track<T>(&self, action: Uuid, step: Step, result: &AppResult<T>) {
        let outcome = match result {
            Ok(_) => StepOutcome::Succeeded,
            Err(e) => StepOutcome::Failed(e.to_string()),
        };
        self.journal.record(action, step, outcome);
    }

    async fn post_quietly(&self, channel_id: &str, content: &str) {
        if let Err(e) = self.chat.send_message(channel_id, content).await {
            tracing::warn!("Failed to post to {}: {}", channel_id, e);
        }
    }

    // ------------------------------------------------------------------------
    // Record step
    // ------------------------------------------------------------------------

    async fn locate(&self, action: Uuid, thread_id: &str) -> AppResult<StoredRecord> {
        let result = match self.records.fetch_all().await {
            Ok(rows) => find_by_thread_id(&rows, thread_id)
                .cloned()
                .ok_or_else(|| AppError::NotFound(NO_MATCH_MESSAGE.to_string())),
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            self.journal
                .record(action, Step::Record, StepOutcome::Failed(e.to_string()));
        }
        result
    }

    async fn write_field(
        &self,
        action: Uuid,
        stored: &mut StoredRecord,
        field: RecordField,
        value: &str,
    ) -> AppResult<()> {
        let result = self.records.update_field(stored, field, value).await;
        self.track(action, Step::Record, &result);
        result
    }

    // ------------------------------------------------------------------------
    // Follow-up steps
    // ------------------------------------------------------------------------

    async fn sync_event<F>(&self, action: Uuid, record: &Record, mutate: F) -> Option<&'static str>
    where
        F: FnOnce(&mut CalendarEvent) + Send,
    {
        let event_id = record.calendar_event_id.trim();
        if event_id.is_empty() {
            tracing::warn!("Thread {} has no linked calendar event", record.thread_id);
            self.journal.record(
                action,
                Step::Event,
                StepOutcome::Skipped("no calendar event id".to_string()),
            );
            return Some(EVENT_MISSING_NOTICE);
        }

        let result = events::update_event(self.events.as_ref(), event_id, mutate).await;
        self.track(action, Step::Event, &result);
        match result {
            Ok(()) => None,
            Err(e) => {
                tracing::error!("Failed to update calendar event {}: {}", event_id, e);
                Some(EVENT_NOTICE)
            }
        }
    }

    async fn sync_thread_title<F>(&self, action: Uuid, thread_id: &str, retitle: F) -> Option<&'static str>
    where
        F: FnOnce(&str) -> String + Send,
    {
        let result = async {
            let current = self.chat.thread_name(thread_id).await?;
            let updated = retitle(&current);
            if updated != current {
                self.chat.rename_thread(thread_id, &updated).await?;
                tracing::info!("Renamed thread {} to '{}'", thread_id, updated);
            }
            Ok::<_, AppError>(())
        }
        .await;

        self.track(action, Step::Thread, &result);
        match result {
            Ok(()) => None,
            Err(e) => {
                tracing::error!("Failed to update thread {} title: {}", thread_id, e);
                Some(THREAD_NOTICE)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------------

    /// Open a request thread, mirror it to the calendar and log the record.
    ///
    /// The record is only appended once the calendar event exists.
    pub async fn create(
        &self,
        invoker: &Invoker,
        request: CreateRequest,
        now: DateTime<Utc>,
    ) -> AppResult<String> {
        require_text_channel(&request.channel)?;

        let now = now.with_timezone(&self.offset);
        let deadline = Deadline::parse(&request.deadline)?;
        if request.project_name.chars().count() > MAX_PROJECT_NAME_CHARS {
            return Err(AppError::Validation(PROJECT_TOO_LONG_MESSAGE.to_string()));
        }
        deadline.ensure_future(now)?;
        let first_message = request.summary_message();
        if first_message.chars().count() > MAX_COMBINED_INPUT_CHARS {
            return Err(AppError::Validation(INPUT_TOO_LONG_MESSAGE.to_string()));
        }

        let action = self.journal.begin(ActionKind::Create, &request.channel.id);
        tracing::info!(
            "{} is creating marketing request '{}' in #{}",
            invoker.username,
            request.project_name,
            request.channel.name
        );

        let thread_name = title::initial_title(&request.project_name, &deadline.to_string());
        let thread_id = match self
            .chat
            .create_thread(&request.channel.id, &thread_name)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                self.journal
                    .record(action, Step::Thread, StepOutcome::Failed(e.to_string()));
                return Err(e);
            }
        };
        self.journal.attach_thread(action, &thread_id);

        let posted = self.chat.send_message(&thread_id, &first_message).await;
        self.track(action, Step::Thread, &posted);
        if let Err(e) = posted {
            tracing::error!("Failed to post request summary in {}: {}", thread_id, e);
        }

        let event = events::new_request_event(
            &request.project_name,
            &request.description,
            &deadline,
            now,
            self.time_zone.as_deref(),
        );
        let created = self.events.insert(&event).await.and_then(|created| {
            match created.id.clone().filter(|id| !id.is_empty()) {
                Some(id) => Ok((id, created.html_link)),
                None => Err(AppError::Calendar("Created event has no id".to_string())),
            }
        });
        self.track(action, Step::Event, &created);
        let (event_id, html_link) = match created {
            Ok(created) => created,
            Err(e) => {
                tracing::error!("Failed to create calendar event for {}: {}", thread_id, e);
                self.journal.record(
                    action,
                    Step::Record,
                    StepOutcome::Skipped("calendar event was not created".to_string()),
                );
                self.post_quietly(&thread_id, EVENT_CREATE_FAILED_MESSAGE).await;
                return Err(e);
            }
        };
        tracing::info!("Created calendar event {} for thread {}", event_id, thread_id);
        if let Some(link) = html_link {
            self.post_quietly(&thread_id, &format!("View the calendar event: <{}>", link))
                .await;
        }

        let record = Record {
            username: invoker.username.clone(),
            channel_name: request.channel.name.clone(),
            project_name: request.project_name.clone(),
            description: request.description.clone(),
            deadline: deadline.to_string(),
            completed: Completion::No,
            thread_id,
            assignee: None,
            timestamp: now.format("%Y-%m-%d %H:%M:%S").to_string(),
            calendar_event_id: event_id,
        };
        let appended = self.records.append(&record).await;
        self.track(action, Step::Record, &appended);
        appended?;

        Ok(CREATE_SUCCESS_MESSAGE.to_string())
    }

    pub async fn assign(
        &self,
        invoker: &Invoker,
        channel: &ChannelRef,
        assignee: &str,
    ) -> AppResult<String> {
        require_thread(channel)?;
        require_team_role(invoker, self.settings.role_id().await)?;
        let assignee = assignee.trim();
        if assignee.is_empty() {
            return Err(AppError::Validation(MISSING_USERNAME_MESSAGE.to_string()));
        }
        if assignee.chars().count() > MAX_ASSIGNEE_CHARS {
            return Err(AppError::Validation(ASSIGNEE_TOO_LONG_MESSAGE.to_string()));
        }

        let _guard = self.locks.acquire(&channel.id).await;
        let action = self.journal.begin(ActionKind::Assign, &channel.id);
        tracing::info!(
            "{} is assigning thread {} to {}",
            invoker.username,
            channel.id,
            assignee
        );

        let mut stored = self.locate(action, &channel.id).await?;
        self.write_field(action, &mut stored, RecordField::Assignee, assignee)
            .await?;

        let who = assignee.to_string();
        let event_notice = self
            .sync_event(action, &stored.record, move |event| {
                events::mark_assigned(event, &who)
            })
            .await;
        let status = ThreadStatus::of(&stored.record);
        let thread_notice = self
            .sync_thread_title(action, &channel.id, move |current| {
                title::apply_status(current, status)
            })
            .await;

        Ok(compose(
            format!("The thread has been assigned to {}.", assignee),
            vec![event_notice, thread_notice],
        ))
    }

    /// Move the deadline. Only the format is checked; past dates are accepted.
    pub async fn change_deadline(
        &self,
        invoker: &Invoker,
        channel: &ChannelRef,
        raw_deadline: &str,
    ) -> AppResult<String> {
        require_thread(channel)?;
        require_team_role(invoker, self.settings.role_id().await)?;
        if raw_deadline.trim().is_empty() {
            return Err(AppError::Validation(MISSING_DEADLINE_MESSAGE.to_string()));
        }
        let deadline = Deadline::parse(raw_deadline.trim())?;
        let formatted = deadline.to_string();

        let _guard = self.locks.acquire(&channel.id).await;
        let action = self.journal.begin(ActionKind::ChangeDeadline, &channel.id);
        tracing::info!(
            "{} is moving the deadline of thread {} to {}",
            invoker.username,
            channel.id,
            formatted
        );

        let mut stored = self.locate(action, &channel.id).await?;
        self.write_field(action, &mut stored, RecordField::Deadline, &formatted)
            .await?;

        let offset = self.offset;
        let event_notice = self
            .sync_event(action, &stored.record, move |event| {
                events::move_deadline(event, &deadline, offset)
            })
            .await;
        let retitled = formatted.clone();
        let thread_notice = self
            .sync_thread_title(action, &channel.id, move |current| {
                title::with_new_deadline(current, &retitled)
            })
            .await;

        Ok(compose(
            format!("The deadline has been updated to {}.", formatted),
            vec![event_notice, thread_notice],
        ))
    }

    pub async fn complete(&self, invoker: &Invoker, channel: &ChannelRef) -> AppResult<String> {
        require_thread(channel)?;
        require_team_role(invoker, self.settings.role_id().await)?;

        let _guard = self.locks.acquire(&channel.id).await;
        let action = self.journal.begin(ActionKind::Complete, &channel.id);
        tracing::info!("{} is completing thread {}", invoker.username, channel.id);

        let mut stored = self.locate(action, &channel.id).await?;
        let already_completed = stored.record.completed == Completion::Yes;
        self.write_field(
            action,
            &mut stored,
            RecordField::Completed,
            Completion::Yes.as_str(),
        )
        .await?;

        let event_notice = if already_completed {
            self.journal.record(
                action,
                Step::Event,
                StepOutcome::Skipped("already completed".to_string()),
            );
            None
        } else {
            self.sync_event(action, &stored.record, events::mark_completed)
                .await
        };

        let status = ThreadStatus::of(&stored.record);
        let thread_notice = self
            .sync_thread_title(action, &channel.id, move |current| {
                title::apply_status(current, status)
            })
            .await;

        let archived = self.chat.archive_thread(&channel.id).await;
        self.track(action, Step::Thread, &archived);
        let archive_notice = match archived {
            Ok(()) => None,
            Err(e) => {
                tracing::error!("Failed to archive thread {}: {}", channel.id, e);
                Some(ARCHIVE_NOTICE)
            }
        };

        Ok(compose(
            COMPLETE_SUCCESS_MESSAGE.to_string(),
            vec![event_notice, thread_notice, archive_notice],
        ))
    }

    /// Table of pending requests, one entry per reply message.
    pub async fn pending_report(&self, invoker: &Invoker) -> AppResult<Vec<String>> {
        require_team_role(invoker, self.settings.role_id().await)?;

        let rows = self.records.fetch_all().await?;
        let records: Vec<Record> = rows.into_iter().map(|stored| stored.record).collect();
        let chunks = report::pending_report(&records);
        tracing::info!(
            "{} listed pending requests ({} message(s))",
            invoker.username,
            chunks.len()
        );
        Ok(chunks)
    }

    pub async fn configure(&self, invoker: &Invoker, raw_role: &str) -> AppResult<String> {
        require_admin(invoker)?;
        let role_id = self.settings.apply(raw_role).await?;
        Ok(format!("The team role ID has been updated to: {}", role_id))
    }
}
