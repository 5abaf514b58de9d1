use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// The user action a journal entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Create,
    Assign,
    ChangeDeadline,
    Complete,
}

/// One of the three systems an action keeps in step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Record,
    Event,
    Thread,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum StepOutcome {
    Succeeded,
    Failed(String),
    Skipped(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub step: Step,
    pub outcome: StepOutcome,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionEntry {
    pub id: Uuid,
    pub action: ActionKind,
    pub thread_id: String,
    pub started_at: DateTime<Utc>,
    pub steps: Vec<StepRecord>,
}

impl ActionEntry {
    /// Whether any step failed or was skipped, leaving the systems out of step.
    pub fn is_incomplete(&self) -> bool {
        self.steps
            .iter()
            .any(|s| !matches!(s.outcome, StepOutcome::Succeeded))
    }
}

/// Bounded in-memory log of recent actions and their per-system steps.
///
/// Oldest entries are dropped once `capacity` is reached.
pub struct ActionJournal {
    capacity: usize,
    entries: Mutex<VecDeque<ActionEntry>>,
}

impl ActionJournal {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::new()),
        }
    }

    fn with_entries<T>(&self, f: impl FnOnce(&mut VecDeque<ActionEntry>) -> T) -> T {
        // A poisoned lock only means another task panicked mid-push; the data is still usable.
        let mut guard = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    pub fn begin(&self, action: ActionKind, thread_id: &str) -> Uuid {
        let entry = ActionEntry {
            id: Uuid::new_v4(),
            action,
            thread_id: thread_id.to_string(),
            started_at: Utc::now(),
            steps: Vec::new(),
        };
        let id = entry.id;

        self.with_entries(|entries| {
            if entries.len() >= self.capacity {
                entries.pop_front();
            }
            entries.push_back(entry);
        });
        id
    }

    pub fn record(&self, id: Uuid, step: Step, outcome: StepOutcome) {
        if let StepOutcome::Failed(reason) = &outcome {
            tracing::warn!("Action {} step {:?} failed: {}", id, step, reason);
        }

        self.with_entries(|entries| {
            match entries.iter_mut().rev().find(|e| e.id == id) {
                Some(entry) => entry.steps.push(StepRecord {
                    step,
                    outcome,
                    at: Utc::now(),
                }),
                None => tracing::debug!("Action {} already evicted from the journal", id),
            }
        });
    }

    /// Point an entry at the thread once it exists (create starts from the parent channel).
    pub fn attach_thread(&self, id: Uuid, thread_id: &str) {
        self.with_entries(|entries| {
            if let Some(entry) = entries.iter_mut().rev().find(|e| e.id == id) {
                entry.thread_id = thread_id.to_string();
            }
        });
    }

    /// Newest first.
    pub fn recent(&self) -> Vec<ActionEntry> {
        self.with_entries(|entries| entries.iter().rev().cloned().collect())
    }

    /// Actions that left at least one system out of step, newest first.
    pub fn incomplete(&self) -> Vec<ActionEntry> {
        self.with_entries(|entries| {
            entries
                .iter()
                .rev()
                .filter(|e| e.is_incomplete())
                .cloned()
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_most_recent_entries() {
        let journal = ActionJournal::new(2);
        journal.begin(ActionKind::Create, "1");
        journal.begin(ActionKind::Assign, "2");
        journal.begin(ActionKind::Complete, "3");

        let recent = journal.recent();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].thread_id, "3");
        assert_eq!(recent[1].thread_id, "2");
    }

    #[test]
    fn lists_incomplete_actions() {
        let journal = ActionJournal::new(10);
        let ok = journal.begin(ActionKind::Assign, "1");
        journal.record(ok, Step::Record, StepOutcome::Succeeded);
        journal.record(ok, Step::Thread, StepOutcome::Succeeded);

        let broken = journal.begin(ActionKind::Complete, "2");
        journal.record(broken, Step::Record, StepOutcome::Succeeded);
        journal.record(
            broken,
            Step::Event,
            StepOutcome::Failed("calendar down".to_string()),
        );

        let incomplete = journal.incomplete();
        assert_eq!(incomplete.len(), 1);
        assert_eq!(incomplete[0].id, broken);
        assert_eq!(incomplete[0].steps.len(), 2);
    }

    #[test]
    fn steps_for_evicted_actions_are_dropped() {
        let journal = ActionJournal::new(1);
        let old = journal.begin(ActionKind::Create, "1");
        journal.begin(ActionKind::Create, "2");
        journal.record(old, Step::Record, StepOutcome::Failed("x".to_string()));
        assert!(journal.incomplete().is_empty());
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(StepOutcome::Failed("boom".to_string())).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "failed", "detail": "boom" }));
        let json = serde_json::to_value(StepOutcome::Succeeded).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "succeeded" }));
    }
}
