//! Thread title policy.
//!
//! The thread title is a display projection of a record's state: a status
//! glyph prefix and a trailing `" - <deadline>"` segment. The record is the
//! source of truth; titles are only rewritten through [`apply_status`] and
//! [`with_new_deadline`].

use serde::Serialize;

use super::record::{Completion, Record};

pub const OPEN_GLYPH: &str = "❌";
pub const ASSIGNED_GLYPH: &str = "⏳";
pub const COMPLETED_GLYPH: &str = "✅";

const DEADLINE_SEPARATOR: &str = " - ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadStatus {
    Open,
    Assigned,
    Completed,
}

impl ThreadStatus {
    pub fn glyph(&self) -> &'static str {
        match self {
            ThreadStatus::Open => OPEN_GLYPH,
            ThreadStatus::Assigned => ASSIGNED_GLYPH,
            ThreadStatus::Completed => COMPLETED_GLYPH,
        }
    }

    pub fn of(record: &Record) -> Self {
        if record.completed == Completion::Yes {
            ThreadStatus::Completed
        } else if record.assignee.is_some() {
            ThreadStatus::Assigned
        } else {
            ThreadStatus::Open
        }
    }
}

/// Title for a freshly created request thread.
pub fn initial_title(project_name: &str, deadline: &str) -> String {
    format!(
        "{} {}{}{}",
        OPEN_GLYPH, project_name, DEADLINE_SEPARATOR, deadline
    )
}

/// Swap a leading open glyph for the assigned glyph; any other title is left alone.
pub fn mark_assigned(title: &str) -> String {
    match title.strip_prefix(ThreadStatus::Open.glyph()) {
        Some(rest) => format!("{}{}", ThreadStatus::Assigned.glyph(), rest),
        None => title.to_string(),
    }
}

/// Replace whichever of the open/assigned glyphs appears first with the completed glyph.
pub fn mark_completed(title: &str) -> String {
    let target = [ThreadStatus::Open, ThreadStatus::Assigned]
        .iter()
        .filter_map(|status| title.find(status.glyph()).map(|idx| (idx, status.glyph())))
        .min_by_key(|(idx, _)| *idx);

    match target {
        Some((idx, glyph)) => {
            let mut out = String::with_capacity(title.len());
            out.push_str(&title[..idx]);
            out.push_str(ThreadStatus::Completed.glyph());
            out.push_str(&title[idx + glyph.len()..]);
            out
        }
        None => title.to_string(),
    }
}

/// Swap the trailing deadline segment for `new_deadline`.
///
/// Only the final `" - "` segment is treated as the deadline, so a project
/// name that itself contains `" - "` keeps all of its earlier segments.
pub fn with_new_deadline(title: &str, new_deadline: &str) -> String {
    let parts: Vec<&str> = title.split(DEADLINE_SEPARATOR).collect();
    let head = parts[..parts.len().saturating_sub(1)]
        .join(DEADLINE_SEPARATOR)
        .trim()
        .to_string();
    format!("{}{}{}", head, DEADLINE_SEPARATOR, new_deadline)
}

/// Project a status onto an existing title.
pub fn apply_status(title: &str, status: ThreadStatus) -> String {
    match status {
        ThreadStatus::Open => title.to_string(),
        ThreadStatus::Assigned => mark_assigned(title),
        ThreadStatus::Completed => mark_completed(title),
    }
}
