use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

// ============================================================================
// Marketing request record (one spreadsheet row)
// ============================================================================

/// Completion flag as stored in the `Completed` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Completion {
    Yes,
    No,
}

impl Completion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Completion::Yes => "Yes",
            Completion::No => "No",
        }
    }

    /// Anything other than an explicit "Yes" counts as pending.
    pub fn from_cell(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("yes") {
            Completion::Yes
        } else {
            Completion::No
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub username: String,
    pub channel_name: String,
    pub project_name: String,
    pub description: String,
    pub deadline: String,
    pub completed: Completion,
    pub thread_id: String,
    pub assignee: Option<String>,
    pub timestamp: String,
    pub calendar_event_id: String,
}

/// A record together with its 1-based row number in the sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub row: usize,
    pub record: Record,
}

/// Mutable fields of a record after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    Deadline,
    Completed,
    Assignee,
}

impl RecordField {
    pub fn column(&self) -> RecordColumn {
        match self {
            RecordField::Deadline => RecordColumn::Deadline,
            RecordField::Completed => RecordColumn::Completed,
            RecordField::Assignee => RecordColumn::Assignee,
        }
    }
}

impl Record {
    /// Apply a single field change in memory.
    pub fn set_field(&mut self, field: RecordField, value: &str) {
        match field {
            RecordField::Deadline => self.deadline = value.to_string(),
            RecordField::Completed => self.completed = Completion::from_cell(value),
            RecordField::Assignee => {
                self.assignee = Some(value.to_string()).filter(|v| !v.trim().is_empty())
            }
        }
    }

    pub fn cell(&self, column: RecordColumn) -> &str {
        match column {
            RecordColumn::Username => &self.username,
            RecordColumn::ChannelName => &self.channel_name,
            RecordColumn::Project => &self.project_name,
            RecordColumn::Description => &self.description,
            RecordColumn::Deadline => &self.deadline,
            RecordColumn::Completed => self.completed.as_str(),
            RecordColumn::ThreadId => &self.thread_id,
            RecordColumn::Assignee => self.assignee.as_deref().unwrap_or(""),
            RecordColumn::Timestamp => &self.timestamp,
            RecordColumn::CalendarEventId => &self.calendar_event_id,
        }
    }
}

// ============================================================================
// Sheet schema
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordColumn {
    Username,
    ChannelName,
    Project,
    Description,
    Deadline,
    Completed,
    ThreadId,
    Assignee,
    Timestamp,
    CalendarEventId,
}

impl RecordColumn {
    pub const ALL: [RecordColumn; 10] = [
        RecordColumn::Username,
        RecordColumn::ChannelName,
        RecordColumn::Project,
        RecordColumn::Description,
        RecordColumn::Deadline,
        RecordColumn::Completed,
        RecordColumn::ThreadId,
        RecordColumn::Assignee,
        RecordColumn::Timestamp,
        RecordColumn::CalendarEventId,
    ];

    /// Header label in the first sheet row.
    pub fn header(&self) -> &'static str {
        match self {
            RecordColumn::Username => "Username",
            RecordColumn::ChannelName => "ChannelName",
            RecordColumn::Project => "Project",
            RecordColumn::Description => "Description",
            RecordColumn::Deadline => "Deadline",
            RecordColumn::Completed => "Completed",
            RecordColumn::ThreadId => "ThreadID",
            RecordColumn::Assignee => "Assignee",
            RecordColumn::Timestamp => "Timestamp",
            RecordColumn::CalendarEventId => "CalendarEventId",
        }
    }
}

/// Column positions resolved from the sheet's header row.
///
/// Rows are never addressed positionally outside of this type; every read and
/// write goes through `decode` / `encode` / `index_of`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLayout {
    indexes: [usize; 10],
    width: usize,
}

impl SheetLayout {
    pub fn from_header(header: &[String]) -> AppResult<Self> {
        let mut indexes = [0usize; 10];
        let mut missing = Vec::new();

        for (slot, column) in RecordColumn::ALL.iter().enumerate() {
            match header
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(column.header()))
            {
                Some(idx) => indexes[slot] = idx,
                None => missing.push(column.header()),
            }
        }

        if !missing.is_empty() {
            return Err(AppError::Config(format!(
                "Sheet header is missing columns: {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            indexes,
            width: header.len(),
        })
    }

    /// Layout matching `RecordColumn::ALL` order, used when the sheet is empty.
    pub fn canonical() -> Self {
        let mut indexes = [0usize; 10];
        for (slot, idx) in indexes.iter_mut().enumerate() {
            *idx = slot;
        }
        Self {
            indexes,
            width: RecordColumn::ALL.len(),
        }
    }

    pub fn header_row() -> Vec<String> {
        RecordColumn::ALL
            .iter()
            .map(|c| c.header().to_string())
            .collect()
    }

    pub fn index_of(&self, column: RecordColumn) -> usize {
        let slot = RecordColumn::ALL
            .iter()
            .position(|c| *c == column)
            .unwrap_or_default();
        self.indexes[slot]
    }

    pub fn decode(&self, row: &[String]) -> Record {
        let cell = |column: RecordColumn| -> String {
            row.get(self.index_of(column))
                .map(|v| v.to_string())
                .unwrap_or_default()
        };

        let assignee = cell(RecordColumn::Assignee);
        Record {
            username: cell(RecordColumn::Username),
            channel_name: cell(RecordColumn::ChannelName),
            project_name: cell(RecordColumn::Project),
            description: cell(RecordColumn::Description),
            deadline: cell(RecordColumn::Deadline),
            completed: Completion::from_cell(&cell(RecordColumn::Completed)),
            thread_id: cell(RecordColumn::ThreadId),
            assignee: Some(assignee).filter(|a| !a.trim().is_empty()),
            timestamp: cell(RecordColumn::Timestamp),
            calendar_event_id: cell(RecordColumn::CalendarEventId),
        }
    }

    pub fn encode(&self, record: &Record) -> Vec<String> {
        let mut row = vec![String::new(); self.width];
        for column in RecordColumn::ALL {
            row[self.index_of(column)] = record.cell(column).to_string();
        }
        row
    }
}

/// Convert a 0-based column index into its A1 letter form (0 -> A, 26 -> AA).
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    fn sample_record() -> Record {
        Record {
            username: "alice".to_string(),
            channel_name: "marketing".to_string(),
            project_name: "Launch".to_string(),
            description: "New landing page".to_string(),
            deadline: "01-01-2099".to_string(),
            completed: Completion::No,
            thread_id: "1001".to_string(),
            assignee: None,
            timestamp: "2026-10-19 10:00:00".to_string(),
            calendar_event_id: "evt1".to_string(),
        }
    }

    #[test]
    fn layout_resolves_shuffled_header() {
        let layout = SheetLayout::from_header(&header(&[
            "ThreadID",
            "Username",
            "ChannelName",
            "Project",
            "Description",
            "Deadline",
            "Completed",
            "Assignee",
            "Timestamp",
            "CalendarEventId",
            "Notes",
        ]))
        .unwrap();

        assert_eq!(layout.index_of(RecordColumn::ThreadId), 0);
        assert_eq!(layout.index_of(RecordColumn::Username), 1);
        assert_eq!(layout.index_of(RecordColumn::CalendarEventId), 9);

        let row = layout.encode(&sample_record());
        assert_eq!(row.len(), 11);
        assert_eq!(row[0], "1001");
        assert_eq!(row[10], "");
        assert_eq!(layout.decode(&row), sample_record());
    }

    #[test]
    fn layout_reports_missing_columns() {
        let err = SheetLayout::from_header(&header(&["Username", "Project"])).unwrap_err();
        match err {
            AppError::Config(msg) => {
                assert!(msg.contains("ThreadID"));
                assert!(msg.contains("CalendarEventId"));
                assert!(!msg.contains("Username"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn decode_tolerates_short_rows() {
        let layout = SheetLayout::canonical();
        let record = layout.decode(&header(&["bob", "general", "Promo"]));
        assert_eq!(record.username, "bob");
        assert_eq!(record.project_name, "Promo");
        assert_eq!(record.thread_id, "");
        assert_eq!(record.assignee, None);
        assert_eq!(record.completed, Completion::No);
    }

    #[test]
    fn set_field_updates_only_that_field() {
        let mut record = sample_record();
        record.set_field(RecordField::Assignee, "carol");
        record.set_field(RecordField::Completed, "Yes");
        record.set_field(RecordField::Deadline, "02-02-2099");
        assert_eq!(record.assignee.as_deref(), Some("carol"));
        assert_eq!(record.completed, Completion::Yes);
        assert_eq!(record.deadline, "02-02-2099");
        assert_eq!(record.project_name, "Launch");
    }

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(9), "J");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }
}
