use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::error::AppResult;
use crate::google::sheets::{quote_sheet_title, SheetsClient};
use crate::models::{column_letter, Record, RecordField, SheetLayout, StoredRecord};

/// First data row; row 1 holds the column headers.
const FIRST_DATA_ROW: usize = 2;

/// Persistence for marketing request records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Every record currently stored, in sheet order.
    async fn fetch_all(&self) -> AppResult<Vec<StoredRecord>>;

    /// Persist one field change. The in-memory record is updated only after
    /// the remote write succeeded.
    async fn update_field(
        &self,
        stored: &mut StoredRecord,
        field: RecordField,
        value: &str,
    ) -> AppResult<()>;

    /// Append a new record after the last row.
    async fn append(&self, record: &Record) -> AppResult<()>;
}

/// First record whose thread id matches; later duplicates are ignored.
pub fn find_by_thread_id<'a>(
    rows: &'a [StoredRecord],
    thread_id: &str,
) -> Option<&'a StoredRecord> {
    rows.iter().find(|r| r.record.thread_id == thread_id)
}

/// Record store backed by the first worksheet of a spreadsheet.
pub struct SheetRecordStore {
    sheets: SheetsClient,
    layout: OnceCell<SheetLayout>,
}

impl SheetRecordStore {
    pub fn new(sheets: SheetsClient) -> Self {
        Self {
            sheets,
            layout: OnceCell::new(),
        }
    }

    async fn sheet_range(&self, suffix: &str) -> AppResult<String> {
        let title = self.sheets.first_sheet_title().await?;
        Ok(format!("{}!{}", quote_sheet_title(&title), suffix))
    }

    fn remember_layout(&self, layout: SheetLayout) -> SheetLayout {
        // A concurrent initialiser may have won; either value came from the same header.
        let _ = self.layout.set(layout.clone());
        layout
    }

    /// Column layout, read from the header row the first time it is needed.
    async fn layout(&self) -> AppResult<SheetLayout> {
        if let Some(layout) = self.layout.get() {
            return Ok(layout.clone());
        }

        let range = self.sheet_range("1:1").await?;
        let rows = self.sheets.get_values(&range).await?;
        match rows.into_iter().next() {
            Some(header) if !header.iter().all(|h| h.trim().is_empty()) => {
                let layout = SheetLayout::from_header(&header)?;
                Ok(self.remember_layout(layout))
            }
            _ => {
                tracing::warn!("Sheet has no header row, writing the default one");
                self.sheets
                    .update_values(&range, &[SheetLayout::header_row()])
                    .await?;
                Ok(self.remember_layout(SheetLayout::canonical()))
            }
        }
    }
}

#[async_trait]
impl RecordStore for SheetRecordStore {
    async fn fetch_all(&self) -> AppResult<Vec<StoredRecord>> {
        let layout = self.layout().await?;
        let range = self.sheet_range(&format!("A{}:ZZ", FIRST_DATA_ROW)).await?;
        let rows = self.sheets.get_values(&range).await?;

        let records: Vec<StoredRecord> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.iter().any(|cell| !cell.trim().is_empty()))
            .map(|(offset, row)| StoredRecord {
                row: FIRST_DATA_ROW + offset,
                record: layout.decode(row),
            })
            .collect();

        tracing::debug!("Fetched {} records from the sheet", records.len());
        Ok(records)
    }

    async fn update_field(
        &self,
        stored: &mut StoredRecord,
        field: RecordField,
        value: &str,
    ) -> AppResult<()> {
        let layout = self.layout().await?;
        let cell = format!(
            "{}{}",
            column_letter(layout.index_of(field.column())),
            stored.row
        );
        let range = self.sheet_range(&cell).await?;

        self.sheets
            .update_values(&range, &[vec![value.to_string()]])
            .await?;
        stored.record.set_field(field, value);

        tracing::info!(
            "Updated {:?} of row {} (thread {})",
            field,
            stored.row,
            stored.record.thread_id
        );
        Ok(())
    }

    async fn append(&self, record: &Record) -> AppResult<()> {
        let layout = self.layout().await?;
        let range = self.sheet_range("A1").await?;
        self.sheets
            .append_values(&range, &[layout.encode(record)])
            .await?;

        tracing::info!(
            "Appended record for project '{}' (thread {})",
            record.project_name,
            record.thread_id
        );
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::error::AppError;

    /// In-memory record store used by the workflow tests.
    #[derive(Default)]
    pub struct MemoryRecordStore {
        pub rows: Mutex<Vec<Record>>,
        pub fail_reads: AtomicBool,
        pub fail_writes: AtomicBool,
    }

    impl MemoryRecordStore {
        pub fn with_records(records: Vec<Record>) -> Self {
            Self {
                rows: Mutex::new(records),
                ..Default::default()
            }
        }

        pub fn snapshot(&self) -> Vec<Record> {
            self.rows.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RecordStore for MemoryRecordStore {
        async fn fetch_all(&self) -> AppResult<Vec<StoredRecord>> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(AppError::Sheets("read failed".to_string()));
            }
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .enumerate()
                .map(|(i, r)| StoredRecord {
                    row: FIRST_DATA_ROW + i,
                    record: r.clone(),
                })
                .collect())
        }

        async fn update_field(
            &self,
            stored: &mut StoredRecord,
            field: RecordField,
            value: &str,
        ) -> AppResult<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(AppError::Sheets("write failed".to_string()));
            }
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .get_mut(stored.row - FIRST_DATA_ROW)
                .ok_or_else(|| AppError::Sheets("row out of range".to_string()))?;
            row.set_field(field, value);
            stored.record.set_field(field, value);
            Ok(())
        }

        async fn append(&self, record: &Record) -> AppResult<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(AppError::Sheets("append failed".to_string()));
            }
            self.rows.lock().unwrap().push(record.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Completion;

    fn record(thread_id: &str, project: &str) -> Record {
        Record {
            username: "alice".to_string(),
            channel_name: "general".to_string(),
            project_name: project.to_string(),
            description: "desc".to_string(),
            deadline: "01-01-2099".to_string(),
            completed: Completion::No,
            thread_id: thread_id.to_string(),
            assignee: None,
            timestamp: "2026-10-19 10:00:00".to_string(),
            calendar_event_id: "evt".to_string(),
        }
    }

    fn stored(rows: Vec<Record>) -> Vec<StoredRecord> {
        rows.into_iter()
            .enumerate()
            .map(|(i, record)| StoredRecord { row: i + 2, record })
            .collect()
    }

    #[test]
    fn lookup_returns_first_match() {
        let rows = stored(vec![
            record("1", "A"),
            record("2", "B"),
            record("2", "C"),
        ]);
        let found = find_by_thread_id(&rows, "2").unwrap();
        assert_eq!(found.record.project_name, "B");
        assert_eq!(found.row, 3);
    }

    #[test]
    fn lookup_without_match_is_none() {
        let rows = stored(vec![record("1", "A")]);
        assert!(find_by_thread_id(&rows, "42").is_none());
        assert!(find_by_thread_id(&[], "1").is_none());
    }

    #[tokio::test]
    async fn memory_store_updates_row_and_copy() {
        let store = memory::MemoryRecordStore::with_records(vec![record("1", "A")]);
        let mut rows = store.fetch_all().await.unwrap();
        let target = &mut rows[0];
        store
            .update_field(target, RecordField::Assignee, "bob")
            .await
            .unwrap();
        assert_eq!(target.record.assignee.as_deref(), Some("bob"));
        assert_eq!(store.snapshot()[0].assignee.as_deref(), Some("bob"));
    }
}
