//! Domain models: sheet records, deadlines and thread titles.

pub mod deadline;
pub mod record;
pub mod title;

pub use self::deadline::Deadline;
pub use self::record::{
    column_letter, Completion, Record, RecordColumn, RecordField, SheetLayout, StoredRecord,
};
pub use self::title::ThreadStatus;
