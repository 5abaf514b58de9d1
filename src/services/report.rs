//! Pending-request report: a fixed-width text table split into
//! message-sized code blocks.

use crate::models::{Completion, Record, RecordColumn};

pub const NOTHING_PENDING_MESSAGE: &str = "There are no marketing requests for the time being.";

/// Maximum size of one wrapped chunk, markup included.
pub const CHUNK_BUDGET: usize = 1900;

const PROJECT_WIDTH_CAP: usize = 20;
const DEADLINE_WIDTH_CAP: usize = 10;
const COMPLETED_WIDTH_CAP: usize = 9;
const ASSIGNEE_WIDTH_CAP: usize = 20;
const CELL_SEPARATOR: &str = " | ";
const RULE_SEPARATOR: &str = "-|-";
const FENCE_OPEN: &str = "```\n";
const FENCE_CLOSE: &str = "```";

const REPORT_COLUMNS: [RecordColumn; 4] = [
    RecordColumn::Project,
    RecordColumn::Deadline,
    RecordColumn::Completed,
    RecordColumn::Assignee,
];

/// Every column is capped so a table line stays far below the chunk budget,
/// whatever was typed into the sheet.
fn width_cap(column: RecordColumn) -> usize {
    match column {
        RecordColumn::Project => PROJECT_WIDTH_CAP,
        RecordColumn::Deadline => DEADLINE_WIDTH_CAP,
        RecordColumn::Completed => COMPLETED_WIDTH_CAP,
        _ => ASSIGNEE_WIDTH_CAP,
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn pad_cell(value: &str, width: usize) -> String {
    let truncated: String = value.chars().take(width).collect();
    let padding = width.saturating_sub(char_len(&truncated));
    format!("{}{}", truncated, " ".repeat(padding))
}

/// Render pending records as a table, one `\n`-terminated line per row.
///
/// Returns `None` when nothing is pending.
pub fn render_pending_table(records: &[Record]) -> Option<String> {
    let pending: Vec<&Record> = records
        .iter()
        .filter(|r| r.completed == Completion::No)
        .collect();
    if pending.is_empty() {
        return None;
    }

    let widths: Vec<usize> = REPORT_COLUMNS
        .iter()
        .map(|column| {
            let content = pending
                .iter()
                .map(|r| char_len(r.cell(*column)))
                .max()
                .unwrap_or(0);
            let width = content.max(char_len(column.header()));
            width.min(width_cap(*column))
        })
        .collect();

    let render_row = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| pad_cell(cell, *width))
            .collect::<Vec<_>>()
            .join(CELL_SEPARATOR)
    };

    let mut table = String::new();
    table.push_str(&render_row(REPORT_COLUMNS.iter().map(|c| c.header()).collect()));
    table.push('\n');
    table.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join(RULE_SEPARATOR),
    );
    table.push('\n');
    for record in pending {
        table.push_str(&render_row(
            REPORT_COLUMNS.iter().map(|c| record.cell(*c)).collect(),
        ));
        table.push('\n');
    }

    Some(table)
}

fn wrap(body: &str) -> String {
    format!("{}{}{}", FENCE_OPEN, body, FENCE_CLOSE)
}

/// Split `text` at line boundaries into code-block chunks of at most `budget`
/// characters each, markup included.
///
/// A single line longer than the budget is emitted alone in its own chunk.
pub fn paginate(text: &str, budget: usize) -> Vec<String> {
    let body_budget = budget.saturating_sub(char_len(FENCE_OPEN) + char_len(FENCE_CLOSE));
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = char_len(line);
        if current_len > 0 && current_len + line_len > body_budget {
            chunks.push(wrap(&current));
            current.clear();
            current_len = 0;
        }
        current.push_str(line);
        current_len += line_len;
    }
    if current_len > 0 {
        chunks.push(wrap(&current));
    }

    chunks
}

/// Full listing reply: table chunks, or the single "nothing pending" message.
pub fn pending_report(records: &[Record]) -> Vec<String> {
    match render_pending_table(records) {
        Some(table) => paginate(&table, CHUNK_BUDGET),
        None => vec![NOTHING_PENDING_MESSAGE.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(project: &str, completed: Completion, assignee: Option<&str>) -> Record {
        Record {
            username: "alice".to_string(),
            channel_name: "general".to_string(),
            project_name: project.to_string(),
            description: "desc".to_string(),
            deadline: "01-01-2099".to_string(),
            completed,
            thread_id: "1".to_string(),
            assignee: assignee.map(str::to_string),
            timestamp: String::new(),
            calendar_event_id: String::new(),
        }
    }

    fn unwrap_chunk(chunk: &str) -> &str {
        chunk
            .strip_prefix(FENCE_OPEN)
            .and_then(|c| c.strip_suffix(FENCE_CLOSE))
            .expect("chunk is wrapped in a code block")
    }

    #[test]
    fn only_pending_rows_are_listed() {
        let rows = vec![
            record("First", Completion::No, None),
            record("Second", Completion::Yes, None),
            record("Third", Completion::No, Some("bob")),
        ];
        let table = render_pending_table(&rows).unwrap();
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[2].starts_with("First"));
        assert!(lines[3].starts_with("Third"));
        assert!(!table.contains("Second"));
    }

    #[test]
    fn table_layout() {
        let rows = vec![record("Launch", Completion::No, Some("bob"))];
        let table = render_pending_table(&rows).unwrap();
        let expected = [
            "Project | Deadline   | Completed | Assignee\n",
            "--------|------------|-----------|---------\n",
            "Launch  | 01-01-2099 | No        | bob     \n",
        ]
        .concat();
        assert_eq!(table, expected);
    }

    #[test]
    fn separator_aligns_under_cells() {
        let rows = vec![record("Launch", Completion::No, Some("bob"))];
        let table = render_pending_table(&rows).unwrap();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[1], "--------|------------|-----------|---------");
        assert_eq!(char_len(lines[0]), char_len(lines[1]));
        assert_eq!(char_len(lines[1]), char_len(lines[2]));
    }

    #[test]
    fn project_column_is_capped() {
        let long = "A very long project name that keeps going";
        let rows = vec![record(long, Completion::No, None)];
        let table = render_pending_table(&rows).unwrap();
        let row = table.lines().nth(2).unwrap();
        assert!(row.starts_with("A very long project  | "));
        assert!(!row.contains("keeps going"));
    }

    #[test]
    fn long_cells_never_push_chunks_over_budget() {
        let long = "a".repeat(2500);
        let mut row = record("Launch", Completion::No, Some(&long));
        row.deadline = "d".repeat(2500);
        let rows = vec![row, record("Other", Completion::No, Some("bob"))];

        let table = render_pending_table(&rows).unwrap();
        let assignee_cell = table.lines().nth(2).unwrap().rsplit(CELL_SEPARATOR).next().unwrap();
        assert_eq!(assignee_cell, "a".repeat(ASSIGNEE_WIDTH_CAP));

        let chunks = pending_report(&rows);
        assert_eq!(chunks.len(), 1);
        assert!(chunks.iter().all(|c| char_len(c) <= CHUNK_BUDGET));
    }

    #[test]
    fn many_rows_with_long_cells_stay_within_budget() {
        let long = "b".repeat(500);
        let rows: Vec<Record> = (0..300)
            .map(|i| record(&format!("Project {} {}", i, long), Completion::No, Some(&long)))
            .collect();

        let chunks = pending_report(&rows);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(char_len(chunk) <= CHUNK_BUDGET);
        }
        let rebuilt: String = chunks.iter().map(|c| unwrap_chunk(c)).collect();
        assert_eq!(rebuilt, render_pending_table(&rows).unwrap());
    }

    #[test]
    fn no_pending_rows_gives_single_message() {
        let rows = vec![record("Done", Completion::Yes, None)];
        assert_eq!(
            pending_report(&rows),
            vec![NOTHING_PENDING_MESSAGE.to_string()]
        );
        assert_eq!(pending_report(&[]), vec![NOTHING_PENDING_MESSAGE.to_string()]);
    }

    #[test]
    fn small_table_is_one_chunk() {
        let rows = vec![record("Launch", Completion::No, None)];
        let chunks = pending_report(&rows);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].starts_with("```\nProject"));
        assert!(chunks[0].ends_with("\n```"));
    }

    #[test]
    fn oversized_line_gets_its_own_chunk() {
        let text = format!("short\n{}\nshort\n", "x".repeat(50));
        let chunks = paginate(&text, 20);
        assert_eq!(chunks.len(), 3);
        assert_eq!(unwrap_chunk(&chunks[1]), format!("{}\n", "x".repeat(50)));
    }

    proptest! {
        #[test]
        fn chunks_reassemble_to_table(
            lines in proptest::collection::vec("[a-z |-]{0,120}", 1..200),
            budget in 140usize..2000,
        ) {
            let text: String = lines.iter().map(|l| format!("{}\n", l)).collect();
            let chunks = paginate(&text, budget);

            let rebuilt: String = chunks.iter().map(|c| unwrap_chunk(c)).collect();
            prop_assert_eq!(&rebuilt, &text);

            for chunk in &chunks {
                prop_assert!(char_len(chunk) <= budget);
                prop_assert!(unwrap_chunk(chunk).ends_with('\n'));
            }
        }
    }
}
