use std::fmt::Write as _;

use serde_json::{Map as JsonMap, Value as JsonValue};
use slotkeep_core::Archive;
use slotkeep_core::archive::ArchiveRow;

pub const DEFAULT_COLUMN_WIDTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableOptions {
    pub column_width: usize,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            column_width: DEFAULT_COLUMN_WIDTH,
        }
    }
}

pub fn render_table(archive: &Archive) -> String {
    render_table_with_options(archive, TableOptions::default())
}

pub fn render_table_with_options(archive: &Archive, options: TableOptions) -> String {
    render_rows(&archive.rows(), options)
}

/// One header line and one line per row, columns centered and tab separated.
pub fn render_rows(rows: &[ArchiveRow], options: TableOptions) -> String {
    let width = options.column_width;
    let mut out = String::new();
    push_line(&mut out, width, ["id", "slot", "memo"]);
    for row in rows {
        let id = row.id.to_string();
        let slots = row.slots.join(",");
        push_line(&mut out, width, [id.as_str(), slots.as_str(), row.file_name.as_str()]);
    }
    out
}

fn push_line(out: &mut String, width: usize, cells: [&str; 3]) {
    let [id, slot, memo] = cells;
    let _ = writeln!(out, "{id:^width$}\t{slot:^width$}\t{memo:^width$}");
}

pub fn render_json(archive: &Archive) -> JsonValue {
    let mut out = JsonMap::new();
    out.insert(
        "entries".to_string(),
        JsonValue::Array(archive.rows().iter().map(row_to_json).collect()),
    );

    let mut slots = JsonMap::new();
    for (slot, &id) in archive.slots() {
        slots.insert(slot.clone(), JsonValue::from(id));
    }
    out.insert("slots".to_string(), JsonValue::Object(slots));
    JsonValue::Object(out)
}

fn row_to_json(row: &ArchiveRow) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("id".to_string(), JsonValue::from(row.id));
    m.insert(
        "slots".to_string(),
        JsonValue::Array(row.slots.iter().cloned().map(JsonValue::String).collect()),
    );
    m.insert(
        "annotation".to_string(),
        JsonValue::String(row.annotation.clone()),
    );
    m.insert("file".to_string(), JsonValue::String(row.file_name.clone()));
    JsonValue::Object(m)
}
