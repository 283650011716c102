use crate::requirements::COLUMN_STATUS;
use crate::spreadsheet::Table;
use std::collections::HashMap;

/// One data row keyed by canonical column key.
pub type Row = HashMap<String, String>;

/// Maps a raw column label to its canonical key: whitespace runs collapse to one
/// space, the label is trimmed and lower-cased, and any label mentioning "status"
/// becomes [`COLUMN_STATUS`].
pub fn normalize_header(raw: &str) -> String {
    let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    if normalized.contains("status") {
        COLUMN_STATUS.to_owned()
    } else {
        normalized
    }
}

/// Spreadsheet rows re-keyed by canonical column key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Records {
    /// Canonical keys of every labeled column, left to right, duplicates kept
    pub columns: Vec<String>,
    /// Data rows in sheet order
    pub rows: Vec<Row>,
}

impl Records {
    /// Normalizes the header labels of `table`. When two columns share a canonical
    /// key the leftmost one supplies the row values.
    pub fn from_table(table: &Table) -> Records {
        let columns: Vec<String> = table.headers.iter().map(|label| normalize_header(label)).collect();
        let rows = table
            .rows
            .iter()
            .map(|values| {
                let mut row = Row::with_capacity(columns.len());
                for (key, value) in columns.iter().zip(values) {
                    row.entry(key.to_owned()).or_insert_with(|| value.to_owned());
                }
                row
            })
            .collect();
        Records { columns, rows }
    }
}
