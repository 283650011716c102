use crate::document::body::Body;
use crate::document::body::TableNode;
use crate::document::DocumentError;
use crate::error::BrdError;

/// Header labels written into a newly created requirements table.
pub const REQUIREMENT_HEADERS: [&str; 4] = ["Requirement ID", "Section", "Description", "Status"];

/// Structural fingerprint of the Functional Requirements table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableSignature {
    /// Exact number of grid columns
    pub column_count: usize,
    /// Lower-case fragments the header cells must contain, by position
    pub header_pattern: Vec<String>,
}

impl Default for TableSignature {
    fn default() -> Self {
        TableSignature {
            column_count: 4,
            header_pattern: ["requirement id", "section", "description", "status"]
                .iter()
                .map(|fragment| fragment.to_string())
                .collect(),
        }
    }
}

impl TableSignature {
    /// A table matches when it has the expected column count, at least one row, and
    /// header cell `i` contains `header_pattern[i]` once trimmed and lower-cased.
    pub(crate) fn matches(&self, table: &TableNode) -> bool {
        if table.rows.is_empty() || table.columns() != self.column_count {
            return false;
        }
        let headers = table.header_texts();
        headers.len() >= self.header_pattern.len()
            && self
                .header_pattern
                .iter()
                .zip(&headers)
                .all(|(fragment, header)| header.trim().to_lowercase().contains(fragment.as_str()))
    }
}

/// Where the requirement rows will go.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableTarget {
    /// Index of the first matching top-level table
    Existing(usize),
    /// A new table right after this top-level paragraph
    New { after_paragraph: usize },
}

/// Index of the first table matching `signature`, in document order.
pub(crate) fn locate_table(tables: &[TableNode], signature: &TableSignature) -> Option<usize> {
    tables.iter().position(|table| signature.matches(table))
}

/// Finds the target table, or the first paragraph mentioning `section_marker` to
/// create one after. Fails when neither exists.
pub(crate) fn locate_or_create(
    body: &Body,
    signature: &TableSignature,
    section_marker: &str,
) -> Result<TableTarget, BrdError> {
    if let Some(index) = locate_table(&body.tables, signature) {
        return Ok(TableTarget::Existing(index));
    }

    let marker = section_marker.trim().to_lowercase();
    let anchor = body
        .paragraphs
        .iter()
        .position(|paragraph| !marker.is_empty() && paragraph.text.to_lowercase().contains(&marker));
    match anchor {
        Some(after_paragraph) => Ok(TableTarget::New { after_paragraph }),
        None => Err(DocumentError::StructureNotFound(section_marker.to_owned()))?,
    }
}
