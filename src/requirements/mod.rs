//! # Requirements Module
//!
//! Turns a spreadsheet [`Table`](crate::spreadsheet::Table) into ordered
//! [`FormGroup`]s: headers are normalized to canonical column keys, rows are
//! folded into [`Requirement`]s carrying the most recent form label, filtered by
//! approval status and partitioned by form in first-seen order.
use serde::Serialize;
use thiserror::Error;

pub mod extract;
pub mod filter;
pub mod group;
pub mod header;

pub use extract::extract_requirements;
pub use filter::filter_by_status;
pub use filter::FilterMode;
pub use group::group_by_form;
pub use header::normalize_header;
pub use header::Records;
pub use header::Row;

/// Canonical key of the form (section heading) column
pub const COLUMN_FORM: &str = "form";
/// Canonical key of the requirement id column
pub const COLUMN_REQ_ID: &str = "req id#*";
/// Canonical key of the section column
pub const COLUMN_SECTION: &str = "section*";
/// Canonical key of the description column
pub const COLUMN_DESCRIPTION: &str = "description *";
/// Canonical key every status header variant is folded into
pub const COLUMN_STATUS: &str = "status *";

/// Columns a requirements sheet must provide, in reporting order.
pub const EXPECTED_COLUMNS: [&str; 5] = [
    COLUMN_FORM,
    COLUMN_REQ_ID,
    COLUMN_SECTION,
    COLUMN_DESCRIPTION,
    COLUMN_STATUS,
];

/// Display label for requirements that never saw a form value.
pub const OTHER_FORM_LABEL: &str = "Other";

/// Errors raised while validating the requirement columns.
#[derive(Error, Debug)]
pub enum RequirementError {
    #[error("Missing required Excel columns: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("Excel columns appear more than once: {0:?}")]
    DuplicateColumns(Vec<String>),
}

/// One requirement row of the spreadsheet.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Requirement {
    #[serde(rename = "req_id")]
    pub id: String,
    pub section: String,
    pub description: String,
    pub status: String,
    /// Form carried forward from the closest row above that named one
    pub form: String,
}

/// Requirements sharing one form value, in spreadsheet order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FormGroup {
    pub form: String,
    pub requirements: Vec<Requirement>,
}

impl FormGroup {
    /// Form label for display, substituting [`OTHER_FORM_LABEL`] for the empty form.
    pub fn label(&self) -> &str {
        if self.form.is_empty() {
            OTHER_FORM_LABEL
        } else {
            &self.form
        }
    }

    /// Groups without a form label or without requirements are left out of the document.
    pub fn is_rendered(&self) -> bool {
        !self.form.is_empty() && !self.requirements.is_empty()
    }
}
