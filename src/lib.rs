//! # BRD Builder
//!
//! Turns a requirements workbook into the "Functional Requirements" table of a
//! Business Requirements Document template.
//!
//! ## Pipeline
//!
//! - **Spreadsheet**: reads one sheet of an `.xlsx` workbook as header labels plus rows of text
//! - **Requirements**: normalizes headers, carries the current form down the rows,
//!   filters by approval status and groups requirements by form
//! - **Document**: finds the requirements table of a `.docx` template (or the paragraph
//!   to create it after) and rebuilds its rows, leaving every other part untouched
//!
//! [`Generator`] runs the whole pipeline with a [`GeneratorConfig`].
pub mod config;
pub mod document;
pub mod error;
pub mod generator;
pub(crate) mod helpers;
pub mod requirements;
pub mod spreadsheet;

#[cfg(test)]
mod fixtures;

pub use config::GeneratorConfig;
pub use config::TableStyle;
pub use error::BrdError;
pub use error::ErrorKind;
pub use generator::GenerateRequest;
pub use generator::Generated;
pub use generator::Generator;
pub use generator::Preview;
pub use requirements::FilterMode;
pub use requirements::FormGroup;
pub use requirements::Requirement;
