//! # Document Module
//!
//! The Word template collaborator. A [`Document`] holds the package in memory, the
//! bytes of its main part and a scan of the top-level paragraphs and tables. The
//! requirements table is located by [`TableSignature`] (or created after an anchor
//! paragraph) and rebuilt by splicing new rows into the main part; every other part
//! of the package is written back byte-for-byte.
use crate::config::TableStyle;
use crate::document::body::Body;
use crate::error::BrdError;
use crate::error::ResultMessage;
use crate::helpers::zip::rewrite_package;
use crate::helpers::zip::ZipHelper;
use crate::requirements::FormGroup;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::io::Cursor;
use thiserror::Error;
use zip::ZipArchive;

pub(crate) mod body;
pub mod locator;
pub(crate) mod render;

pub use locator::TableSignature;
pub use locator::TableTarget;
pub use locator::REQUIREMENT_HEADERS;

/// Main document part of a WordprocessingML package
pub const DOCUMENT_PART: &str = "word/document.xml";

/// Errors raised while reading or rebuilding a document.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Document part '{0}' is missing")]
    MissingPart(String),

    #[error("Document has no body")]
    MissingBody,

    #[error("No Functional Requirements table and no paragraph containing '{0}' to create one after")]
    StructureNotFound(String),

    #[error("Table target {0:?} does not exist in this document")]
    InvalidTarget(TableTarget),

    #[error("Rebuilt table has {found} rows, expected {expected}")]
    RowCountMismatch { expected: usize, found: usize },
}

/// A Word document opened from its bytes.
pub struct Document {
    archive: ZipArchive<Cursor<Vec<u8>>>,
    xml: Vec<u8>,
    body: Body,
    modified: bool,
}

/// What a rebuild did to the requirements table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RebuildReport {
    /// Index of the requirements table among the top-level tables
    pub table_index: usize,
    /// Whether the table was created after the anchor paragraph
    pub created: bool,
    /// Data rows removed from the existing table
    pub cleared_rows: usize,
    /// Merged form header rows written
    pub form_rows: usize,
    /// Requirement rows written
    pub requirement_rows: usize,
    /// Rows of the rebuilt table, header included
    pub total_rows: usize,
}

/// Summary of one top-level table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TableOutline {
    pub index: usize,
    pub rows: usize,
    pub columns: usize,
    pub headers: Vec<String>,
    /// Whether this is the table a rebuild would target
    pub is_requirements_table: bool,
}

/// Top-level structure of a document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Outline {
    pub tables: Vec<TableOutline>,
    /// Non-empty top-level paragraph texts
    pub paragraphs: Vec<String>,
}

impl fmt::Display for Outline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Tables: {}", self.tables.len())?;
        for table in &self.tables {
            let marker = if table.is_requirements_table { " <- requirements table" } else { "" };
            writeln!(
                f,
                "  [{}] {} rows x {} columns: {}{}",
                table.index,
                table.rows,
                table.columns,
                table.headers.join(" | "),
                marker,
            )?;
        }
        writeln!(f, "Paragraphs: {}", self.paragraphs.len())?;
        for paragraph in &self.paragraphs {
            writeln!(f, "  {paragraph}")?;
        }
        Ok(())
    }
}

impl Document {
    /// Opens a .docx package and scans its main document part.
    pub fn open(bytes: Vec<u8>) -> Result<Document, BrdError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let xml = archive
            .read_bytes(DOCUMENT_PART)?
            .ok_or_else(|| DocumentError::MissingPart(DOCUMENT_PART.to_owned()))?;
        let body = Body::scan(&xml).with_prefix(DOCUMENT_PART)?;
        Ok(Document { archive, xml, body, modified: false })
    }

    pub fn table_count(&self) -> usize {
        self.body.tables.len()
    }

    pub fn paragraph_count(&self) -> usize {
        self.body.paragraphs.len()
    }

    /// Texts of the top-level paragraphs in document order.
    pub fn paragraph_texts(&self) -> Vec<&str> {
        self.body.paragraphs.iter().map(|paragraph| paragraph.text.as_str()).collect()
    }

    /// Cell texts of a top-level table, row by row, one entry per `w:tc`.
    pub fn table_texts(&self, index: usize) -> Option<Vec<Vec<String>>> {
        self.body.tables.get(index).map(|table| {
            table
                .rows
                .iter()
                .map(|row| row.cells.iter().map(|cell| cell.text()).collect())
                .collect()
        })
    }

    /// Summarizes the tables and paragraphs, flagging the table `signature` selects.
    pub fn outline(&self, signature: &TableSignature) -> Outline {
        let target = locator::locate_table(&self.body.tables, signature);
        let tables = self
            .body
            .tables
            .iter()
            .enumerate()
            .map(|(index, table)| TableOutline {
                index,
                rows: table.rows.len(),
                columns: table.columns(),
                headers: table.header_texts(),
                is_requirements_table: target == Some(index),
            })
            .collect();
        let paragraphs = self
            .body
            .paragraphs
            .iter()
            .map(|paragraph| paragraph.text.trim())
            .filter(|text| !text.is_empty())
            .map(str::to_owned)
            .collect();
        Outline { tables, paragraphs }
    }

    /// Finds the requirements table, or the paragraph to create it after.
    pub fn locate(&self, signature: &TableSignature, section_marker: &str) -> Result<TableTarget, BrdError> {
        let target = locator::locate_or_create(&self.body, signature, section_marker)?;
        match target {
            TableTarget::Existing(index) => {
                log::info!(
                    "Found requirements table at index {} with headers {:?}",
                    index,
                    self.body.tables[index].header_texts()
                );
            }
            TableTarget::New { after_paragraph } => {
                log::info!(
                    "No requirements table found, creating one after paragraph '{}'",
                    self.body.paragraphs[after_paragraph].text.trim()
                );
            }
        }
        Ok(target)
    }

    /// Replaces the data rows of the target table with rows for `groups`.
    ///
    /// The new main part is re-scanned and the table's row count checked before it
    /// replaces the current one, so a failed rebuild leaves the document unchanged.
    pub fn rebuild(
        &mut self,
        target: TableTarget,
        groups: &[FormGroup],
        style: &TableStyle,
    ) -> Result<RebuildReport, BrdError> {
        let invalid = || DocumentError::InvalidTarget(target);
        let (edits, table_index, cleared_rows, columns) = match target {
            TableTarget::Existing(index) => {
                let table = self.body.tables.get(index).ok_or_else(invalid)?;
                let columns = table.columns();
                let rows = render::requirement_rows(groups, columns, style);
                let edits = render::rebuild_table(&self.xml, table, &rows, style);
                (edits, index, table.rows.len().saturating_sub(1), columns)
            }
            TableTarget::New { after_paragraph } => {
                let anchor = self.body.paragraphs.get(after_paragraph).ok_or_else(invalid)?;
                let columns = REQUIREMENT_HEADERS.len();
                let rows = render::requirement_rows(groups, columns, style);
                let index = self.body.tables.iter().filter(|table| table.span.start < anchor.span.start).count();
                (vec![render::create_table(anchor, &rows, style)], index, 0, columns)
            }
        };
        log::debug!("Rebuilding a {columns}-column table with {} edits", edits.len());

        let xml = render::apply_edits(&self.xml, edits);
        let body = Body::scan(&xml).with_prefix(DOCUMENT_PART)?;
        let expected = 1 + render::expected_row_count(groups);
        let found = body.tables.get(table_index).map(|table| table.rows.len()).unwrap_or_default();
        if found != expected {
            Err(DocumentError::RowCountMismatch { expected, found })?
        }

        let form_rows = groups.iter().filter(|group| group.is_rendered()).count();
        let report = RebuildReport {
            table_index,
            created: matches!(target, TableTarget::New { .. }),
            cleared_rows,
            form_rows,
            requirement_rows: expected - 1 - form_rows,
            total_rows: found,
        };
        log::info!("Cleared {} stale data rows", report.cleared_rows);
        log::info!(
            "Table {} now has {} rows ({} form headers, {} requirements); {} other tables preserved",
            report.table_index,
            report.total_rows,
            report.form_rows,
            report.requirement_rows,
            body.tables.len() - 1,
        );

        self.xml = xml;
        self.body = body;
        self.modified = true;
        Ok(report)
    }

    /// Serializes the package. Only the main part is rewritten, and only when changed.
    pub fn save(&mut self) -> Result<Vec<u8>, BrdError> {
        let mut replacements = HashMap::new();
        if self.modified {
            replacements.insert(DOCUMENT_PART.to_owned(), self.xml.clone());
        }
        rewrite_package(&mut self.archive, &replacements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::fixtures;
    use crate::requirements::Requirement;

    fn groups(sizes: &[(&str, usize)]) -> Vec<FormGroup> {
        let mut next = 0;
        sizes.iter()
            .map(|(form, count)| FormGroup {
                form: form.to_string(),
                requirements: (0..*count)
                    .map(|_| {
                        next += 1;
                        Requirement {
                            id: format!("R{next}"),
                            section: "Section".to_owned(),
                            description: format!("Requirement {next}"),
                            status: "Final".to_owned(),
                            form: form.to_string(),
                        }
                    })
                    .collect(),
            })
            .collect()
    }

    fn template() -> Vec<u8> {
        fixtures::docx(&format!(
            "{}{}{}{}{}{}",
            fixtures::paragraph("Document Information"),
            fixtures::table(&[["Project", "BRD"], ["Owner", "PMO"]]),
            fixtures::paragraph("Document History"),
            fixtures::table(&[["Version", "Date", "Author", "Description"], ["1.0", "2024-01-01", "A", "Draft"]]),
            fixtures::paragraph("3. Functional Requirements"),
            fixtures::table(&[
                ["Requirement ID", "Section", "Description", "Status"],
                ["OLD", "x", "y", "z"],
            ]),
        ))
    }

    #[test]
    fn open_reports_structure() {
        let document = Document::open(template()).unwrap();
        assert_eq!(document.table_count(), 3);
        assert_eq!(document.paragraph_count(), 3);
        assert_eq!(document.paragraph_texts()[2], "3. Functional Requirements");
        assert_eq!(document.table_texts(0).unwrap(), vec![vec!["Project", "BRD"], vec!["Owner", "PMO"]]);
        assert!(document.table_texts(3).is_none());
    }

    #[test]
    fn open_rejects_packages_without_main_part() {
        let bytes = fixtures::package(&[("word/styles.xml", "<w:styles/>".to_owned())]);
        let Err(error) = Document::open(bytes) else {
            panic!("a package without word/document.xml must not open");
        };
        assert!(matches!(error, BrdError::DocumentError(DocumentError::MissingPart(_))));
        assert_eq!(error.kind(), ErrorKind::Internal);

        assert!(Document::open(b"not a zip".to_vec()).is_err());
    }

    #[test]
    fn outline_flags_requirements_table() {
        let document = Document::open(template()).unwrap();
        let outline = document.outline(&TableSignature::default());
        let flags: Vec<bool> = outline.tables.iter().map(|table| table.is_requirements_table).collect();
        assert_eq!(flags, vec![false, false, true]);
        assert_eq!(outline.tables[1].headers, vec!["Version", "Date", "Author", "Description"]);
        assert_eq!(outline.paragraphs.len(), 3);
        assert!(outline.to_string().contains("[2] 2 rows x 4 columns: Requirement ID | Section | Description | Status <- requirements table"));
    }

    #[test]
    fn rebuild_replaces_rows_and_preserves_other_tables() {
        let mut document = Document::open(template()).unwrap();
        let before: Vec<_> = (0..2).map(|index| document.table_texts(index).unwrap()).collect();
        let target = document.locate(&TableSignature::default(), "functional requirements").unwrap();
        assert_eq!(target, TableTarget::Existing(2));

        let report = document.rebuild(target, &groups(&[("Login", 3), ("Checkout", 2)]), &TableStyle::default()).unwrap();
        assert_eq!(
            report,
            RebuildReport {
                table_index: 2,
                created: false,
                cleared_rows: 1,
                form_rows: 2,
                requirement_rows: 5,
                total_rows: 8,
            }
        );

        let saved = document.save().unwrap();
        let reopened = Document::open(saved).unwrap();
        assert_eq!(reopened.table_count(), 3);
        for (index, texts) in before.iter().enumerate() {
            assert_eq!(&reopened.table_texts(index).unwrap(), texts);
        }
        let rows = reopened.table_texts(2).unwrap();
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[1], vec!["Login"]);
        assert_eq!(rows[2], vec!["R1", "Section", "Requirement 1", "Final"]);
        assert_eq!(rows[5], vec!["Checkout"]);
        assert_eq!(rows[7][0], "R5");
    }

    #[test]
    fn rebuild_leaves_sibling_markup_byte_identical() {
        let original = template();
        let mut archive = ZipArchive::new(Cursor::new(original.clone())).unwrap();
        let original_xml = String::from_utf8(archive.read_bytes(DOCUMENT_PART).unwrap().unwrap()).unwrap();

        let mut document = Document::open(original).unwrap();
        let target = document.locate(&TableSignature::default(), "functional requirements").unwrap();
        document.rebuild(target, &groups(&[("Login", 1)]), &TableStyle::default()).unwrap();
        let mut rebuilt = ZipArchive::new(Cursor::new(document.save().unwrap())).unwrap();
        let rebuilt_xml = String::from_utf8(rebuilt.read_bytes(DOCUMENT_PART).unwrap().unwrap()).unwrap();

        let anchor = "3. Functional Requirements";
        let prefix = &original_xml[..original_xml.find(anchor).unwrap()];
        assert!(rebuilt_xml.starts_with(prefix));
        assert!(rebuilt_xml.ends_with("<w:sectPr><w:pgSz w:w=\"12240\" w:h=\"15840\"/></w:sectPr></w:body></w:document>"));
        assert_eq!(rebuilt.read_bytes("word/styles.xml").unwrap(), archive.read_bytes("word/styles.xml").unwrap());
    }

    #[test]
    fn rebuild_is_idempotent() {
        let groups = groups(&[("Login", 2), ("", 1), ("Checkout", 1)]);
        let run = |bytes: Vec<u8>| {
            let mut document = Document::open(bytes).unwrap();
            let target = document.locate(&TableSignature::default(), "functional requirements").unwrap();
            document.rebuild(target, &groups, &TableStyle::default()).unwrap();
            document.save().unwrap()
        };
        let first = run(template());
        let second = run(template());
        assert_eq!(first, second);

        let again = run(first.clone());
        let reopened = Document::open(again).unwrap();
        assert_eq!(reopened.table_texts(2), Document::open(first).unwrap().table_texts(2));
        assert_eq!(reopened.table_texts(2).unwrap().len(), 1 + 2 + 3);
    }

    #[test]
    fn rebuild_creates_table_after_anchor() {
        let bytes = fixtures::docx(&format!(
            "{}{}{}{}",
            fixtures::table(&[["Version", "Date", "Author", "Description"]]),
            fixtures::paragraph("3. Functional Requirements"),
            fixtures::paragraph("4. Reporting"),
            fixtures::table(&[["Report", "Owner"]]),
        ));
        let mut document = Document::open(bytes).unwrap();
        let target = document.locate(&TableSignature::default(), "functional requirements").unwrap();
        assert_eq!(target, TableTarget::New { after_paragraph: 0 });

        let report = document.rebuild(target, &groups(&[("Login", 2)]), &TableStyle::default()).unwrap();
        assert!(report.created);
        assert_eq!(report.table_index, 1);
        assert_eq!(report.total_rows, 4);

        let reopened = Document::open(document.save().unwrap()).unwrap();
        assert_eq!(reopened.table_count(), 3);
        assert_eq!(reopened.table_texts(1).unwrap()[0], vec!["Requirement ID", "Section", "Description", "Status"]);
        assert_eq!(reopened.table_texts(2).unwrap(), vec![vec!["Report", "Owner"]]);
        assert_eq!(
            reopened.locate(&TableSignature::default(), "functional requirements").unwrap(),
            TableTarget::Existing(1)
        );
    }

    #[test]
    fn rebuild_rejects_unknown_targets() {
        let mut document = Document::open(template()).unwrap();
        let error = document.rebuild(TableTarget::Existing(9), &[], &TableStyle::default()).unwrap_err();
        assert!(matches!(error, BrdError::DocumentError(DocumentError::InvalidTarget(_))));

        let mut original = ZipArchive::new(Cursor::new(template())).unwrap();
        let mut saved = ZipArchive::new(Cursor::new(document.save().unwrap())).unwrap();
        assert_eq!(saved.read_bytes(DOCUMENT_PART).unwrap(), original.read_bytes(DOCUMENT_PART).unwrap());
    }
}
