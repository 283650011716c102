//! # Spreadsheet Module
//!
//! Reads a requirements workbook into a [`Table`]: the labels of the header row plus
//! every later row as trimmed text aligned to those labels. Only the Office Open XML
//! workbook format (.xlsx, .xlsm) is supported.
use crate::error::BrdError;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::xlsx::XlsxSpreadsheet;
use std::collections::BTreeMap;
use thiserror::Error;

pub(crate) mod cell;
pub mod criteria;
pub(crate) mod reference;
pub(crate) mod xlsx;

pub use cell::CellValue;
pub use criteria::Criteria;

/// Signature of a compound file (legacy .xls or an encrypted OOXML package)
const CFB_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
/// Signature of a ZIP local file header
const ZIP_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// Errors raised while reading a workbook.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Spreadsheet is not an xlsx workbook")]
    InvalidFileFormat,

    #[error("Spreadsheet is a legacy .xls workbook or is password protected")]
    UnsupportedCompoundFile,

    #[error("Workbook part '{0}' is missing")]
    FileError(String),

    #[error("Workbook contains no worksheets")]
    EmptyWorkbook,

    #[error("Worksheet named '{0}' not found")]
    SheetNotFound(String),

    #[error("Worksheet '{0}' has no header row")]
    MissingHeaderRow(String),

    #[error("Date serial '{0}' is out of range")]
    DateOutOfRange(String),
}

/// A tabular data source exposing sheets as header labels plus rows of text.
pub trait Spreadsheet {
    /// Sheet names in workbook order.
    fn sheet_names(&self) -> Vec<String>;

    /// Reads the sheet chosen by `criteria`.
    fn read_table(&mut self, criteria: &Criteria) -> Result<Table, BrdError>;
}

/// Opens a workbook from its bytes, detecting the format from its signature.
pub fn open_spreadsheet(bytes: Vec<u8>) -> Result<Box<dyn Spreadsheet>, BrdError> {
    if bytes.starts_with(&ZIP_SIGNATURE) {
        Ok(Box::new(XlsxSpreadsheet::open(bytes)?))
    } else if bytes.starts_with(&CFB_SIGNATURE) {
        Err(SpreadsheetError::UnsupportedCompoundFile)?
    } else {
        Err(SpreadsheetError::InvalidFileFormat)?
    }
}

/// One sheet as raw header labels and rows of trimmed cell text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    /// Sheet name
    pub sheet: String,
    /// Non-empty labels of the header row, left to right
    pub headers: Vec<String>,
    /// Data rows, each aligned to `headers`
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Builds a table from the cells of a sheet. The header row is the first row
    /// holding any cell; columns without a header label are dropped.
    pub(crate) fn from_cells(sheet: &str, cells: Vec<Cell>, shared_strings: &[String]) -> Result<Table, BrdError> {
        let mut grid = BTreeMap::<usize, BTreeMap<usize, String>>::new();
        for cell in cells {
            let text = cell.to_value(shared_strings).into_text();
            grid.entry(cell.row).or_default().insert(cell.col, text);
        }

        let mut rows = grid.into_values();
        let header = rows
            .next()
            .ok_or_else(|| SpreadsheetError::MissingHeaderRow(sheet.to_owned()))?;
        let columns: Vec<(usize, String)> = header
            .into_iter()
            .filter(|(_, label)| !label.is_empty())
            .collect();
        if columns.is_empty() {
            Err(SpreadsheetError::MissingHeaderRow(sheet.to_owned()))?
        }

        let rows = rows
            .map(|mut row| {
                columns
                    .iter()
                    .map(|(col, _)| row.remove(col).unwrap_or_default())
                    .collect()
            })
            .collect();
        Ok(Table {
            sheet: sheet.to_owned(),
            headers: columns.into_iter().map(|(_, label)| label).collect(),
            rows,
        })
    }
}
