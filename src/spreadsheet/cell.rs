use crate::error::BrdError;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::SpreadsheetError;
use chrono::Duration;
use chrono::NaiveDate;

/// Types of cell data in spreadsheet files.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    /// Boolean values (true/false)
    Boolean,
    /// Numeric values
    Number,
    /// Date/time values stored as numbers from 1900 epoch
    NumberDateTime1900,
    /// Date values stored as numbers from 1900 epoch
    NumberDate1900,
    /// Time values stored as numbers from 1900 epoch
    NumberTime1900,
    /// Date/time values stored as numbers from 1904 epoch
    NumberDateTime1904,
    /// Date values stored as numbers from 1904 epoch
    NumberDate1904,
    /// Time values stored as numbers from 1904 epoch
    NumberTime1904,
    /// ISO 8601 date/time strings
    IsoDateTime,
    /// Inline string values
    InlineString,
    /// Shared string table references
    SharedString,
    /// Error values
    Error,
}

impl CellType {
    /// Parses built-in Excel number format IDs to determine cell type.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "22" => Some(if is_1904 { Self::NumberDateTime1904 } else { Self::NumberDateTime1900 }),
            "14" | "15" | "16" | "17" => Some(if is_1904 { Self::NumberDate1904 } else { Self::NumberDate1900 }),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(if is_1904 { Self::NumberTime1904 } else { Self::NumberTime1900 }),
            _ => None,
        }
    }

    /// Parses custom number format strings to determine cell type.
    /// Analyzes format codes for date/time patterns.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_date = false;
        let mut is_time = false;
        let mut is_color = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' if !is_escaped => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_literal && !is_color => is_literal = true,

                ']' if is_color => is_color = false,
                '[' if !is_color && !is_literal => is_color = true,
                _ if is_literal || is_color => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        match (is_date, is_time, is_1904) {
            (true, true, true) => Self::NumberDateTime1904,
            (true, true, false) => Self::NumberDateTime1900,
            (true, false, true) => Self::NumberDate1904,
            (true, false, false) => Self::NumberDate1900,
            (false, true, true) => Self::NumberTime1904,
            (false, true, false) => Self::NumberTime1900,
            (false, false, _) => Self::Number,
        }
    }
}

/// A loosely-typed cell value, coerced to text as soon as it leaves the reader.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(String),
    Blank,
    /// Booleans, errors and anything else rendered through its display form.
    Other(String),
}

impl CellValue {
    /// Trimmed text form of the value; blank cells become the empty string.
    pub fn into_text(self) -> String {
        match self {
            CellValue::Text(text) | CellValue::Number(text) | CellValue::Other(text) => {
                let trimmed = text.trim();
                if trimmed.len() == text.len() {
                    text
                } else {
                    trimmed.to_owned()
                }
            }
            CellValue::Blank => String::new(),
        }
    }
}

/// Represents a single cell in a spreadsheet with position, type, and value.
#[derive(Clone, Debug)]
pub(crate) struct Cell {
    /// Row index (0-based)
    pub(crate) row: usize,
    /// Column index (0-based)
    pub(crate) col: usize,
    /// Cell data type
    pub(crate) kind: CellType,
    /// Raw cell value as stored in the sheet
    pub(crate) value: String,
}

impl Cell {
    /// Returns the Excel-style cell reference (e.g., "A1", "B2").
    pub(crate) fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    /// Decodes the raw value into a [`CellValue`], resolving shared strings and
    /// rendering date-formatted numbers as ISO text.
    pub(crate) fn to_value(&self, shared_strings: &[String]) -> CellValue {
        if self.value.is_empty() {
            return CellValue::Blank;
        }
        match self.kind {
            CellType::Empty => CellValue::Blank,
            CellType::SharedString => {
                match self.value.parse::<usize>().ok().and_then(|index| shared_strings.get(index)) {
                    Some(text) => CellValue::Text(text.to_owned()),
                    None => {
                        log::warn!("Shared string '{}' at {} is out of range", self.value, self.reference());
                        CellValue::Blank
                    }
                }
            }
            CellType::InlineString => CellValue::Text(self.value.to_owned()),
            CellType::Number => CellValue::Number(self.value.to_owned()),
            CellType::Boolean => CellValue::Other(if self.value == "1" { "true" } else { "false" }.to_owned()),
            CellType::Error => CellValue::Other(self.value.to_owned()),
            CellType::IsoDateTime => CellValue::Other(self.value.replace('T', " ")),
            CellType::NumberDateTime1900 | CellType::NumberDateTime1904 => {
                let is_1904 = self.kind == CellType::NumberDateTime1904;
                self.render_number(to_datetime_string(&self.value, is_1904))
            }
            CellType::NumberDate1900 | CellType::NumberDate1904 => {
                let is_1904 = self.kind == CellType::NumberDate1904;
                self.render_number(to_date_string(&self.value, is_1904))
            }
            CellType::NumberTime1900 | CellType::NumberTime1904 => {
                self.render_number(to_time_string(&self.value))
            }
        }
    }

    /// Keeps the raw number when a date rendering fails.
    fn render_number(&self, rendered: Result<String, BrdError>) -> CellValue {
        match rendered {
            Ok(text) => CellValue::Other(text),
            Err(error) => {
                log::debug!("Cell {} keeps raw value '{}': {}", self.reference(), self.value, error);
                CellValue::Number(self.value.to_owned())
            }
        }
    }
}

/// Converts Excel numeric date to ISO date string.
/// Handles Lotus 1-2-3 leap year bug for 1900 epoch.
fn to_date_string(value: &str, is_1904: bool) -> Result<String, BrdError> {
    let days = value.parse::<f64>()?.trunc() as i64;
    let offset = if is_1904 {
        1462
    } else if days < 60 {
        1
    } else {
        0
    };
    let date = days
        .checked_add(offset)
        .and_then(Duration::try_days)
        .and_then(|duration| NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(duration))
        .ok_or_else(|| SpreadsheetError::DateOutOfRange(value.to_owned()))?;
    Ok(date.format("%Y-%m-%d").to_string())
}

/// Converts Excel numeric time to ISO time string.
fn to_time_string(value: &str) -> Result<String, BrdError> {
    let factor = value.parse::<f64>()?.fract();
    let mut seconds = (factor * 86400f64).round() as i64;
    let hours = seconds / 3600; seconds %= 3600;
    let minutes = seconds / 60; seconds %= 60;
    Ok(format!("{hours:02}:{minutes:02}:{seconds:02}"))
}

/// Converts Excel numeric datetime to ISO datetime string.
fn to_datetime_string(value: &str, is_1904: bool) -> Result<String, BrdError> {
    let date = to_date_string(value, is_1904)?;
    let time = to_time_string(value)?;
    Ok(format!("{date} {time}"))
}
