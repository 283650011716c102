use thiserror::Error;

/// Main error type for the BRD builder.
/// Aggregates errors from the standard library, dependencies, and internal modules.
#[derive(Error, Debug)]
pub enum BrdError {
    #[error("{0}")]
    WithContextError(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    ParseFloatError(#[from] std::num::ParseFloatError),

    #[error("{0}")]
    StringEncodingError(#[from] std::str::Utf8Error),

    #[error("{0}")]
    StringConversionError(#[from] std::string::FromUtf8Error),

    // Third-party library errors
    #[error("{0}")]
    PatternError(#[from] glob::PatternError),

    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    #[error("{0}")]
    JsonError(#[from] serde_json::Error),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    // Domain module errors
    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),

    #[error("{0}")]
    RequirementError(#[from] crate::requirements::RequirementError),

    #[error("{0}")]
    DocumentError(#[from] crate::document::DocumentError),

    #[error("{0}")]
    ConfigError(#[from] crate::config::ConfigError),
}

/// Coarse classification of a failure, so callers can tell
/// "fix your input" apart from "try again / contact operator".
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller supplied a spreadsheet or selector that cannot be used.
    Validation,
    /// The template has no Functional Requirements table and no anchor to create one.
    Structure,
    /// Malformed input packages, I/O and anything unexpected.
    Internal,
}

impl BrdError {
    /// Classifies this error for the caller.
    pub fn kind(&self) -> ErrorKind {
        use crate::document::DocumentError;
        use crate::requirements::RequirementError;
        use crate::spreadsheet::SpreadsheetError;

        match self {
            BrdError::RequirementError(
                RequirementError::MissingColumns(_) | RequirementError::DuplicateColumns(_),
            ) => ErrorKind::Validation,
            BrdError::SpreadsheetError(
                SpreadsheetError::SheetNotFound(_) | SpreadsheetError::MissingHeaderRow(_),
            ) => ErrorKind::Validation,
            BrdError::DocumentError(DocumentError::StructureNotFound(_)) => ErrorKind::Structure,
            _ => ErrorKind::Internal,
        }
    }

    /// Returns true if the caller can fix this error by changing its input.
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, BrdError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| BrdError::WithContextError(format!("{}: {}", message, e)))
    }
}
