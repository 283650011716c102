//! Explicit configuration for the generator and the table styling it applies.
//!
//! Every field has a default, so an empty TOML file is a valid configuration:
//!
//! ```toml
//! template = "templates/template.docx"
//! section_marker = "functional requirements"
//! filter = "final_or_approved"
//!
//! [style]
//! header_fill = "00B0F0"
//! body_font_size = 10
//! ```
use crate::error::BrdError;
use crate::error::ResultMessage;
use crate::requirements::FilterMode;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid colour '{0}', expected six hex digits such as 00B0F0")]
    InvalidColor(String),

    #[error("Invalid font size {0}, expected a positive number of points")]
    InvalidFontSize(f32),

    #[error("{0}")]
    ParseError(#[from] toml::de::Error),
}

/// A colour written as six hex digits in WordprocessingML attributes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub u8, pub u8, pub u8);

impl FromStr for Rgb {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let hex = value.trim().trim_start_matches('#');
        let invalid = || ConfigError::InvalidColor(value.to_owned());
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).map_err(|_| invalid());
        Ok(Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl TryFrom<String> for Rgb {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(rgb: Rgb) -> Self {
        rgb.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

/// Colours and font sizes of the rebuilt requirements table. Sizes are in points.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TableStyle {
    /// Background of the column header row
    pub header_fill: Rgb,
    /// Text colour of the column header row
    pub header_text: Rgb,
    pub header_font_size: f32,
    /// Background of the merged form header rows
    pub form_fill: Rgb,
    /// Text colour of the merged form header rows
    pub form_text: Rgb,
    pub form_font_size: f32,
    /// Size of the requirement rows
    pub body_font_size: f32,
}

impl Default for TableStyle {
    fn default() -> Self {
        TableStyle {
            header_fill: Rgb(0x00, 0xB0, 0xF0),
            header_text: Rgb(0xFF, 0xFF, 0xFF),
            header_font_size: 11.0,
            form_fill: Rgb(0x00, 0xB0, 0xF0),
            form_text: Rgb(0x00, 0x00, 0x00),
            form_font_size: 11.0,
            body_font_size: 10.0,
        }
    }
}

impl TableStyle {
    /// Checks that every font size is a positive finite number.
    pub fn validate(&self) -> Result<(), BrdError> {
        for size in [self.header_font_size, self.form_font_size, self.body_font_size] {
            if !size.is_finite() || size <= 0.0 {
                Err(ConfigError::InvalidFontSize(size))?
            }
        }
        Ok(())
    }
}

/// Converts points to the half-points used by `w:sz`.
pub(crate) fn half_points(points: f32) -> u32 {
    (points * 2.0).round().max(1.0) as u32
}

/// Settings of one generator run.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Template used when the caller supplies none
    pub template: PathBuf,
    /// Paragraph text after which a missing requirements table is created
    pub section_marker: String,
    /// Sheet name or glob pattern; the first sheet when absent
    pub sheet: Option<String>,
    pub filter: FilterMode,
    pub style: TableStyle,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            template: PathBuf::from("templates/template.docx"),
            section_marker: "functional requirements".to_owned(),
            sheet: None,
            filter: FilterMode::None,
            style: TableStyle::default(),
        }
    }
}

impl GeneratorConfig {
    /// Reads a TOML configuration file.
    pub fn load(path: &Path) -> Result<GeneratorConfig, BrdError> {
        let text = std::fs::read_to_string(path)
            .map_err(BrdError::from)
            .with_prefix(&path.display().to_string())?;
        Self::from_toml(&text).with_prefix(&path.display().to_string())
    }

    /// Parses a TOML configuration document.
    pub fn from_toml(text: &str) -> Result<GeneratorConfig, BrdError> {
        let config: GeneratorConfig = toml::from_str(text).map_err(ConfigError::from)?;
        config.style.validate()?;
        Ok(config)
    }
}
