use crate::error::BrdError;
use glob::Pattern;

/// Criteria for selecting which sheet of a workbook to read.
#[derive(Clone, Debug, Default)]
pub struct Criteria {
    /// Sheet name or glob pattern; the first sheet is used when absent.
    pub sheet_name: Option<String>,
}

impl Criteria {
    pub fn sheet(sheet_name: Option<&str>) -> Self {
        Criteria {
            sheet_name: sheet_name.filter(|name| !name.trim().is_empty()).map(str::to_owned),
        }
    }

    /// Picks the index of the sheet to read: the first sheet when no name was given,
    /// otherwise an exact name match, then the first sheet matching it as a glob pattern.
    pub(crate) fn select<S: AsRef<str>>(&self, sheet_names: &[S]) -> Result<Option<usize>, BrdError> {
        let name = match &self.sheet_name {
            Some(name) => name,
            None => return Ok(if sheet_names.is_empty() { None } else { Some(0) }),
        };
        if let Some(index) = sheet_names.iter().position(|sheet| sheet.as_ref() == name) {
            return Ok(Some(index));
        }
        let pattern = Pattern::new(name)?;
        Ok(sheet_names.iter().position(|sheet| pattern.matches(sheet.as_ref())))
    }
}
