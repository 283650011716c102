use crate::requirements::Requirement;
use serde::Deserialize;
use std::fmt;

/// Approval-state predicate applied before grouping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum FilterMode {
    /// Keep every requirement
    #[default]
    None,
    /// Keep requirements whose status is `final`
    Final,
    /// Keep requirements whose status is `final` or `approved`
    FinalOrApproved,
}

impl FilterMode {
    /// Parses a filter name, ignoring case and surrounding whitespace, so `" Final "`
    /// selects [`FilterMode::Final`]. Unrecognized names fall back to
    /// [`FilterMode::None`].
    pub fn parse(name: &str) -> FilterMode {
        match name.trim().to_lowercase().as_str() {
            "" | "none" => FilterMode::None,
            "final" => FilterMode::Final,
            "final_or_approved" => FilterMode::FinalOrApproved,
            other => {
                log::warn!("Unknown filter mode '{other}', keeping all requirements");
                FilterMode::None
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterMode::None => "none",
            FilterMode::Final => "final",
            FilterMode::FinalOrApproved => "final_or_approved",
        }
    }

    /// Whether a requirement with the given status survives this filter.
    pub fn accepts(&self, status: &str) -> bool {
        match self {
            FilterMode::None => true,
            FilterMode::Final => status.to_lowercase() == "final",
            FilterMode::FinalOrApproved => matches!(status.to_lowercase().as_str(), "final" | "approved"),
        }
    }
}

impl From<String> for FilterMode {
    fn from(name: String) -> Self {
        FilterMode::parse(&name)
    }
}

impl From<&str> for FilterMode {
    fn from(name: &str) -> Self {
        FilterMode::parse(name)
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keeps the requirements accepted by `mode`, in their original order.
pub fn filter_by_status(requirements: Vec<Requirement>, mode: FilterMode) -> Vec<Requirement> {
    requirements
        .into_iter()
        .filter(|requirement| mode.accepts(&requirement.status))
        .collect()
}
