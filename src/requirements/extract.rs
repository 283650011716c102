use crate::error::BrdError;
use crate::requirements::header::Records;
use crate::requirements::header::Row;
use crate::requirements::Requirement;
use crate::requirements::RequirementError;
use crate::requirements::COLUMN_DESCRIPTION;
use crate::requirements::COLUMN_FORM;
use crate::requirements::COLUMN_REQ_ID;
use crate::requirements::COLUMN_SECTION;
use crate::requirements::COLUMN_STATUS;

/// Converts normalized rows into requirements in row order.
///
/// Every key of `expected` must name exactly one column of `records`, otherwise
/// nothing is extracted. The form column behaves like a merged section heading: a
/// non-empty value becomes the form of every later row until another one appears.
/// Rows with a blank requirement id produce nothing but still update the form.
pub fn extract_requirements(records: &Records, expected: &[&str]) -> Result<Vec<Requirement>, BrdError> {
    validate_columns(&records.columns, expected)?;

    let (_, requirements) = records.rows.iter().fold(
        (String::new(), Vec::new()),
        |(current_form, mut requirements), row| {
            let (current_form, requirement) = extract_row(current_form, row);
            requirements.extend(requirement);
            (current_form, requirements)
        },
    );
    Ok(requirements)
}

fn validate_columns(columns: &[String], expected: &[&str]) -> Result<(), BrdError> {
    let occurrences = |key: &str| columns.iter().filter(|column| column.as_str() == key).count();

    let missing: Vec<String> = expected
        .iter()
        .filter(|key| occurrences(**key) == 0)
        .map(|key| key.to_string())
        .collect();
    if !missing.is_empty() {
        Err(RequirementError::MissingColumns(missing))?
    }

    let duplicated: Vec<String> = expected
        .iter()
        .filter(|key| occurrences(**key) > 1)
        .map(|key| key.to_string())
        .collect();
    if !duplicated.is_empty() {
        Err(RequirementError::DuplicateColumns(duplicated))?
    }
    Ok(())
}

/// One step of the extraction fold: the form carried into the next row and the
/// requirement this row yields, if any.
fn extract_row(current_form: String, row: &Row) -> (String, Option<Requirement>) {
    let value = |key: &str| row.get(key).map(|value| value.trim()).unwrap_or_default();

    let form = match value(COLUMN_FORM) {
        "" => current_form,
        form => form.to_owned(),
    };
    let id = value(COLUMN_REQ_ID);
    if id.is_empty() {
        return (form, None);
    }

    let requirement = Requirement {
        id: id.to_owned(),
        section: value(COLUMN_SECTION).to_owned(),
        description: value(COLUMN_DESCRIPTION).to_owned(),
        status: value(COLUMN_STATUS).to_owned(),
        form: form.clone(),
    };
    (form, Some(requirement))
}
