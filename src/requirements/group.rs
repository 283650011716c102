use crate::requirements::FormGroup;
use crate::requirements::Requirement;
use std::collections::HashMap;

/// Partitions requirements by form. Groups appear in the order their form is
/// first seen and keep the input order inside; the empty form is a group like
/// any other.
pub fn group_by_form(requirements: Vec<Requirement>) -> Vec<FormGroup> {
    let mut positions = HashMap::<String, usize>::new();
    let mut groups = Vec::<FormGroup>::new();
    for requirement in requirements {
        let index = *positions.entry(requirement.form.clone()).or_insert_with(|| {
            groups.push(FormGroup { form: requirement.form.clone(), requirements: vec![] });
            groups.len() - 1
        });
        groups[index].requirements.push(requirement);
    }
    groups
}
