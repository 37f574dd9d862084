use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::acceptance::AcceptanceForm;
use super::application::ApplicationForm;
use super::gate::ValidationFailure;
use super::payload::Payload;
use super::resume::ResumeForm;
use super::store::{FormSchema, FormState, GroupEntry};

/// One ordered checklist rule.
pub type Check<'a> = Box<dyn Fn(&FormState) -> Result<(), ValidationFailure> + 'a>;

/// Form types served by the intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormKind {
    Acceptance,
    Application,
    Resume,
}

impl FormKind {
    pub const fn label(self) -> &'static str {
        match self {
            FormKind::Acceptance => "acceptance",
            FormKind::Application => "application",
            FormKind::Resume => "resume",
        }
    }

    pub fn definition(self, catalog: &FormCatalog) -> Arc<dyn FormDefinition> {
        match self {
            FormKind::Acceptance => Arc::new(AcceptanceForm::new(
                catalog.companies.clone(),
                catalog.job_tiers.clone(),
            )),
            FormKind::Application => Arc::new(ApplicationForm::new(catalog.job_titles.clone())),
            FormKind::Resume => Arc::new(ResumeForm),
        }
    }
}

/// Closed picklist sets supplied by configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormCatalog {
    pub companies: Vec<String>,
    pub job_titles: Vec<String>,
    pub job_tiers: Vec<String>,
}

impl Default for FormCatalog {
    fn default() -> Self {
        Self {
            companies: owned(&["Google", "Amazon", "Microsoft", "Facebook", "Apple"]),
            job_titles: owned(&[
                "Software Engineer",
                "Data Scientist",
                "Product Manager",
                "UX Designer",
                "DevOps Engineer",
                "Cybersecurity Analyst",
                "AI/ML Engineer",
                "Full-Stack Developer",
                "Technical Writer",
                "Cloud Architect",
            ]),
            job_tiers: owned(&["super", "regular", "good"]),
        }
    }
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

/// Form-specific schema, checklist and payload assembly.
pub trait FormDefinition: Send + Sync + fmt::Debug {
    fn kind(&self) -> FormKind;

    fn schema(&self) -> FormSchema;

    /// Rules in the order the gate evaluates them.
    fn checklist(&self) -> Vec<Check<'_>>;

    /// Called only after the checklist passed.
    fn assemble(&self, state: &FormState) -> Payload;

    /// Fields reset to blank when `field` changes.
    fn dependents(&self, _field: &str) -> &'static [&'static str] {
        &[]
    }

    /// Part name of the binary attachment, when the form takes one.
    fn attachment_part(&self) -> Option<&'static str> {
        None
    }
}

/// Checks that a scalar is filled in, producing `missing` otherwise.
pub(crate) fn require_filled(
    field: &'static str,
    missing: fn(String) -> ValidationFailure,
) -> Check<'static> {
    Box::new(move |state: &FormState| match state.filled(field) {
        Some(_) => Ok(()),
        None => Err(missing(field.to_string())),
    })
}

/// Checks that a filled scalar belongs to `options`. Blank values pass.
pub(crate) fn require_option<'a>(field: &'static str, options: &'a [String]) -> Check<'a> {
    Box::new(move |state: &FormState| match state.filled(field) {
        Some(value) if !options.iter().any(|option| option == value) => {
            Err(ValidationFailure::InvalidOption {
                field: field.to_string(),
                value: value.to_string(),
            })
        }
        _ => Ok(()),
    })
}

/// Flatten a group into multipart names: `part[i]` or `part[i][key]`.
pub(crate) fn flatten_group(payload: Payload, part: &str, entries: &[GroupEntry]) -> Payload {
    entries
        .iter()
        .enumerate()
        .fold(payload, |payload, (index, entry)| match entry {
            GroupEntry::Text(value) => payload.with_field(format!("{part}[{index}]"), value.trim()),
            GroupEntry::Record(fields) => fields.iter().fold(payload, |payload, (key, value)| {
                payload.with_field(format!("{part}[{index}][{key}]"), value.trim())
            }),
        })
}
