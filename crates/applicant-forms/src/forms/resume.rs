//! Resume intake with repeated contacts, skills, projects and work history.

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use super::definition::{flatten_group, require_filled, Check, FormDefinition, FormKind};
use super::gate::ValidationFailure;
use super::payload::Payload;
use super::store::{FormSchema, FormState, GroupEntry};

pub const NAME: &str = "name";
pub const EMAIL: &str = "email";
pub const CONTACTS: &str = "contacts";
pub const SKILLS: &str = "skills";
pub const PROJECTS: &str = "projects";
pub const WORK_EXPERIENCE: &str = "work_experience";

pub const PROJECT_KEYS: [&str; 2] = ["title", "description"];
pub const WORK_KEYS: [&str; 2] = ["company", "position"];

/// Field name and multipart part name of every repeated group, in payload order.
const GROUP_PARTS: [(&str, &str); 4] = [
    (CONTACTS, "contacts"),
    (SKILLS, "skills"),
    (PROJECTS, "projects"),
    (WORK_EXPERIENCE, "workExperience"),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct ResumeForm;

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

fn well_formed_email(value: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern is a valid regex"))
        .is_match(value)
}

fn absolute_url(value: &str) -> bool {
    Url::parse(value)
        .map(|url| url.has_host())
        .unwrap_or(false)
}

/// Every entry of `field` must be filled, for the listed keys or the bare value.
fn require_entries(field: &'static str, keys: &'static [&'static str]) -> Check<'static> {
    Box::new(move |state: &FormState| {
        let entries = state.get_group(field).unwrap_or_default();
        for (index, entry) in entries.iter().enumerate() {
            let missing = match entry {
                GroupEntry::Text(value) if value.trim().is_empty() => Some(None),
                GroupEntry::Record(_) => keys
                    .iter()
                    .find(|key| entry.sub_field(key).map_or(true, |value| value.trim().is_empty()))
                    .map(|key| Some(key.to_string())),
                GroupEntry::Text(_) => None,
            };
            if let Some(key) = missing {
                return Err(ValidationFailure::MissingGroupEntry {
                    field: field.to_string(),
                    index,
                    key,
                });
            }
        }
        Ok(())
    })
}

impl FormDefinition for ResumeForm {
    fn kind(&self) -> FormKind {
        FormKind::Resume
    }

    fn schema(&self) -> FormSchema {
        FormSchema::new()
            .scalar(NAME)
            .scalar(EMAIL)
            .scalar_group(CONTACTS)
            .scalar_group(SKILLS)
            .record_group(PROJECTS, &PROJECT_KEYS)
            .record_group(WORK_EXPERIENCE, &WORK_KEYS)
    }

    fn checklist(&self) -> Vec<Check<'_>> {
        let mut checks: Vec<Check<'_>> = Vec::new();
        checks.push(require_filled(NAME, |field| {
            ValidationFailure::MissingRequiredField { field }
        }));
        checks.push(require_filled(EMAIL, |field| {
            ValidationFailure::MissingRequiredField { field }
        }));
        checks.push(Box::new(|state: &FormState| match state.filled(EMAIL) {
            Some(email) if !well_formed_email(email) => Err(ValidationFailure::InvalidFormat {
                field: EMAIL.to_string(),
                index: None,
            }),
            _ => Ok(()),
        }));
        checks.push(require_entries(CONTACTS, &[]));
        checks.push(Box::new(|state: &FormState| {
            let contacts = state.get_group(CONTACTS).unwrap_or_default();
            match contacts
                .iter()
                .position(|entry| !entry.text().map(str::trim).is_some_and(absolute_url))
            {
                Some(index) => Err(ValidationFailure::InvalidFormat {
                    field: CONTACTS.to_string(),
                    index: Some(index),
                }),
                None => Ok(()),
            }
        }));
        checks.push(require_entries(SKILLS, &[]));
        // Project descriptions are optional.
        checks.push(require_entries(PROJECTS, &["title"]));
        checks.push(require_entries(WORK_EXPERIENCE, &WORK_KEYS));
        checks
    }

    fn assemble(&self, state: &FormState) -> Payload {
        let payload = Payload::new(FormKind::Resume)
            .with_field(NAME, state.filled(NAME).unwrap_or_default())
            .with_field(EMAIL, state.filled(EMAIL).unwrap_or_default());

        GROUP_PARTS.iter().fold(payload, |payload, (field, part)| {
            let entries = state.get_group(field).unwrap_or_default();
            flatten_group(payload, part, entries)
        })
    }
}
