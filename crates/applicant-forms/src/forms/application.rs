//! Job application: a single job title picked from the catalog.

use super::definition::{require_filled, require_option, Check, FormDefinition, FormKind};
use super::gate::ValidationFailure;
use super::payload::Payload;
use super::store::{FormSchema, FormState};

pub const JOB_NAME: &str = "job_name";

/// Multipart part name the receiving endpoint expects.
pub const JOB_NAME_PART: &str = "jobName";

#[derive(Debug, Clone)]
pub struct ApplicationForm {
    job_titles: Vec<String>,
}

impl ApplicationForm {
    pub fn new(job_titles: Vec<String>) -> Self {
        Self { job_titles }
    }
}

impl FormDefinition for ApplicationForm {
    fn kind(&self) -> FormKind {
        FormKind::Application
    }

    fn schema(&self) -> FormSchema {
        FormSchema::new().scalar(JOB_NAME)
    }

    fn checklist(&self) -> Vec<Check<'_>> {
        vec![
            require_filled(JOB_NAME, |field| ValidationFailure::MissingRequiredField {
                field,
            }),
            require_option(JOB_NAME, &self.job_titles),
        ]
    }

    fn assemble(&self, state: &FormState) -> Payload {
        Payload::new(FormKind::Application)
            .with_field(JOB_NAME_PART, state.filled(JOB_NAME).unwrap_or_default())
    }
}
