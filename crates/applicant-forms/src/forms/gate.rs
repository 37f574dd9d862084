use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::definition::FormDefinition;
use super::payload::Payload;
use super::store::FormState;

/// Editable until the first successful submission, then permanently locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Editable,
    Submitted,
}

impl SubmissionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SubmissionStatus::Editable => "editable",
            SubmissionStatus::Submitted => "submitted",
        }
    }
}

/// How many checklist failures a rejected submission reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationMode {
    /// Stop at the first failing rule in checklist order.
    #[default]
    FirstFailure,
    /// Evaluate every rule and report all failures in checklist order.
    Aggregate,
}

/// A single checklist rule that did not hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationFailure {
    #[error("primary choice '{field}' has not been selected")]
    MissingPrimaryChoice { field: String },
    #[error("dependent selection '{field}' is missing")]
    MissingDependentSelection { field: String },
    #[error("required field '{field}' is missing")]
    MissingRequiredField { field: String },
    #[error("an attachment is required")]
    MissingAttachment,
    #[error("'{value}' is not an allowed option for '{field}'")]
    InvalidOption { field: String, value: String },
    #[error("entry {index} of '{field}' is missing {}", .key.as_deref().unwrap_or("a value"))]
    MissingGroupEntry {
        field: String,
        index: usize,
        key: Option<String>,
    },
    #[error("'{field}' is not well formed")]
    InvalidFormat {
        field: String,
        index: Option<usize>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    #[error("form has already been submitted")]
    AlreadySubmitted,
    #[error("submission rejected: {}", FailureList(.0))]
    Rejected(Vec<ValidationFailure>),
}

impl SubmissionError {
    pub fn failures(&self) -> &[ValidationFailure] {
        match self {
            SubmissionError::AlreadySubmitted => &[],
            SubmissionError::Rejected(failures) => failures,
        }
    }
}

struct FailureList<'a>(&'a [ValidationFailure]);

impl fmt::Display for FailureList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, failure) in self.0.iter().enumerate() {
            if position > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

/// Validates a form against its checklist and locks it on success.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmissionGate {
    mode: ValidationMode,
}

impl SubmissionGate {
    pub fn new(mode: ValidationMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// Run the checklist without changing the form.
    pub fn check(&self, definition: &dyn FormDefinition, state: &FormState) -> Vec<ValidationFailure> {
        let mut failures = Vec::new();
        for check in definition.checklist() {
            if let Err(failure) = check(state) {
                failures.push(failure);
                if self.mode == ValidationMode::FirstFailure {
                    break;
                }
            }
        }
        failures
    }

    pub fn submit(
        &self,
        definition: &dyn FormDefinition,
        state: &mut FormState,
    ) -> Result<Payload, SubmissionError> {
        if state.status() == SubmissionStatus::Submitted {
            warn!(form = definition.kind().label(), "repeat submission refused");
            return Err(SubmissionError::AlreadySubmitted);
        }

        let failures = self.check(definition, state);
        if !failures.is_empty() {
            warn!(
                form = definition.kind().label(),
                failures = failures.len(),
                first = %failures[0],
                "submission rejected"
            );
            return Err(SubmissionError::Rejected(failures));
        }

        let payload = definition.assemble(state);
        state.mark_submitted();
        info!(
            form = definition.kind().label(),
            fields = payload.fields.len(),
            attachment = payload.attachment.is_some(),
            "form submitted"
        );
        Ok(payload)
    }
}
