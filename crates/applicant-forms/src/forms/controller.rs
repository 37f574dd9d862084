use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::attachment::{AttachmentPolicy, CandidateFile, PreviewHandle, PreviewResources};
use super::definition::{FormDefinition, FormKind};
use super::gate::{SubmissionError, SubmissionGate, SubmissionStatus, ValidationFailure};
use super::payload::Payload;
use super::store::{FieldValue, FormError, FormState, GroupEntry};

/// Discrete user interaction delivered by the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FormEvent {
    SetScalar {
        field: String,
        value: String,
    },
    AddEntry {
        field: String,
        #[serde(default)]
        default: Option<GroupEntry>,
    },
    RemoveEntry {
        field: String,
        index: usize,
    },
    UpdateEntry {
        field: String,
        index: usize,
        #[serde(default)]
        key: Option<String>,
        value: String,
    },
    TogglePreview,
    ClearAttachment,
}

/// Serialisable snapshot of a form for the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormView {
    pub kind: FormKind,
    pub status: &'static str,
    pub fields: BTreeMap<String, FieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<AttachmentView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentView {
    pub file_name: String,
    pub media_type: String,
    pub size: u64,
    pub preview_visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_handle: Option<PreviewHandle>,
}

/// Owns one form instance and routes events into its state.
#[derive(Debug)]
pub struct FormController {
    definition: Arc<dyn FormDefinition>,
    state: FormState,
    gate: SubmissionGate,
    policy: AttachmentPolicy,
    previews: Arc<dyn PreviewResources>,
}

impl FormController {
    pub fn new(
        definition: Arc<dyn FormDefinition>,
        gate: SubmissionGate,
        policy: AttachmentPolicy,
        previews: Arc<dyn PreviewResources>,
    ) -> Self {
        let state = FormState::new(definition.schema());
        Self {
            definition,
            state,
            gate,
            policy,
            previews,
        }
    }

    pub fn kind(&self) -> FormKind {
        self.definition.kind()
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn status(&self) -> SubmissionStatus {
        self.state.status()
    }

    pub fn apply(&mut self, event: FormEvent) -> Result<(), FormError> {
        match event {
            FormEvent::SetScalar { field, value } => self.set_scalar(&field, value),
            FormEvent::AddEntry { field, default } => {
                match default {
                    Some(entry) => self.state.add_entry(&field, entry)?,
                    None => self.state.add_blank_entry(&field)?,
                };
                Ok(())
            }
            FormEvent::RemoveEntry { field, index } => {
                self.state.remove_entry(&field, index).map(|_| ())
            }
            FormEvent::UpdateEntry {
                field,
                index,
                key,
                value,
            } => self
                .state
                .update_entry(&field, index, key.as_deref(), value),
            FormEvent::TogglePreview => self.toggle_preview().map(|_| ()),
            FormEvent::ClearAttachment => self.state.clear_attachment(),
        }
    }

    /// Set a scalar and blank the fields that depend on it when it changes.
    pub fn set_scalar(&mut self, field: &str, value: String) -> Result<(), FormError> {
        let changed = self.state.scalar(field) != Some(value.as_str());
        self.state.set_scalar(field, value)?;

        if changed {
            for dependent in self.definition.dependents(field) {
                debug!(field, dependent, "resetting dependent field");
                self.state.set_scalar(dependent, String::new())?;
            }
        }
        Ok(())
    }

    pub fn select_file(&mut self, candidate: CandidateFile) -> Result<(), FormError> {
        if self.definition.attachment_part().is_none() {
            return Err(FormError::InvalidField("attachment".to_string()));
        }
        self.state.select_attachment(candidate, &self.policy)
    }

    pub fn toggle_preview(&mut self) -> Result<bool, FormError> {
        self.state.toggle_preview(&self.previews)
    }

    /// Checklist failures the next submission would report.
    pub fn pending_failures(&self) -> Vec<ValidationFailure> {
        self.gate.check(self.definition.as_ref(), &self.state)
    }

    pub fn submit(&mut self) -> Result<Payload, SubmissionError> {
        self.gate.submit(self.definition.as_ref(), &mut self.state)
    }

    pub fn view(&self) -> FormView {
        let slot = self.state.attachment();
        let attachment = slot.current().map(|attachment| AttachmentView {
            file_name: attachment.file_name().to_string(),
            media_type: attachment.declared_type().to_string(),
            size: attachment.size(),
            preview_visible: slot.preview_visible(),
            preview_handle: attachment.preview_handle().cloned(),
        });

        FormView {
            kind: self.kind(),
            status: self.status().label(),
            fields: self.state.values().clone(),
            attachment,
            attachment_error: slot.last_error().map(str::to_string),
        }
    }

    /// Visible preview bytes, if any.
    pub fn preview(&self) -> Option<(mime::Mime, Vec<u8>)> {
        let slot = self.state.attachment();
        if !slot.preview_visible() {
            return None;
        }
        let handle = slot.current()?.preview_handle()?;
        self.previews.open(handle)
    }

    /// Tear the form down, releasing any live preview handle.
    pub fn discard(self) {
        debug!(form = self.kind().label(), "form discarded");
    }
}
