use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::attachment::{AttachmentError, AttachmentSlot};
use super::gate::SubmissionStatus;

/// One element of a repeated field: a bare value or a fixed-shape record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupEntry {
    Text(String),
    Record(BTreeMap<String, String>),
}

impl GroupEntry {
    /// Blank record carrying every key of the shape.
    pub fn blank_record<S: AsRef<str>>(keys: &[S]) -> Self {
        GroupEntry::Record(
            keys.iter()
                .map(|key| (key.as_ref().to_string(), String::new()))
                .collect(),
        )
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            GroupEntry::Text(value) => Some(value),
            GroupEntry::Record(_) => None,
        }
    }

    pub fn sub_field(&self, key: &str) -> Option<&str> {
        match self {
            GroupEntry::Record(fields) => fields.get(key).map(String::as_str),
            GroupEntry::Text(_) => None,
        }
    }
}

/// Value held under one field name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Scalar(String),
    Group(Vec<GroupEntry>),
}

/// Declared shape of a field, fixed for the lifetime of a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldShape {
    Scalar,
    ScalarGroup,
    RecordGroup(Vec<String>),
}

impl FieldShape {
    fn initial_value(&self) -> FieldValue {
        match self {
            FieldShape::Scalar => FieldValue::Scalar(String::new()),
            FieldShape::ScalarGroup | FieldShape::RecordGroup(_) => {
                FieldValue::Group(vec![self.blank_entry().unwrap_or(GroupEntry::Text(String::new()))])
            }
        }
    }

    /// Default entry appended when a group grows without an explicit value.
    pub fn blank_entry(&self) -> Option<GroupEntry> {
        match self {
            FieldShape::Scalar => None,
            FieldShape::ScalarGroup => Some(GroupEntry::Text(String::new())),
            FieldShape::RecordGroup(keys) => Some(GroupEntry::blank_record(keys)),
        }
    }

    pub(crate) fn admits(&self, entry: &GroupEntry) -> bool {
        match (self, entry) {
            (FieldShape::ScalarGroup, GroupEntry::Text(_)) => true,
            (FieldShape::RecordGroup(keys), GroupEntry::Record(fields)) => {
                fields.len() == keys.len() && keys.iter().all(|key| fields.contains_key(key))
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub shape: FieldShape,
}

/// Ordered field declarations for one form type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSchema {
    fields: Vec<FieldSpec>,
}

impl FormSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scalar(mut self, name: &str) -> Self {
        self.push(name, FieldShape::Scalar);
        self
    }

    pub fn scalar_group(mut self, name: &str) -> Self {
        self.push(name, FieldShape::ScalarGroup);
        self
    }

    pub fn record_group(mut self, name: &str, keys: &[&str]) -> Self {
        let keys = keys.iter().map(|key| key.to_string()).collect();
        self.push(name, FieldShape::RecordGroup(keys));
        self
    }

    fn push(&mut self, name: &str, shape: FieldShape) {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            shape,
        });
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn shape(&self, name: &str) -> Option<&FieldShape> {
        self.fields
            .iter()
            .find(|spec| spec.name == name)
            .map(|spec| &spec.shape)
    }
}

/// Errors raised by the field store, the group operations and attachment admission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("field '{0}' is not valid for this operation")]
    InvalidField(String),
    #[error("form has been submitted and no longer accepts changes")]
    FormLocked,
    #[error("group '{0}' must keep at least one entry")]
    MinimumSizeViolation(String),
    #[error("index {index} is out of range for group '{field}' (length {len})")]
    IndexOutOfRange {
        field: String,
        index: usize,
        len: usize,
    },
    #[error("entry shape does not match group '{0}'")]
    ShapeMismatch(String),
    #[error("group '{field}' has no sub-field {key:?}")]
    InvalidSubField { field: String, key: Option<String> },
    #[error(transparent)]
    Attachment(#[from] AttachmentError),
}

/// Aggregate of all field values for one form instance.
#[derive(Debug)]
pub struct FormState {
    schema: FormSchema,
    values: BTreeMap<String, FieldValue>,
    pub(crate) attachment: AttachmentSlot,
    status: SubmissionStatus,
}

impl FormState {
    /// Blank scalars and a single blank entry per group.
    pub fn new(schema: FormSchema) -> Self {
        let values = schema
            .fields()
            .iter()
            .map(|spec| (spec.name.clone(), spec.shape.initial_value()))
            .collect();

        Self {
            schema,
            values,
            attachment: AttachmentSlot::default(),
            status: SubmissionStatus::Editable,
        }
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn status(&self) -> SubmissionStatus {
        self.status
    }

    pub fn values(&self) -> &BTreeMap<String, FieldValue> {
        &self.values
    }

    pub fn attachment(&self) -> &AttachmentSlot {
        &self.attachment
    }

    pub(crate) fn ensure_editable(&self) -> Result<(), FormError> {
        match self.status {
            SubmissionStatus::Editable => Ok(()),
            SubmissionStatus::Submitted => Err(FormError::FormLocked),
        }
    }

    pub(crate) fn mark_submitted(&mut self) {
        self.status = SubmissionStatus::Submitted;
    }

    pub fn set_scalar(&mut self, field: &str, value: impl Into<String>) -> Result<(), FormError> {
        self.ensure_editable()?;
        match self.values.get_mut(field) {
            Some(FieldValue::Scalar(current)) => {
                *current = value.into();
                Ok(())
            }
            _ => Err(FormError::InvalidField(field.to_string())),
        }
    }

    pub fn scalar(&self, field: &str) -> Option<&str> {
        match self.values.get(field) {
            Some(FieldValue::Scalar(value)) => Some(value),
            _ => None,
        }
    }

    /// Scalar value trimmed, or `None` when missing or blank.
    pub fn filled(&self, field: &str) -> Option<&str> {
        self.scalar(field)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn get_group(&self, field: &str) -> Result<&[GroupEntry], FormError> {
        match self.values.get(field) {
            Some(FieldValue::Group(entries)) => Ok(entries),
            _ => Err(FormError::InvalidField(field.to_string())),
        }
    }

    pub fn set_group(&mut self, field: &str, entries: Vec<GroupEntry>) -> Result<(), FormError> {
        self.ensure_editable()?;
        let shape = self.group_shape(field)?;
        if entries.is_empty() {
            return Err(FormError::MinimumSizeViolation(field.to_string()));
        }
        if !entries.iter().all(|entry| shape.admits(entry)) {
            return Err(FormError::ShapeMismatch(field.to_string()));
        }

        self.values
            .insert(field.to_string(), FieldValue::Group(entries));
        Ok(())
    }

    pub(crate) fn group_shape(&self, field: &str) -> Result<FieldShape, FormError> {
        match self.schema.shape(field) {
            Some(shape @ (FieldShape::ScalarGroup | FieldShape::RecordGroup(_))) => {
                Ok(shape.clone())
            }
            _ => Err(FormError::InvalidField(field.to_string())),
        }
    }

    pub(crate) fn group_mut(&mut self, field: &str) -> Result<&mut Vec<GroupEntry>, FormError> {
        match self.values.get_mut(field) {
            Some(FieldValue::Group(entries)) => Ok(entries),
            _ => Err(FormError::InvalidField(field.to_string())),
        }
    }
}
