//! Add, remove and update operations over the repeated fields of a [`FormState`].
//!
//! Indices are checked against the group's current length on every call.
//! Removal never reorders survivors and additions always land at the tail.

use tracing::debug;

use super::store::{FieldShape, FormError, FormState, GroupEntry};

impl FormState {
    /// Append `entry` to the group, returning the index it landed at.
    pub fn add_entry(&mut self, field: &str, entry: GroupEntry) -> Result<usize, FormError> {
        self.ensure_editable()?;
        let shape = self.group_shape(field)?;
        if !shape.admits(&entry) {
            return Err(FormError::ShapeMismatch(field.to_string()));
        }

        let entries = self.group_mut(field)?;
        entries.push(entry);
        let index = entries.len() - 1;
        debug!(field, index, "group entry added");
        Ok(index)
    }

    /// Append the shape's blank entry.
    pub fn add_blank_entry(&mut self, field: &str) -> Result<usize, FormError> {
        let entry = self
            .group_shape(field)?
            .blank_entry()
            .ok_or_else(|| FormError::InvalidField(field.to_string()))?;
        self.add_entry(field, entry)
    }

    /// Remove the entry at `index`. A single-entry group refuses removal.
    pub fn remove_entry(&mut self, field: &str, index: usize) -> Result<GroupEntry, FormError> {
        self.ensure_editable()?;
        let entries = self.group_mut(field)?;
        let len = entries.len();
        if len <= 1 {
            return Err(FormError::MinimumSizeViolation(field.to_string()));
        }
        if index >= len {
            return Err(FormError::IndexOutOfRange {
                field: field.to_string(),
                index,
                len,
            });
        }

        let removed = entries.remove(index);
        debug!(field, index, remaining = len - 1, "group entry removed");
        Ok(removed)
    }

    /// Replace a bare entry (`key` is `None`) or one sub-field of a record entry.
    pub fn update_entry(
        &mut self,
        field: &str,
        index: usize,
        key: Option<&str>,
        value: impl Into<String>,
    ) -> Result<(), FormError> {
        self.ensure_editable()?;
        let shape = self.group_shape(field)?;
        let entries = self.group_mut(field)?;
        let len = entries.len();
        let entry = entries
            .get_mut(index)
            .ok_or_else(|| FormError::IndexOutOfRange {
                field: field.to_string(),
                index,
                len,
            })?;

        match (&shape, key, entry) {
            (FieldShape::ScalarGroup, None, entry) => {
                *entry = GroupEntry::Text(value.into());
            }
            (FieldShape::RecordGroup(keys), Some(key), GroupEntry::Record(fields))
                if keys.iter().any(|known| known == key) =>
            {
                fields.insert(key.to_string(), value.into());
            }
            (_, key, _) => {
                return Err(FormError::InvalidSubField {
                    field: field.to_string(),
                    key: key.map(str::to_string),
                });
            }
        }

        Ok(())
    }
}
