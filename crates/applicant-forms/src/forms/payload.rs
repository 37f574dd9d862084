use serde::Serialize;

use super::attachment::Attachment;
use super::definition::FormKind;

/// Submission-ready representation of a form handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Payload {
    pub form: FormKind,
    pub fields: Vec<PayloadField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<BinaryPart>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayloadField {
    pub name: String,
    pub value: String,
}

/// Named binary part carrying the raw attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BinaryPart {
    pub name: String,
    pub file_name: String,
    pub media_type: String,
    #[serde(skip_serializing)]
    pub content: Vec<u8>,
    pub size: u64,
}

/// Multipart-ready view over a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadPart<'a> {
    Text {
        name: &'a str,
        value: &'a str,
    },
    Binary {
        name: &'a str,
        file_name: &'a str,
        media_type: &'a str,
        content: &'a [u8],
    },
}

impl Payload {
    pub fn new(form: FormKind) -> Self {
        Self {
            form,
            fields: Vec::new(),
            attachment: None,
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(PayloadField {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn with_attachment(mut self, name: impl Into<String>, attachment: &Attachment) -> Self {
        self.attachment = Some(BinaryPart {
            name: name.into(),
            file_name: attachment.file_name().to_string(),
            media_type: attachment.declared_type().to_string(),
            content: attachment.content().to_vec(),
            size: attachment.size(),
        });
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.value.as_str())
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|field| field.name.clone()).collect()
    }

    /// Text parts in assembly order, then the binary part.
    pub fn parts(&self) -> impl Iterator<Item = PayloadPart<'_>> + '_ {
        let text = self.fields.iter().map(|field| PayloadPart::Text {
            name: &field.name,
            value: &field.value,
        });
        let binary = self.attachment.iter().map(|part| PayloadPart::Binary {
            name: &part.name,
            file_name: &part.file_name,
            media_type: &part.media_type,
            content: &part.content,
        });
        text.chain(binary)
    }
}
