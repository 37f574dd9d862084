//! Applicant form engine.
//!
//! [`FormState`] stores scalar and repeated fields, the group operations keep
//! every repeated field at one entry or more, [`AttachmentPolicy`] admits the
//! uploaded file and [`SubmissionGate`] validates and locks a form. The
//! [`FormController`] ties these together for one form instance and
//! [`FormIntakeService`] keeps open forms for the HTTP router.

pub mod acceptance;
pub mod application;
pub mod attachment;
pub mod controller;
pub mod definition;
pub mod gate;
mod groups;
pub mod payload;
pub mod resume;
pub mod router;
pub mod service;
pub mod store;
pub mod transport;

#[cfg(test)]
mod tests;

pub use acceptance::{AcceptanceForm, Placement};
pub use application::ApplicationForm;
pub use attachment::{
    Attachment, AttachmentError, AttachmentPolicy, AttachmentSlot, CandidateFile, PreviewError,
    PreviewHandle, PreviewLease, PreviewRegistry, PreviewResources, DEFAULT_MAX_ATTACHMENT_BYTES,
};
pub use controller::{AttachmentView, FormController, FormEvent, FormView};
pub use definition::{Check, FormCatalog, FormDefinition, FormKind};
pub use gate::{
    SubmissionError, SubmissionGate, SubmissionStatus, ValidationFailure, ValidationMode,
};
pub use payload::{BinaryPart, Payload, PayloadField, PayloadPart};
pub use resume::ResumeForm;
pub use router::form_router;
pub use service::{FormId, FormIntakeService, FormSnapshot, IntakeServiceError, SubmissionReceipt};
pub use store::{FieldShape, FieldSpec, FieldValue, FormError, FormSchema, FormState, GroupEntry};
pub use transport::{PayloadTransport, TransportError};
