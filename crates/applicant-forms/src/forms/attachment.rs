//! Attachment admission and the preview handle lifecycle.
//!
//! A candidate file only reaches the form after [`AttachmentPolicy::validate`]
//! accepts it. Preview handles are created lazily on the first request to show
//! a preview and are owned by a [`PreviewLease`], which releases the handle when
//! the attachment is replaced, cleared or dropped with its form.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use mime::Mime;
use serde::Serialize;
use tracing::{debug, warn};

use super::store::{FormError, FormState};

/// Reference default: PDF documents up to 256 KiB.
pub const DEFAULT_MAX_ATTACHMENT_BYTES: u64 = 256 * 1024;

/// File picked by the user, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub file_name: String,
    pub media_type: String,
    pub content: Vec<u8>,
}

impl CandidateFile {
    pub fn new(
        file_name: impl Into<String>,
        media_type: impl Into<String>,
        content: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            content,
        }
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttachmentError {
    #[error("unsupported file type '{declared}', expected {accepted}")]
    UnsupportedType { declared: String, accepted: String },
    #[error("file size {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },
    #[error(transparent)]
    Preview(#[from] PreviewError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreviewError {
    #[error("preview resources unavailable: {0}")]
    Unavailable(String),
}

/// Accepted media type and inclusive size limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentPolicy {
    accepted: Mime,
    max_bytes: u64,
}

impl Default for AttachmentPolicy {
    fn default() -> Self {
        Self::new(mime::APPLICATION_PDF, DEFAULT_MAX_ATTACHMENT_BYTES)
    }
}

impl AttachmentPolicy {
    pub fn new(accepted: Mime, max_bytes: u64) -> Self {
        Self {
            accepted,
            max_bytes,
        }
    }

    pub fn accepted(&self) -> &Mime {
        &self.accepted
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// The declared type must equal the accepted type exactly, with no case
    /// folding, trimming or parameters. Type is checked before size.
    pub fn validate(&self, candidate: CandidateFile) -> Result<Attachment, AttachmentError> {
        if candidate.media_type != self.accepted.as_ref() {
            return Err(AttachmentError::UnsupportedType {
                declared: candidate.media_type,
                accepted: self.accepted.to_string(),
            });
        }

        let size = candidate.size();
        if size > self.max_bytes {
            return Err(AttachmentError::TooLarge {
                size,
                limit: self.max_bytes,
            });
        }

        Ok(Attachment {
            file_name: candidate.file_name,
            media_type: self.accepted.clone(),
            declared_type: candidate.media_type,
            content: candidate.content,
            preview: None,
        })
    }
}

/// Opaque reference to an externally managed preview resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PreviewHandle(pub String);

/// External collaborator creating and releasing preview resources.
pub trait PreviewResources: Send + Sync + fmt::Debug {
    fn create(
        &self,
        file_name: &str,
        media_type: &Mime,
        content: &[u8],
    ) -> Result<PreviewHandle, PreviewError>;
    fn release(&self, handle: &PreviewHandle);
    fn open(&self, handle: &PreviewHandle) -> Option<(Mime, Vec<u8>)>;
}

/// Owns one preview handle and releases it exactly once, on drop.
pub struct PreviewLease {
    handle: PreviewHandle,
    resources: Arc<dyn PreviewResources>,
}

impl PreviewLease {
    pub fn handle(&self) -> &PreviewHandle {
        &self.handle
    }
}

impl fmt::Debug for PreviewLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewLease")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl Drop for PreviewLease {
    fn drop(&mut self) {
        debug!(handle = %self.handle.0, "releasing preview handle");
        self.resources.release(&self.handle);
    }
}

/// A validated file staged for submission.
#[derive(Debug)]
pub struct Attachment {
    file_name: String,
    media_type: Mime,
    declared_type: String,
    content: Vec<u8>,
    preview: Option<PreviewLease>,
}

impl Attachment {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn media_type(&self) -> &Mime {
        &self.media_type
    }

    /// Media type string exactly as the file declared it.
    pub fn declared_type(&self) -> &str {
        &self.declared_type
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    pub fn preview_handle(&self) -> Option<&PreviewHandle> {
        self.preview.as_ref().map(PreviewLease::handle)
    }

    fn ensure_preview(
        &mut self,
        resources: &Arc<dyn PreviewResources>,
    ) -> Result<&PreviewHandle, PreviewError> {
        if self.preview.is_none() {
            let handle = resources.create(&self.file_name, &self.media_type, &self.content)?;
            debug!(handle = %handle.0, file = %self.file_name, "preview handle created");
            self.preview = Some(PreviewLease {
                handle,
                resources: Arc::clone(resources),
            });
        }

        self.preview
            .as_ref()
            .map(PreviewLease::handle)
            .ok_or_else(|| PreviewError::Unavailable("preview lease missing".to_string()))
    }
}

/// Current attachment, preview visibility and the last rejection message.
#[derive(Debug, Default)]
pub struct AttachmentSlot {
    current: Option<Attachment>,
    preview_visible: bool,
    last_error: Option<String>,
}

impl AttachmentSlot {
    pub fn current(&self) -> Option<&Attachment> {
        self.current.as_ref()
    }

    pub fn preview_visible(&self) -> bool {
        self.preview_visible
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn replace(&mut self, attachment: Option<Attachment>) {
        // Dropping the previous attachment releases its lease.
        self.current = attachment;
        self.preview_visible = false;
    }
}

impl FormState {
    /// Validate `candidate` and admit it. A rejected candidate also clears the
    /// previously accepted attachment and records the rejection message.
    pub fn select_attachment(
        &mut self,
        candidate: CandidateFile,
        policy: &AttachmentPolicy,
    ) -> Result<(), FormError> {
        self.ensure_editable()?;
        let file_name = candidate.file_name.clone();

        match policy.validate(candidate) {
            Ok(attachment) => {
                debug!(file = %file_name, size = attachment.size(), "attachment accepted");
                self.attachment.replace(Some(attachment));
                self.attachment.last_error = None;
                Ok(())
            }
            Err(error) => {
                warn!(file = %file_name, %error, "attachment rejected");
                self.attachment.replace(None);
                self.attachment.last_error = Some(error.to_string());
                Err(error.into())
            }
        }
    }

    pub fn clear_attachment(&mut self) -> Result<(), FormError> {
        self.ensure_editable()?;
        self.attachment.replace(None);
        self.attachment.last_error = None;
        Ok(())
    }

    /// Flip preview visibility, creating the handle on first show. Returns the
    /// new visibility; a form without an attachment stays hidden.
    pub fn toggle_preview(
        &mut self,
        resources: &Arc<dyn PreviewResources>,
    ) -> Result<bool, FormError> {
        let slot = &mut self.attachment;
        let Some(attachment) = slot.current.as_mut() else {
            return Ok(false);
        };

        if !slot.preview_visible {
            attachment
                .ensure_preview(resources)
                .map_err(AttachmentError::from)?;
        }
        slot.preview_visible = !slot.preview_visible;
        Ok(slot.preview_visible)
    }
}

static PREVIEW_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// In-process preview store handing out `blob:` style handles.
#[derive(Debug, Default)]
pub struct PreviewRegistry {
    entries: Mutex<HashMap<PreviewHandle, (Mime, Vec<u8>)>>,
    created: AtomicU64,
    released: AtomicU64,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }

    pub fn released(&self) -> u64 {
        self.released.load(Ordering::Relaxed)
    }

    pub fn live(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }
}

impl PreviewResources for PreviewRegistry {
    fn create(
        &self,
        _file_name: &str,
        media_type: &Mime,
        content: &[u8],
    ) -> Result<PreviewHandle, PreviewError> {
        let id = PREVIEW_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let handle = PreviewHandle(format!("blob:preview-{id:06}"));
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| PreviewError::Unavailable("preview registry poisoned".to_string()))?;
        entries.insert(handle.clone(), (media_type.clone(), content.to_vec()));
        self.created.fetch_add(1, Ordering::Relaxed);
        Ok(handle)
    }

    fn release(&self, handle: &PreviewHandle) {
        if let Ok(mut entries) = self.entries.lock() {
            if entries.remove(handle).is_some() {
                self.released.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn open(&self, handle: &PreviewHandle) -> Option<(Mime, Vec<u8>)> {
        self.entries.lock().ok()?.get(handle).cloned()
    }
}
