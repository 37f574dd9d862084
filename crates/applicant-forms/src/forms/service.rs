use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use mime::Mime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::attachment::{CandidateFile, PreviewResources};
use super::controller::{FormController, FormEvent, FormView};
use super::definition::FormKind;
use super::gate::{SubmissionError, SubmissionGate};
use super::payload::Payload;
use super::store::FormError;
use super::transport::{PayloadTransport, TransportError};
use crate::config::IntakeConfig;

/// Identifier of an open form session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormId(pub String);

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

static FORM_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_form_id() -> FormId {
    let id = FORM_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    FormId(format!("form-{id:06}"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormSnapshot {
    pub form_id: FormId,
    #[serde(flatten)]
    pub view: FormView,
    /// Submitted, but the payload has not reached the transport yet.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub delivery_pending: bool,
}

/// Acknowledgement returned once a payload has been handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub form_id: FormId,
    pub kind: FormKind,
    pub submitted_at: DateTime<Utc>,
    pub fields: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_bytes: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum IntakeServiceError {
    #[error("form {0} not found")]
    NotFound(FormId),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("form sessions unavailable: {0}")]
    Unavailable(String),
}

enum Session {
    /// Editable, or locked with a payload that still has to be delivered.
    Active {
        controller: FormController,
        pending: Option<Payload>,
    },
    /// Delivered. The controller and its attachment bytes are gone; only the
    /// final view is kept so repeat submissions can still be refused.
    Delivered(FormView),
}

impl Session {
    fn snapshot(&self, form_id: &FormId) -> FormSnapshot {
        match self {
            Session::Active {
                controller,
                pending,
            } => FormSnapshot {
                form_id: form_id.clone(),
                view: controller.view(),
                delivery_pending: pending.is_some(),
            },
            Session::Delivered(view) => FormSnapshot {
                form_id: form_id.clone(),
                view: view.clone(),
                delivery_pending: false,
            },
        }
    }
}

#[derive(Default)]
struct Sessions {
    forms: HashMap<FormId, Session>,
    delivered: VecDeque<FormId>,
}

impl Sessions {
    fn get_mut(&mut self, form_id: &FormId) -> Result<&mut Session, IntakeServiceError> {
        self.forms
            .get_mut(form_id)
            .ok_or_else(|| IntakeServiceError::NotFound(form_id.clone()))
    }

    /// Replace a delivered form's controller with its final view, then evict
    /// the oldest delivered forms beyond `retention`.
    fn mark_delivered(&mut self, form_id: &FormId, retention: usize) {
        if let Some(session) = self.forms.get_mut(form_id) {
            if let Session::Active { controller, .. } = &*session {
                let mut view = controller.view();
                if let Some(attachment) = view.attachment.as_mut() {
                    attachment.preview_visible = false;
                    attachment.preview_handle = None;
                }
                *session = Session::Delivered(view);
                self.delivered.push_back(form_id.clone());
            }
        }

        while self.delivered.len() > retention {
            if let Some(evicted) = self.delivered.pop_front() {
                self.forms.remove(&evicted);
                debug!(form_id = %evicted, "delivered form evicted");
            }
        }
    }
}

/// Holds open form controllers and hands accepted payloads to the transport.
pub struct FormIntakeService<T> {
    sessions: Mutex<Sessions>,
    config: IntakeConfig,
    previews: Arc<dyn PreviewResources>,
    transport: Arc<T>,
}

impl<T> FormIntakeService<T>
where
    T: PayloadTransport + 'static,
{
    pub fn new(
        config: IntakeConfig,
        previews: Arc<dyn PreviewResources>,
        transport: Arc<T>,
    ) -> Self {
        Self {
            sessions: Mutex::new(Sessions::default()),
            config,
            previews,
            transport,
        }
    }

    pub fn open(&self, kind: FormKind) -> Result<FormSnapshot, IntakeServiceError> {
        let controller = FormController::new(
            kind.definition(&self.config.catalog),
            SubmissionGate::new(self.config.validation_mode),
            self.config.attachment_policy(),
            Arc::clone(&self.previews),
        );
        let form_id = next_form_id();
        let session = Session::Active {
            controller,
            pending: None,
        };
        let snapshot = session.snapshot(&form_id);

        self.sessions()?.forms.insert(form_id.clone(), session);
        info!(form = kind.label(), %form_id, "form opened");
        Ok(snapshot)
    }

    pub fn view(&self, form_id: &FormId) -> Result<FormSnapshot, IntakeServiceError> {
        let mut sessions = self.sessions()?;
        Ok(sessions.get_mut(form_id)?.snapshot(form_id))
    }

    pub fn apply(
        &self,
        form_id: &FormId,
        event: FormEvent,
    ) -> Result<FormSnapshot, IntakeServiceError> {
        self.with_form(form_id, |controller| Ok(controller.apply(event)?))
    }

    pub fn select_file(
        &self,
        form_id: &FormId,
        candidate: CandidateFile,
    ) -> Result<FormSnapshot, IntakeServiceError> {
        self.with_form(form_id, |controller| Ok(controller.select_file(candidate)?))
    }

    pub fn preview(
        &self,
        form_id: &FormId,
    ) -> Result<Option<(Mime, Vec<u8>)>, IntakeServiceError> {
        let mut sessions = self.sessions()?;
        match sessions.get_mut(form_id)? {
            Session::Active { controller, .. } => Ok(controller.preview()),
            Session::Delivered(_) => Ok(None),
        }
    }

    /// Submit through the gate, then deliver. A payload whose delivery fails
    /// stays with the form, and the next `submit` redelivers it. Once
    /// delivery succeeds the form only answers `AlreadySubmitted`.
    pub fn submit(&self, form_id: &FormId) -> Result<SubmissionReceipt, IntakeServiceError> {
        let (kind, payload, redelivery) = {
            let mut sessions = self.sessions()?;
            match sessions.get_mut(form_id)? {
                Session::Delivered(_) => {
                    return Err(SubmissionError::AlreadySubmitted.into());
                }
                Session::Active {
                    controller,
                    pending,
                } => match pending.take() {
                    Some(payload) => (controller.kind(), payload, true),
                    None => (controller.kind(), controller.submit()?, false),
                },
            }
        };

        if let Err(error) = self.transport.deliver(&payload) {
            warn!(%form_id, %error, redelivery, "payload delivery failed, keeping it for retry");
            if let Ok(mut sessions) = self.sessions() {
                if let Some(Session::Active { pending, .. }) = sessions.forms.get_mut(form_id) {
                    *pending = Some(payload);
                }
            }
            return Err(error.into());
        }

        self.sessions()?
            .mark_delivered(form_id, self.config.delivered_retention);
        info!(%form_id, form = kind.label(), redelivery, "payload delivered");

        Ok(SubmissionReceipt {
            form_id: form_id.clone(),
            kind,
            submitted_at: Utc::now(),
            fields: payload.field_names(),
            attachment_bytes: payload.attachment.as_ref().map(|part| part.size),
        })
    }

    pub fn discard(&self, form_id: &FormId) -> Result<(), IntakeServiceError> {
        let mut sessions = self.sessions()?;
        let session = sessions
            .forms
            .remove(form_id)
            .ok_or_else(|| IntakeServiceError::NotFound(form_id.clone()))?;
        sessions.delivered.retain(|delivered| delivered != form_id);
        drop(sessions);

        if let Session::Active { controller, .. } = session {
            controller.discard();
        }
        Ok(())
    }

    /// Forms still held with their controller: editable, or awaiting delivery.
    pub fn open_forms(&self) -> usize {
        self.sessions()
            .map(|sessions| {
                sessions
                    .forms
                    .values()
                    .filter(|session| matches!(session, Session::Active { .. }))
                    .count()
            })
            .unwrap_or(0)
    }

    /// Delivered forms whose final view is still retained.
    pub fn delivered_forms(&self) -> usize {
        self.sessions()
            .map(|sessions| sessions.delivered.len())
            .unwrap_or(0)
    }

    fn sessions(&self) -> Result<std::sync::MutexGuard<'_, Sessions>, IntakeServiceError> {
        self.sessions
            .lock()
            .map_err(|_| IntakeServiceError::Unavailable("session mutex poisoned".to_string()))
    }

    /// Run `action` against one editable form and return its refreshed
    /// snapshot. Delivered forms are locked.
    fn with_form<F>(&self, form_id: &FormId, action: F) -> Result<FormSnapshot, IntakeServiceError>
    where
        F: FnOnce(&mut FormController) -> Result<(), IntakeServiceError>,
    {
        let mut sessions = self.sessions()?;
        let session = sessions.get_mut(form_id)?;
        match &mut *session {
            Session::Active { controller, .. } => action(controller)?,
            Session::Delivered(_) => return Err(FormError::FormLocked.into()),
        }
        Ok(session.snapshot(form_id))
    }
}
