use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::config::IntakeConfig;
use crate::forms::attachment::{
    AttachmentPolicy, CandidateFile, PreviewRegistry, PreviewResources,
};
use crate::forms::controller::FormController;
use crate::forms::definition::{FormCatalog, FormKind};
use crate::forms::gate::{SubmissionGate, ValidationMode};
use crate::forms::payload::Payload;
use crate::forms::service::FormIntakeService;
use crate::forms::transport::{PayloadTransport, TransportError};

pub(super) fn pdf(size: usize) -> CandidateFile {
    CandidateFile::new("offer-letter.pdf", "application/pdf", vec![0x25; size])
}

pub(super) fn previews() -> (Arc<PreviewRegistry>, Arc<dyn PreviewResources>) {
    let registry = Arc::new(PreviewRegistry::new());
    let resources: Arc<dyn PreviewResources> = registry.clone();
    (registry, resources)
}

pub(super) fn controller_with_mode(
    kind: FormKind,
    mode: ValidationMode,
) -> (FormController, Arc<PreviewRegistry>) {
    let (registry, resources) = previews();
    let controller = FormController::new(
        kind.definition(&FormCatalog::default()),
        SubmissionGate::new(mode),
        AttachmentPolicy::default(),
        resources,
    );
    (controller, registry)
}

pub(super) fn controller(kind: FormKind) -> (FormController, Arc<PreviewRegistry>) {
    controller_with_mode(kind, ValidationMode::FirstFailure)
}

#[derive(Default)]
pub(super) struct MemoryTransport {
    delivered: Mutex<Vec<Payload>>,
}

impl MemoryTransport {
    pub(super) fn delivered(&self) -> Vec<Payload> {
        self.delivered.lock().expect("transport mutex poisoned").clone()
    }
}

impl PayloadTransport for MemoryTransport {
    fn deliver(&self, payload: &Payload) -> Result<(), TransportError> {
        self.delivered
            .lock()
            .expect("transport mutex poisoned")
            .push(payload.clone());
        Ok(())
    }
}

pub(super) struct OfflineTransport;

impl PayloadTransport for OfflineTransport {
    fn deliver(&self, _payload: &Payload) -> Result<(), TransportError> {
        Err(TransportError::Unavailable("upstream offline".to_string()))
    }
}

/// Refuses deliveries until brought back online.
#[derive(Default)]
pub(super) struct FlakyTransport {
    online: AtomicBool,
    delivered: Mutex<Vec<Payload>>,
}

impl FlakyTransport {
    pub(super) fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub(super) fn delivered(&self) -> Vec<Payload> {
        self.delivered.lock().expect("transport mutex poisoned").clone()
    }
}

impl PayloadTransport for FlakyTransport {
    fn deliver(&self, payload: &Payload) -> Result<(), TransportError> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable("upstream down".to_string()));
        }
        self.delivered
            .lock()
            .expect("transport mutex poisoned")
            .push(payload.clone());
        Ok(())
    }
}

pub(super) fn build_service() -> (
    Arc<FormIntakeService<MemoryTransport>>,
    Arc<PreviewRegistry>,
    Arc<MemoryTransport>,
) {
    let (registry, resources) = previews();
    let transport = Arc::new(MemoryTransport::default());
    let service = Arc::new(FormIntakeService::new(
        IntakeConfig::default(),
        resources,
        transport.clone(),
    ));
    (service, registry, transport)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
