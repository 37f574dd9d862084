use applicant_forms::forms::{Payload, PayloadTransport, TransportError};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Logs a summary of every delivered payload. A capturing outbox also keeps
/// the most recent `limit` payloads for inspection.
#[derive(Default, Clone)]
pub(crate) struct LoggingOutbox {
    captured: Option<Arc<Mutex<VecDeque<Payload>>>>,
    limit: usize,
}

impl LoggingOutbox {
    pub(crate) fn capturing(limit: usize) -> Self {
        Self {
            captured: Some(Arc::new(Mutex::new(VecDeque::with_capacity(limit)))),
            limit,
        }
    }

    /// Captured payloads, oldest first. Empty for a log-only outbox.
    pub(crate) fn payloads(&self) -> Result<Vec<Payload>, TransportError> {
        match &self.captured {
            Some(captured) => Ok(captured
                .lock()
                .map_err(|_| TransportError::Unavailable("outbox mutex poisoned".to_string()))?
                .iter()
                .cloned()
                .collect()),
            None => Ok(Vec::new()),
        }
    }
}

impl PayloadTransport for LoggingOutbox {
    fn deliver(&self, payload: &Payload) -> Result<(), TransportError> {
        info!(
            form = payload.form.label(),
            fields = payload.fields.len(),
            attachment_bytes = payload.attachment.as_ref().map(|part| part.size),
            "payload delivered"
        );

        if let Some(captured) = &self.captured {
            let mut guard = captured
                .lock()
                .map_err(|_| TransportError::Unavailable("outbox mutex poisoned".to_string()))?;
            guard.push_back(payload.clone());
            while guard.len() > self.limit {
                guard.pop_front();
            }
        }
        Ok(())
    }
}
