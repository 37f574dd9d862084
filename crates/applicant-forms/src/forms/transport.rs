use super::payload::Payload;

/// Outbound hand-off of submitted payloads (multipart upload, queue, e-mail).
pub trait PayloadTransport: Send + Sync {
    fn deliver(&self, payload: &Payload) -> Result<(), TransportError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("payload transport unavailable: {0}")]
    Unavailable(String),
    #[error("payload rejected by transport: {0}")]
    Rejected(String),
}
