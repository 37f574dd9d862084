use std::sync::Arc;

use super::common::*;
use crate::config::IntakeConfig;
use crate::forms::acceptance::{CUSTOM_COMPANY, JOB_TYPE, OUT_HOUSE, SELECT_OPTION};
use crate::forms::controller::FormEvent;
use crate::forms::definition::FormKind;
use crate::forms::gate::SubmissionError;
use crate::forms::service::{FormId, FormIntakeService, IntakeServiceError};
use crate::forms::transport::{PayloadTransport, TransportError};
use crate::forms::store::FormError;

fn scalar(field: &str, value: &str) -> FormEvent {
    FormEvent::SetScalar {
        field: field.to_string(),
        value: value.to_string(),
    }
}

#[test]
fn open_forms_receive_distinct_ids() {
    let (service, _, _) = build_service();
    let first = service.open(FormKind::Resume).expect("opened");
    let second = service.open(FormKind::Resume).expect("opened");
    assert_ne!(first.form_id, second.form_id);
    assert!(first.form_id.0.starts_with("form-"));
    assert_eq!(first.view.status, "editable");
    assert_eq!(service.open_forms(), 2);
}

#[test]
fn submit_delivers_payload_and_returns_receipt() {
    let (service, _, transport) = build_service();
    let form_id = service.open(FormKind::Acceptance).expect("opened").form_id;

    for event in [
        scalar(SELECT_OPTION, OUT_HOUSE),
        scalar(CUSTOM_COMPANY, "Acme Co"),
        scalar(JOB_TYPE, "regular"),
    ] {
        service.apply(&form_id, event).expect("event applied");
    }
    service.select_file(&form_id, pdf(2048)).expect("file accepted");

    let receipt = service.submit(&form_id).expect("submitted");
    assert_eq!(receipt.kind, FormKind::Acceptance);
    assert_eq!(receipt.attachment_bytes, Some(2048));
    assert_eq!(
        receipt.fields,
        vec!["selectOption", "companyName", "jobType"]
    );

    let delivered = transport.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].field("companyName"), Some("Acme Co"));

    assert!(matches!(
        service.submit(&form_id),
        Err(IntakeServiceError::Submission(SubmissionError::AlreadySubmitted))
    ));
    assert!(matches!(
        service.apply(&form_id, scalar(JOB_TYPE, "good")),
        Err(IntakeServiceError::Form(FormError::FormLocked))
    ));
    assert_eq!(transport.delivered().len(), 1);
}

fn submittable_application<T>(service: &FormIntakeService<T>) -> FormId
where
    T: PayloadTransport + 'static,
{
    let form_id = service.open(FormKind::Application).expect("opened").form_id;
    service
        .apply(&form_id, scalar("job_name", "Data Scientist"))
        .expect("event applied");
    form_id
}

#[test]
fn failed_delivery_is_retried_on_the_next_submit() {
    let (_, resources) = previews();
    let transport = Arc::new(FlakyTransport::default());
    let service = FormIntakeService::new(IntakeConfig::default(), resources, transport.clone());
    let form_id = submittable_application(&service);

    assert!(matches!(
        service.submit(&form_id),
        Err(IntakeServiceError::Transport(TransportError::Unavailable(_)))
    ));
    let snapshot = service.view(&form_id).expect("view");
    assert_eq!(snapshot.view.status, "submitted");
    assert!(snapshot.delivery_pending);
    assert!(matches!(
        service.apply(&form_id, scalar("job_name", "Cloud Architect")),
        Err(IntakeServiceError::Form(FormError::FormLocked))
    ));

    assert!(matches!(
        service.submit(&form_id),
        Err(IntakeServiceError::Transport(_))
    ));
    assert!(transport.delivered().is_empty());

    transport.set_online(true);
    let receipt = service.submit(&form_id).expect("redelivered");
    assert_eq!(receipt.fields, vec!["jobName"]);

    let delivered = transport.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].field("jobName"), Some("Data Scientist"));
    assert!(!service.view(&form_id).expect("view").delivery_pending);

    assert!(matches!(
        service.submit(&form_id),
        Err(IntakeServiceError::Submission(SubmissionError::AlreadySubmitted))
    ));
    assert_eq!(transport.delivered().len(), 1);
}

#[test]
fn delivered_forms_release_their_controller_and_are_evicted_past_retention() {
    let (registry, resources) = previews();
    let transport = Arc::new(MemoryTransport::default());
    let config = IntakeConfig {
        delivered_retention: 1,
        ..IntakeConfig::default()
    };
    let service = FormIntakeService::new(config, resources, transport.clone());

    let first = service.open(FormKind::Acceptance).expect("opened").form_id;
    for event in [
        scalar(SELECT_OPTION, OUT_HOUSE),
        scalar(CUSTOM_COMPANY, "Acme Co"),
        scalar(JOB_TYPE, "regular"),
    ] {
        service.apply(&first, event).expect("event applied");
    }
    service.select_file(&first, pdf(512)).expect("file accepted");
    service
        .apply(&first, FormEvent::TogglePreview)
        .expect("preview shown");
    assert_eq!(registry.live(), 1);

    service.submit(&first).expect("delivered");
    assert_eq!(registry.live(), 0);
    assert_eq!(service.open_forms(), 0);
    assert_eq!(service.delivered_forms(), 1);

    let view = service.view(&first).expect("delivered view retained").view;
    assert_eq!(view.status, "submitted");
    let attachment = view.attachment.expect("attachment summary retained");
    assert!(!attachment.preview_visible);
    assert!(attachment.preview_handle.is_none());
    assert_eq!(service.preview(&first).expect("form exists"), None);

    let second = submittable_application(&service);
    service.submit(&second).expect("delivered");
    assert_eq!(service.delivered_forms(), 1);
    assert!(matches!(
        service.view(&first),
        Err(IntakeServiceError::NotFound(_))
    ));
    assert!(service.view(&second).is_ok());
    assert_eq!(transport.delivered().len(), 2);
}

#[test]
fn unknown_forms_are_reported() {
    let (service, _, _) = build_service();
    let missing = FormId("form-missing".to_string());
    assert!(matches!(
        service.view(&missing),
        Err(IntakeServiceError::NotFound(_))
    ));
    assert!(matches!(
        service.discard(&missing),
        Err(IntakeServiceError::NotFound(_))
    ));
}

#[test]
fn discard_releases_preview_handles() {
    let (service, registry, _) = build_service();
    let form_id = service.open(FormKind::Acceptance).expect("opened").form_id;
    service.select_file(&form_id, pdf(128)).expect("file accepted");
    service
        .apply(&form_id, FormEvent::TogglePreview)
        .expect("preview toggled");

    let (media_type, bytes) = service
        .preview(&form_id)
        .expect("form exists")
        .expect("preview visible");
    assert_eq!(media_type, mime::APPLICATION_PDF);
    assert_eq!(bytes.len(), 128);
    assert_eq!(registry.live(), 1);

    service.discard(&form_id).expect("discarded");
    assert_eq!(registry.live(), 0);
    assert_eq!(service.open_forms(), 0);
}
