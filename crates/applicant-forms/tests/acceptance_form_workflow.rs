//! Integration specifications for the offer acceptance form.
//!
//! Scenarios drive the public controller API the way a rendering layer would:
//! events in, views and payloads out.

mod common {
    use std::sync::Arc;

    use applicant_forms::forms::{
        AttachmentPolicy, CandidateFile, FormCatalog, FormController, FormKind, PreviewRegistry,
        PreviewResources, SubmissionGate, ValidationMode,
    };

    pub(super) fn offer_letter(size: usize) -> CandidateFile {
        CandidateFile::new("offer.pdf", "application/pdf", vec![b'%'; size])
    }

    pub(super) fn acceptance_controller(
        mode: ValidationMode,
    ) -> (FormController, Arc<PreviewRegistry>) {
        let registry = Arc::new(PreviewRegistry::new());
        let resources: Arc<dyn PreviewResources> = registry.clone();
        let controller = FormController::new(
            FormKind::Acceptance.definition(&FormCatalog::default()),
            SubmissionGate::new(mode),
            AttachmentPolicy::default(),
            resources,
        );
        (controller, registry)
    }
}

use applicant_forms::forms::{
    AttachmentError, CandidateFile, FormError, FormEvent, PayloadPart, SubmissionError, SubmissionStatus,
    ValidationFailure, ValidationMode,
};
use common::*;

fn set(field: &str, value: &str) -> FormEvent {
    FormEvent::SetScalar {
        field: field.to_string(),
        value: value.to_string(),
    }
}

#[test]
fn out_of_house_acceptance_submits_custom_company() {
    let (mut controller, _) = acceptance_controller(ValidationMode::FirstFailure);

    controller.apply(set("select_option", "outHouse")).expect("primary set");
    controller.apply(set("custom_company", "Acme Co")).expect("company set");
    controller.apply(set("job_type", "regular")).expect("tier set");
    controller
        .select_file(offer_letter(10_240))
        .expect("pdf under the limit is accepted");

    let payload = controller.submit().expect("complete form submits");
    assert_eq!(controller.status(), SubmissionStatus::Submitted);

    let parts: Vec<_> = payload.parts().collect();
    assert_eq!(parts.len(), 4);
    assert!(matches!(
        parts[1],
        PayloadPart::Text { name: "companyName", value: "Acme Co" }
    ));
    match parts[3] {
        PayloadPart::Binary {
            name,
            file_name,
            content,
            ..
        } => {
            assert_eq!(name, "offerLetter");
            assert_eq!(file_name, "offer.pdf");
            assert_eq!(content.len(), 10_240);
        }
        ref other => panic!("expected binary part, got {other:?}"),
    }
}

#[test]
fn incomplete_acceptance_reports_every_failure_in_aggregate_mode() {
    let (mut controller, _) = acceptance_controller(ValidationMode::Aggregate);
    controller.apply(set("select_option", "inHouse")).expect("primary set");

    let error = controller.submit().expect_err("incomplete form is rejected");
    let SubmissionError::Rejected(failures) = error else {
        panic!("expected rejection");
    };
    assert_eq!(
        failures,
        vec![
            ValidationFailure::MissingDependentSelection {
                field: "company_name".to_string()
            },
            ValidationFailure::MissingRequiredField {
                field: "job_type".to_string()
            },
            ValidationFailure::MissingAttachment,
        ]
    );
    assert_eq!(controller.status(), SubmissionStatus::Editable);
}

#[test]
fn wrong_file_type_is_refused_and_form_stays_editable() {
    let (mut controller, registry) = acceptance_controller(ValidationMode::FirstFailure);

    let error = controller
        .select_file(CandidateFile::new("offer.docx", "application/msword", vec![1; 64]))
        .expect_err("non-pdf is refused");
    assert!(matches!(
        error,
        FormError::Attachment(AttachmentError::UnsupportedType { .. })
    ));
    assert!(controller.state().attachment().current().is_none());
    assert!(controller.view().attachment_error.is_some());
    assert_eq!(registry.created(), 0);

    let error = controller
        .select_file(offer_letter(262_145))
        .expect_err("oversized pdf is refused");
    assert!(matches!(
        error,
        FormError::Attachment(AttachmentError::TooLarge {
            size: 262_145,
            limit: 262_144
        })
    ));
}

#[test]
fn preview_handles_are_released_once_per_attachment() {
    let (mut controller, registry) = acceptance_controller(ValidationMode::FirstFailure);
    controller.select_file(offer_letter(512)).expect("accepted");
    assert!(controller.toggle_preview().expect("toggle"));
    assert_eq!(registry.created(), 1);

    controller.select_file(offer_letter(1024)).expect("replacement accepted");
    assert_eq!(registry.released(), 1);
    assert_eq!(registry.live(), 0);

    assert!(controller.toggle_preview().expect("toggle"));
    assert_eq!(registry.created(), 2);
    controller.discard();
    assert_eq!(registry.released(), 2);
    assert_eq!(registry.live(), 0);
}
