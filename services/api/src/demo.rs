use crate::infra::LoggingOutbox;
use applicant_forms::config::IntakeConfig;
use applicant_forms::error::AppError;
use applicant_forms::forms::acceptance::{
    COMPANY_NAME, CUSTOM_COMPANY, IN_HOUSE, JOB_TYPE, OUT_HOUSE, SELECT_OPTION,
};
use applicant_forms::forms::{
    CandidateFile, FormEvent, FormId, FormIntakeService, FormKind, FormSnapshot, IntakeServiceError,
    PreviewRegistry, PreviewResources, ValidationMode,
};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Company to accept. Catalog companies use the in-house picklist.
    #[arg(long, default_value = "Acme Co")]
    pub(crate) company: String,
    /// Job tier recorded on the acceptance.
    #[arg(long, default_value = "regular")]
    pub(crate) job_type: String,
    /// Offer letter to attach. A synthetic 10 KiB PDF is used when omitted.
    #[arg(long)]
    pub(crate) offer_letter: Option<PathBuf>,
    /// Report every unmet requirement instead of the first one.
    #[arg(long)]
    pub(crate) aggregate: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        company,
        job_type,
        offer_letter,
        aggregate,
    } = args;

    let mut config = IntakeConfig::default();
    if aggregate {
        config.validation_mode = ValidationMode::Aggregate;
    }
    let in_house = config.catalog.companies.iter().any(|known| *known == company);

    let registry = Arc::new(PreviewRegistry::new());
    let previews: Arc<dyn PreviewResources> = registry.clone();
    let outbox = LoggingOutbox::capturing(1);
    let service = FormIntakeService::new(config, previews, Arc::new(outbox.clone()));

    println!("Offer acceptance demo");
    let snapshot = service.open(FormKind::Acceptance)?;
    let form_id = snapshot.form_id;
    println!("- Opened form {form_id} ({})", snapshot.view.status);

    println!("\nSubmitting the empty form");
    report_submission(&service, &form_id);

    let (placement, company_field) = if in_house {
        (IN_HOUSE, COMPANY_NAME)
    } else {
        (OUT_HOUSE, CUSTOM_COMPANY)
    };
    println!("\nFilling in the acceptance ({placement})");
    apply(&service, &form_id, SELECT_OPTION, placement)?;
    apply(&service, &form_id, company_field, &company)?;
    apply(&service, &form_id, JOB_TYPE, &job_type)?;

    let candidate = match offer_letter {
        Some(path) => {
            let content = std::fs::read(&path)?;
            let media_type = mime_guess::from_path(&path).first_or_octet_stream();
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "offer-letter".to_string());
            CandidateFile::new(file_name, media_type.essence_str(), content)
        }
        None => CandidateFile::new("offer-letter.pdf", "application/pdf", vec![b'%'; 10 * 1024]),
    };

    match service.select_file(&form_id, candidate) {
        Ok(snapshot) => render_attachment(&snapshot),
        Err(IntakeServiceError::Form(err)) => println!("  Attachment refused: {err}"),
        Err(err) => return Err(err.into()),
    }

    let snapshot = service.apply(&form_id, FormEvent::TogglePreview)?;
    render_attachment(&snapshot);

    println!("\nSubmitting the completed form");
    report_submission(&service, &form_id);

    for payload in outbox.payloads().map_err(IntakeServiceError::from)? {
        println!("\nDelivered payload ({})", payload.form.label());
        for field in &payload.fields {
            println!("  - {} = {}", field.name, field.value);
        }
        if let Some(part) = &payload.attachment {
            println!(
                "  - {} = {} [{} | {} bytes]",
                part.name, part.file_name, part.media_type, part.size
            );
        }
    }

    service.discard(&form_id)?;
    println!(
        "\nPreview handles: {} created, {} released",
        registry.created(),
        registry.released()
    );
    Ok(())
}

fn apply<T>(
    service: &FormIntakeService<T>,
    form_id: &FormId,
    field: &str,
    value: &str,
) -> Result<(), AppError>
where
    T: applicant_forms::forms::PayloadTransport + 'static,
{
    service.apply(
        form_id,
        FormEvent::SetScalar {
            field: field.to_string(),
            value: value.to_string(),
        },
    )?;
    println!("  - {field} = {value}");
    Ok(())
}

fn render_attachment(snapshot: &FormSnapshot) {
    match &snapshot.view.attachment {
        Some(attachment) => println!(
            "  Attachment {} ({}, {} bytes) preview {}",
            attachment.file_name,
            attachment.media_type,
            attachment.size,
            if attachment.preview_visible {
                "shown"
            } else {
                "hidden"
            }
        ),
        None => println!("  No attachment selected"),
    }
}

fn report_submission<T>(service: &FormIntakeService<T>, form_id: &FormId)
where
    T: applicant_forms::forms::PayloadTransport + 'static,
{
    match service.submit(form_id) {
        Ok(receipt) => println!(
            "  Accepted at {} with fields: {}",
            receipt.submitted_at.format("%Y-%m-%d %H:%M:%S UTC"),
            receipt.fields.join(", ")
        ),
        Err(err) => println!("  Submission rejected: {err}"),
    }
}
