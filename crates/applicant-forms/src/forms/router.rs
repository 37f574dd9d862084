use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::attachment::CandidateFile;
use super::controller::FormEvent;
use super::definition::FormKind;
use super::gate::SubmissionError;
use super::service::{FormId, FormIntakeService, IntakeServiceError};
use super::store::FormError;
use super::transport::PayloadTransport;

/// Router exposing the form event surface over HTTP.
pub fn form_router<T>(service: Arc<FormIntakeService<T>>) -> Router
where
    T: PayloadTransport + 'static,
{
    Router::new()
        .route("/api/v1/forms", post(open_handler::<T>))
        .route(
            "/api/v1/forms/:form_id",
            get(view_handler::<T>).delete(discard_handler::<T>),
        )
        .route("/api/v1/forms/:form_id/events", post(event_handler::<T>))
        .route(
            "/api/v1/forms/:form_id/attachment",
            put(attachment_handler::<T>),
        )
        .route(
            "/api/v1/forms/:form_id/attachment/preview",
            get(preview_handler::<T>),
        )
        .route("/api/v1/forms/:form_id/submit", post(submit_handler::<T>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenFormRequest {
    pub(crate) kind: FormKind,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AttachmentQuery {
    #[serde(default)]
    pub(crate) file_name: Option<String>,
}

impl IntoResponse for IntakeServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            IntakeServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            IntakeServiceError::Form(FormError::FormLocked)
            | IntakeServiceError::Submission(SubmissionError::AlreadySubmitted) => {
                StatusCode::CONFLICT
            }
            IntakeServiceError::Form(FormError::Attachment(_))
            | IntakeServiceError::Submission(SubmissionError::Rejected(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            IntakeServiceError::Form(_) => StatusCode::BAD_REQUEST,
            IntakeServiceError::Transport(_) => StatusCode::BAD_GATEWAY,
            IntakeServiceError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match &self {
            IntakeServiceError::Submission(error @ SubmissionError::Rejected(failures)) => json!({
                "error": error.to_string(),
                "failures": failures,
            }),
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

pub(crate) async fn open_handler<T>(
    State(service): State<Arc<FormIntakeService<T>>>,
    Json(request): Json<OpenFormRequest>,
) -> Result<Response, IntakeServiceError>
where
    T: PayloadTransport + 'static,
{
    let snapshot = service.open(request.kind)?;
    Ok((StatusCode::CREATED, Json(snapshot)).into_response())
}

pub(crate) async fn view_handler<T>(
    State(service): State<Arc<FormIntakeService<T>>>,
    Path(form_id): Path<String>,
) -> Result<Response, IntakeServiceError>
where
    T: PayloadTransport + 'static,
{
    let snapshot = service.view(&FormId(form_id))?;
    Ok(Json(snapshot).into_response())
}

pub(crate) async fn discard_handler<T>(
    State(service): State<Arc<FormIntakeService<T>>>,
    Path(form_id): Path<String>,
) -> Result<StatusCode, IntakeServiceError>
where
    T: PayloadTransport + 'static,
{
    service.discard(&FormId(form_id))?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn event_handler<T>(
    State(service): State<Arc<FormIntakeService<T>>>,
    Path(form_id): Path<String>,
    Json(event): Json<FormEvent>,
) -> Result<Response, IntakeServiceError>
where
    T: PayloadTransport + 'static,
{
    let snapshot = service.apply(&FormId(form_id), event)?;
    Ok(Json(snapshot).into_response())
}

pub(crate) async fn attachment_handler<T>(
    State(service): State<Arc<FormIntakeService<T>>>,
    Path(form_id): Path<String>,
    Query(query): Query<AttachmentQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, IntakeServiceError>
where
    T: PayloadTransport + 'static,
{
    let media_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let file_name = query.file_name.unwrap_or_else(|| "attachment".to_string());
    let candidate = CandidateFile::new(file_name, media_type, body.to_vec());

    let snapshot = service.select_file(&FormId(form_id), candidate)?;
    Ok(Json(snapshot).into_response())
}

pub(crate) async fn preview_handler<T>(
    State(service): State<Arc<FormIntakeService<T>>>,
    Path(form_id): Path<String>,
) -> Result<Response, IntakeServiceError>
where
    T: PayloadTransport + 'static,
{
    match service.preview(&FormId(form_id))? {
        Some((media_type, content)) => Ok((
            StatusCode::OK,
            [(header::CONTENT_TYPE, media_type.essence_str().to_string())],
            content,
        )
            .into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no preview is visible for this form" })),
        )
            .into_response()),
    }
}

pub(crate) async fn submit_handler<T>(
    State(service): State<Arc<FormIntakeService<T>>>,
    Path(form_id): Path<String>,
) -> Result<Response, IntakeServiceError>
where
    T: PayloadTransport + 'static,
{
    let receipt = service.submit(&FormId(form_id))?;
    Ok((StatusCode::ACCEPTED, Json(receipt)).into_response())
}
