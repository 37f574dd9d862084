use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::config::IntakeConfig;
use crate::forms::router::form_router;
use crate::forms::service::FormIntakeService;

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

#[tokio::test]
async fn open_then_edit_groups_over_http() {
    let (service, _, _) = build_service();
    let router = form_router(service);

    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/forms",
            json!({ "kind": "resume" }),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    let form_id = body["form_id"].as_str().expect("form id").to_string();
    assert_eq!(body["kind"], "resume");
    assert_eq!(body["fields"]["skills"], json!([""]));

    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            &format!("/api/v1/forms/{form_id}/events"),
            json!({ "event": "add_entry", "field": "projects" }),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["fields"]["projects"].as_array().map(Vec::len), Some(2));

    let response = router
        .oneshot(json_request(
            Method::POST,
            &format!("/api/v1/forms/{form_id}/events"),
            json!({ "event": "remove_entry", "field": "skills", "index": 0 }),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn attachment_upload_and_submission_over_http() {
    let (service, _, transport) = build_service();
    let form_id = service
        .open(crate::forms::FormKind::Acceptance)
        .expect("opened")
        .form_id
        .0;
    let router = form_router(service);

    let oversized = Request::builder()
        .method(Method::PUT)
        .uri(format!("/api/v1/forms/{form_id}/attachment?file_name=offer.pdf"))
        .header(header::CONTENT_TYPE, "application/pdf")
        .body(Body::from(vec![0u8; 262_145]))
        .expect("request builds");
    let response = router.clone().oneshot(oversized).await.expect("router responds");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let upload = Request::builder()
        .method(Method::PUT)
        .uri(format!("/api/v1/forms/{form_id}/attachment?file_name=offer.pdf"))
        .header(header::CONTENT_TYPE, "application/pdf")
        .body(Body::from(vec![0u8; 4096]))
        .expect("request builds");
    let response = router.clone().oneshot(upload).await.expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["attachment"]["file_name"], "offer.pdf");
    assert_eq!(body["attachment"]["size"], 4096);

    let submit = |router: axum::Router| {
        let uri = format!("/api/v1/forms/{form_id}/submit");
        async move {
            router
                .oneshot(
                    Request::builder()
                        .method(Method::POST)
                        .uri(uri)
                        .body(Body::empty())
                        .expect("request builds"),
                )
                .await
                .expect("router responds")
        }
    };

    let response = submit(router.clone()).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["failures"][0]["kind"], "missing_primary_choice");

    for event in [
        json!({ "event": "set_scalar", "field": "select_option", "value": "inHouse" }),
        json!({ "event": "set_scalar", "field": "company_name", "value": "Google" }),
        json!({ "event": "set_scalar", "field": "job_type", "value": "good" }),
    ] {
        let response = router
            .clone()
            .oneshot(json_request(
                Method::POST,
                &format!("/api/v1/forms/{form_id}/events"),
                event,
            ))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = submit(router.clone()).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = read_json_body(response).await;
    assert_eq!(body["attachment_bytes"], 4096);
    assert_eq!(transport.delivered().len(), 1);

    let response = submit(router).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_form_returns_not_found() {
    let (service, _, _) = build_service();
    let response = form_router(service)
        .oneshot(
            Request::builder()
                .uri("/api/v1/forms/form-unknown")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn failed_delivery_maps_to_bad_gateway_and_stays_pending() {
    let (_, resources) = previews();
    let service = Arc::new(FormIntakeService::new(
        IntakeConfig::default(),
        resources,
        Arc::new(OfflineTransport),
    ));
    let form_id = service
        .open(crate::forms::FormKind::Application)
        .expect("opened")
        .form_id
        .0;
    let router = form_router(service);

    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            &format!("/api/v1/forms/{form_id}/events"),
            json!({ "event": "set_scalar", "field": "job_name", "value": "Data Scientist" }),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(format!("/api/v1/forms/{form_id}/submit"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let response = router
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/forms/{form_id}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "submitted");
    assert_eq!(body["delivery_pending"], true);
}
