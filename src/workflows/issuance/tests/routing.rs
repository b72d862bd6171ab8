use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use super::common::{draft, fixture, MemoryWorkflow};
use crate::workflows::issuance::domain::ApplicationId;
use crate::workflows::issuance::router::issuance_router;

async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

fn submit_payload() -> Value {
    serde_json::to_value(draft()).expect("draft serializes")
}

fn router() -> (axum::Router, Arc<MemoryWorkflow>) {
    let workflow = Arc::new(fixture().workflow);
    (issuance_router(workflow.clone()), workflow)
}

async fn post_json(app: &axum::Router, uri: &str, payload: &Value) -> Response {
    app.clone()
        .oneshot(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .expect("request builds"),
        )
        .await
        .expect("handler responds")
}

async fn get(app: &axum::Router, uri: &str) -> Response {
    app.clone()
        .oneshot(Request::get(uri).body(Body::empty()).expect("request builds"))
        .await
        .expect("handler responds")
}

#[tokio::test]
async fn submit_returns_created_with_a_pending_view() {
    let (app, _) = router();

    let response = post_json(&app, "/api/v1/applications", &submit_payload()).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], "pending");
    assert!(payload["reference"]
        .as_str()
        .expect("reference present")
        .starts_with("APP-"));
    assert!(payload.get("ssn").is_none());
}

#[tokio::test]
async fn submit_rejects_incomplete_applicants() {
    let (app, _) = router();

    let mut payload = submit_payload();
    payload["last_name"] = json!("");
    let response = post_json(&app, "/api/v1/applications", &payload).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = read_json_body(response).await;
    assert!(body["error"]
        .as_str()
        .expect("error message")
        .contains("last_name"));
}

#[tokio::test]
async fn repeat_review_maps_to_conflict() {
    let (app, _) = router();

    let created = post_json(&app, "/api/v1/applications", &submit_payload()).await;
    assert_eq!(created.status(), StatusCode::CREATED);

    let pending = get(&app, "/api/v1/applications/pending").await;
    let listing = read_json_body(pending).await;
    let application_id = listing[0]["application_id"].as_u64().expect("id");

    let review = json!({ "reviewer": "admin1" });
    let approve_uri = format!("/api/v1/applications/{application_id}/approve");
    let first_approval = post_json(&app, &approve_uri, &review).await;
    assert_eq!(first_approval.status(), StatusCode::OK);

    let second_approval = post_json(&app, &approve_uri, &review).await;
    assert_eq!(second_approval.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn approval_masks_the_assigned_number() {
    let (app, _) = router();

    let created = post_json(&app, "/api/v1/applications", &submit_payload()).await;
    let created = read_json_body(created).await;
    let application_id = created["application_id"].as_u64().expect("id");

    let review = json!({ "reviewer": "admin1" });
    let response = post_json(
        &app,
        &format!("/api/v1/applications/{application_id}/approve"),
        &review,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], "approved");
    let masked = payload["ssn"].as_str().expect("masked number");
    assert!(masked.starts_with("***-**-"));
    assert_eq!(masked.len(), 11);
}

#[tokio::test]
async fn reject_records_reason_and_reviewer() {
    let (app, _) = router();

    let created = post_json(&app, "/api/v1/applications", &submit_payload()).await;
    let application_id = read_json_body(created).await["application_id"]
        .as_u64()
        .expect("id");

    let review = json!({ "reviewer": "admin1", "reason": "documentation missing" });
    let response = post_json(
        &app,
        &format!("/api/v1/applications/{application_id}/reject"),
        &review,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], "rejected");
    assert_eq!(payload["review_notes"], "documentation missing");
    assert_eq!(payload["reviewed_by"], "admin1");
}

#[tokio::test]
async fn reference_lookup_round_trips() {
    let (app, _) = router();

    let created = post_json(&app, "/api/v1/applications", &submit_payload()).await;
    let reference = read_json_body(created).await["reference"]
        .as_str()
        .expect("reference")
        .to_string();

    let response = get(&app, &format!("/api/v1/applications/reference/{reference}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await["reference"], reference);

    let missing = get(&app, "/api/v1/applications/reference/APP-2026-ZZZZZZ").await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn review_of_unknown_application_is_not_found() {
    let (app, _) = router();

    let review = json!({ "reviewer": "admin1" });
    let response = post_json(&app, "/api/v1/applications/424242/approve", &review).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn ssn_lookup_returns_masked_view_or_miss() {
    let (app, workflow) = router();

    let created = post_json(&app, "/api/v1/applications", &submit_payload()).await;
    let application_id = read_json_body(created).await["application_id"]
        .as_u64()
        .expect("id");
    let approved = workflow
        .approve(ApplicationId(application_id), "admin1")
        .expect("approves");
    let ssn = approved.assigned_ssn.expect("number assigned");

    let response = get(&app, &format!("/api/v1/ssn/{}", ssn.digits())).await;
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["ssn"], ssn.masked());
    assert_eq!(payload["status"], "active");

    let miss = get(&app, "/api/v1/ssn/000-00-0000").await;
    assert_eq!(miss.status(), StatusCode::NOT_FOUND);

    let malformed = get(&app, "/api/v1/ssn/garbage").await;
    assert_eq!(malformed.status(), StatusCode::NOT_FOUND);
}
