use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::authority::AuthorityError;
use super::domain::{Application, ApplicationId, PersonDraft};
use super::repository::{ApplicationStore, AuditStore, PersonStore, SsnStore};
use super::service::{IssuanceWorkflow, WorkflowError};

/// Sanitized application representation for HTTP responses. The assigned
/// number is always masked; the full value never leaves the service here.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationView {
    pub application_id: u64,
    pub reference: String,
    pub person_id: u64,
    pub status: &'static str,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssn: Option<String>,
}

impl From<&Application> for ApplicationView {
    fn from(application: &Application) -> Self {
        Self {
            application_id: application.id.0,
            reference: application.reference.clone(),
            person_id: application.person_id.0,
            status: application.status.label(),
            submitted_at: application.submitted_at,
            reviewed_at: application.reviewed_at,
            reviewed_by: application.reviewed_by.clone(),
            review_notes: application.review_notes.clone(),
            ssn: application.assigned_ssn.as_ref().map(|ssn| ssn.masked()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReviewRequest {
    reviewer: String,
    #[serde(default)]
    reason: Option<String>,
}

/// Router builder exposing the issuance workflow over HTTP.
pub fn issuance_router<P, A, S, L>(workflow: Arc<IssuanceWorkflow<P, A, S, L>>) -> Router
where
    P: PersonStore + 'static,
    A: ApplicationStore + 'static,
    S: SsnStore + 'static,
    L: AuditStore + 'static,
{
    Router::new()
        .route("/api/v1/applications", post(submit_handler::<P, A, S, L>))
        .route(
            "/api/v1/applications/pending",
            get(pending_handler::<P, A, S, L>),
        )
        .route(
            "/api/v1/applications/reference/:reference",
            get(reference_handler::<P, A, S, L>),
        )
        .route(
            "/api/v1/applications/:application_id/approve",
            post(approve_handler::<P, A, S, L>),
        )
        .route(
            "/api/v1/applications/:application_id/reject",
            post(reject_handler::<P, A, S, L>),
        )
        .route("/api/v1/ssn/:ssn", get(lookup_handler::<P, A, S, L>))
        .with_state(workflow)
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, axum::Json(json!({ "error": message }))).into_response()
}

fn workflow_error_response(error: WorkflowError) -> Response {
    let status = match &error {
        WorkflowError::Registry(_) | WorkflowError::NotEligible => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        WorkflowError::AlreadyHasSsn
        | WorkflowError::DuplicatePendingApplication
        | WorkflowError::ResubmissionClosed
        | WorkflowError::NotPending => StatusCode::CONFLICT,
        WorkflowError::NotFound => StatusCode::NOT_FOUND,
        WorkflowError::Issuance(AuthorityError::ExhaustedSpace { .. }) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        WorkflowError::Issuance(_) | WorkflowError::Repository(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, error.to_string())
}

async fn submit_handler<P, A, S, L>(
    State(workflow): State<Arc<IssuanceWorkflow<P, A, S, L>>>,
    axum::Json(applicant): axum::Json<PersonDraft>,
) -> Response
where
    P: PersonStore + 'static,
    A: ApplicationStore + 'static,
    S: SsnStore + 'static,
    L: AuditStore + 'static,
{
    match workflow.submit(applicant) {
        Ok(application) => {
            let view = ApplicationView::from(&application);
            (StatusCode::CREATED, axum::Json(view)).into_response()
        }
        Err(error) => workflow_error_response(error),
    }
}

async fn approve_handler<P, A, S, L>(
    State(workflow): State<Arc<IssuanceWorkflow<P, A, S, L>>>,
    Path(application_id): Path<u64>,
    axum::Json(request): axum::Json<ReviewRequest>,
) -> Response
where
    P: PersonStore + 'static,
    A: ApplicationStore + 'static,
    S: SsnStore + 'static,
    L: AuditStore + 'static,
{
    match workflow.approve(ApplicationId(application_id), &request.reviewer) {
        Ok(application) => {
            let view = ApplicationView::from(&application);
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(error) => workflow_error_response(error),
    }
}

async fn reject_handler<P, A, S, L>(
    State(workflow): State<Arc<IssuanceWorkflow<P, A, S, L>>>,
    Path(application_id): Path<u64>,
    axum::Json(request): axum::Json<ReviewRequest>,
) -> Response
where
    P: PersonStore + 'static,
    A: ApplicationStore + 'static,
    S: SsnStore + 'static,
    L: AuditStore + 'static,
{
    let reason = request.reason.unwrap_or_else(|| "unspecified".to_string());
    match workflow.reject(ApplicationId(application_id), &reason, &request.reviewer) {
        Ok(application) => {
            let view = ApplicationView::from(&application);
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(error) => workflow_error_response(error),
    }
}

async fn pending_handler<P, A, S, L>(
    State(workflow): State<Arc<IssuanceWorkflow<P, A, S, L>>>,
) -> Response
where
    P: PersonStore + 'static,
    A: ApplicationStore + 'static,
    S: SsnStore + 'static,
    L: AuditStore + 'static,
{
    match workflow.pending() {
        Ok(applications) => {
            let views: Vec<ApplicationView> =
                applications.iter().map(ApplicationView::from).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => workflow_error_response(error),
    }
}

async fn reference_handler<P, A, S, L>(
    State(workflow): State<Arc<IssuanceWorkflow<P, A, S, L>>>,
    Path(reference): Path<String>,
) -> Response
where
    P: PersonStore + 'static,
    A: ApplicationStore + 'static,
    S: SsnStore + 'static,
    L: AuditStore + 'static,
{
    match workflow.by_reference(&reference) {
        Ok(application) => {
            let view = ApplicationView::from(&application);
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(error) => workflow_error_response(error),
    }
}

async fn lookup_handler<P, A, S, L>(
    State(workflow): State<Arc<IssuanceWorkflow<P, A, S, L>>>,
    Path(ssn): Path<String>,
) -> Response
where
    P: PersonStore + 'static,
    A: ApplicationStore + 'static,
    S: SsnStore + 'static,
    L: AuditStore + 'static,
{
    match workflow.authority().lookup(&ssn) {
        Ok(record) => {
            let payload = json!({
                "ssn": record.ssn.masked(),
                "person_id": record.person_id.0,
                "status": record.status.label(),
                "issued_at": record.issued_at,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(AuthorityError::NotFound) => {
            error_response(StatusCode::NOT_FOUND, "number not found".to_string())
        }
        Err(error) => error_response(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    }
}
