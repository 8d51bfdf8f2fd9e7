use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::Caller,
    dto::contest::{ContestSummary, RetryRequestBody, SubmissionSummary, SubmitRequest},
    error::AppError,
    services::{contest_service, submission_service},
    state::SharedState,
};

/// Participant-facing contest endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/contests/{id}/status", get(contest_status))
        .route("/contests/{id}/submissions", post(submit_solution))
        .route("/submissions/{id}/retry-request", post(request_retry))
}

/// Public contest snapshot with resolved status and remaining time.
#[utoipa::path(
    get,
    path = "/contests/{id}/status",
    tag = "contest",
    params(("id" = Uuid, Path, description = "Contest identifier")),
    responses(
        (status = 200, description = "Current contest state", body = ContestSummary),
        (status = 404, description = "Unknown contest"),
    )
)]
pub async fn contest_status(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ContestSummary>, AppError> {
    Ok(Json(contest_service::contest_status(&state, id).await?))
}

/// Submit a solution for grading.
#[utoipa::path(
    post,
    path = "/contests/{id}/submissions",
    tag = "contest",
    params(("id" = Uuid, Path, description = "Contest identifier")),
    request_body = SubmitRequest,
    responses(
        (status = 200, description = "Submission accepted", body = SubmissionSummary),
        (status = 403, description = "Denied by the access gate"),
        (status = 503, description = "Storage unavailable"),
    )
)]
pub async fn submit_solution(
    State(state): State<SharedState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(body): Json<SubmitRequest>,
) -> Result<Json<SubmissionSummary>, AppError> {
    body.validate()?;
    let summary = submission_service::submit(&state, &caller, id, body.problem_id).await?;
    Ok(Json(summary))
}

/// File a retry request on a rejected submission.
#[utoipa::path(
    post,
    path = "/submissions/{id}/retry-request",
    tag = "contest",
    params(("id" = Uuid, Path, description = "Submission identifier")),
    request_body = RetryRequestBody,
    responses(
        (status = 200, description = "Retry request filed", body = SubmissionSummary),
        (status = 400, description = "Reason too short"),
        (status = 409, description = "Submission is not rejected or already has a request"),
    )
)]
pub async fn request_retry(
    State(state): State<SharedState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(body): Json<RetryRequestBody>,
) -> Result<Json<SubmissionSummary>, AppError> {
    body.validate()?;
    let summary = submission_service::request_retry(&state, &caller, id, body.reason).await?;
    Ok(Json(summary))
}
