use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    auth::Caller,
    dto::{
        admin::{GradeRequest, QueueEntry, RetryDecisionRequest},
        contest::SubmissionSummary,
    },
    error::AppError,
    services::grading_service,
    state::SharedState,
};

/// Jury-only grading endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/jury/queue", get(queue))
        .route("/jury/submissions/{id}/grade", post(grade_submission))
        .route("/jury/submissions/{id}/retry", post(resolve_retry))
}

/// Submissions awaiting a verdict, oldest first.
#[utoipa::path(
    get,
    path = "/jury/queue",
    tag = "jury",
    responses((status = 200, description = "Pending submissions", body = [QueueEntry]))
)]
pub async fn queue(
    State(state): State<SharedState>,
    caller: Caller,
) -> Result<Json<Vec<QueueEntry>>, AppError> {
    Ok(Json(grading_service::jury_queue(&state, &caller).await?))
}

/// Record a verdict on a submission.
#[utoipa::path(
    post,
    path = "/jury/submissions/{id}/grade",
    tag = "jury",
    params(("id" = Uuid, Path, description = "Submission identifier")),
    request_body = GradeRequest,
    responses(
        (status = 200, description = "Verdict recorded", body = SubmissionSummary),
        (status = 409, description = "Submission already settled"),
    )
)]
pub async fn grade_submission(
    State(state): State<SharedState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(body): Json<GradeRequest>,
) -> Result<Json<SubmissionSummary>, AppError> {
    let summary =
        grading_service::grade(&state, &caller, id, body.verdict.into(), body.can_retry).await?;
    Ok(Json(summary))
}

/// Grant or deny a pending retry request.
#[utoipa::path(
    post,
    path = "/jury/submissions/{id}/retry",
    tag = "jury",
    params(("id" = Uuid, Path, description = "Submission identifier")),
    request_body = RetryDecisionRequest,
    responses(
        (status = 200, description = "Retry request settled", body = SubmissionSummary),
        (status = 409, description = "No pending retry request"),
    )
)]
pub async fn resolve_retry(
    State(state): State<SharedState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(body): Json<RetryDecisionRequest>,
) -> Result<Json<SubmissionSummary>, AppError> {
    Ok(Json(
        grading_service::resolve_retry(&state, &caller, id, body.grant).await?,
    ))
}
