use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use uuid::Uuid;

use crate::{
    auth::Caller,
    dto::{
        admin::ExtendContestRequest,
        contest::{ContestSummary, SubmissionSummary, TeamSummary},
    },
    error::AppError,
    services::{contest_service, grading_service},
    state::SharedState,
};

/// Admin-only contest control endpoints. Role enforcement happens in the
/// service layer against the caller headers.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/admin/contests/{id}/pause", post(pause_contest))
        .route("/admin/contests/{id}/resume", post(resume_contest))
        .route("/admin/contests/{id}/extend", post(extend_contest))
        .route("/admin/contests/{id}/freeze", post(freeze_contest))
        .route("/admin/contests/{id}/unfreeze", post(unfreeze_contest))
        .route("/admin/teams/{id}/block", post(block_team))
        .route("/admin/teams/{id}/unblock", post(unblock_team))
        .route(
            "/admin/submissions/{id}/allow-resubmission",
            post(allow_resubmission),
        )
}

/// Pause the contest clock.
#[utoipa::path(
    post,
    path = "/admin/contests/{id}/pause",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Contest identifier")),
    responses(
        (status = 200, description = "Contest paused", body = ContestSummary),
        (status = 401, description = "Caller is not an admin"),
    )
)]
pub async fn pause_contest(
    State(state): State<SharedState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<ContestSummary>, AppError> {
    Ok(Json(
        contest_service::pause_contest(&state, &caller, id).await?,
    ))
}

/// Resume a paused contest.
#[utoipa::path(
    post,
    path = "/admin/contests/{id}/resume",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Contest identifier")),
    responses((status = 200, description = "Contest resumed", body = ContestSummary))
)]
pub async fn resume_contest(
    State(state): State<SharedState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<ContestSummary>, AppError> {
    Ok(Json(
        contest_service::resume_contest(&state, &caller, id).await?,
    ))
}

/// Extend the contest end time.
#[utoipa::path(
    post,
    path = "/admin/contests/{id}/extend",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Contest identifier")),
    request_body = ExtendContestRequest,
    responses(
        (status = 200, description = "Contest extended", body = ContestSummary),
        (status = 400, description = "Extension out of bounds"),
    )
)]
pub async fn extend_contest(
    State(state): State<SharedState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(body): Json<ExtendContestRequest>,
) -> Result<Json<ContestSummary>, AppError> {
    Ok(Json(
        contest_service::extend_contest(&state, &caller, id, body.minutes).await?,
    ))
}

/// Freeze the public leaderboard.
#[utoipa::path(
    post,
    path = "/admin/contests/{id}/freeze",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Contest identifier")),
    responses((status = 200, description = "Leaderboard frozen", body = ContestSummary))
)]
pub async fn freeze_contest(
    State(state): State<SharedState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<ContestSummary>, AppError> {
    Ok(Json(
        contest_service::freeze_contest(&state, &caller, id).await?,
    ))
}

/// Lift a leaderboard freeze.
#[utoipa::path(
    post,
    path = "/admin/contests/{id}/unfreeze",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Contest identifier")),
    responses((status = 200, description = "Leaderboard unfrozen", body = ContestSummary))
)]
pub async fn unfreeze_contest(
    State(state): State<SharedState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<ContestSummary>, AppError> {
    Ok(Json(
        contest_service::unfreeze_contest(&state, &caller, id).await?,
    ))
}

/// Block a team from submitting.
#[utoipa::path(
    post,
    path = "/admin/teams/{id}/block",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Team identifier")),
    responses((status = 200, description = "Team blocked", body = TeamSummary))
)]
pub async fn block_team(
    State(state): State<SharedState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<TeamSummary>, AppError> {
    let team = contest_service::set_team_blocked(&state, &caller, id, true).await?;
    Ok(Json(team.into()))
}

/// Lift a team block.
#[utoipa::path(
    post,
    path = "/admin/teams/{id}/unblock",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Team identifier")),
    responses((status = 200, description = "Team unblocked", body = TeamSummary))
)]
pub async fn unblock_team(
    State(state): State<SharedState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<TeamSummary>, AppError> {
    let team = contest_service::set_team_blocked(&state, &caller, id, false).await?;
    Ok(Json(team.into()))
}

/// Unlock a resubmission on a settled submission without a retry request.
#[utoipa::path(
    post,
    path = "/admin/submissions/{id}/allow-resubmission",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Submission identifier")),
    responses(
        (status = 200, description = "Resubmission allowed", body = SubmissionSummary),
        (status = 409, description = "Submission is not settled"),
    )
)]
pub async fn allow_resubmission(
    State(state): State<SharedState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<SubmissionSummary>, AppError> {
    Ok(Json(
        grading_service::allow_resubmission(&state, &caller, id).await?,
    ))
}
