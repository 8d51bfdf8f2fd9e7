use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the contest live backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::websocket::ws_handler,
        crate::routes::contest::contest_status,
        crate::routes::contest::submit_solution,
        crate::routes::contest::request_retry,
        crate::routes::admin::pause_contest,
        crate::routes::admin::resume_contest,
        crate::routes::admin::extend_contest,
        crate::routes::admin::freeze_contest,
        crate::routes::admin::unfreeze_contest,
        crate::routes::admin::block_team,
        crate::routes::admin::unblock_team,
        crate::routes::admin::allow_resubmission,
        crate::routes::jury::queue,
        crate::routes::jury::grade_submission,
        crate::routes::jury::resolve_retry,
        crate::routes::internal::ingress,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::contest::ContestSummary,
            crate::dto::contest::TeamSummary,
            crate::dto::contest::SubmitRequest,
            crate::dto::contest::RetryRequestBody,
            crate::dto::contest::SubmissionSummary,
            crate::dto::admin::ExtendContestRequest,
            crate::dto::admin::GradeRequest,
            crate::dto::admin::RetryDecisionRequest,
            crate::dto::admin::IngressResponse,
            crate::dto::admin::QueueEntry,
            crate::dto::events::EventKind,
            crate::dto::events::WireEvent,
            crate::state::clock::ContestStatus,
            crate::dao::models::SubmissionStatus,
            crate::dao::models::RetryStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "contest", description = "Participant-facing contest operations"),
        (name = "admin", description = "Contest control actions"),
        (name = "jury", description = "Grading and retry resolution"),
        (name = "broadcast", description = "Real-time viewer stream and ingress"),
    )
)]
pub struct ApiDoc;
