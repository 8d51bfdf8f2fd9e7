use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    dao::models::{SubmissionEntity, SubmissionStatus},
    dto::format_system_time,
    state::submission::Verdict,
};

/// Request body for extending a running contest.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ExtendContestRequest {
    /// Additional minutes appended to the end time. Bounds are checked
    /// against the configured maximum single extension.
    pub minutes: u64,
}

/// Verdict choices exposed to the jury grading endpoint.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictRequest {
    /// Mark the submission correct.
    Accepted,
    /// Mark the submission incorrect.
    Rejected,
    /// Park the submission for closer inspection.
    UnderReview,
}

impl From<VerdictRequest> for Verdict {
    fn from(verdict: VerdictRequest) -> Self {
        match verdict {
            VerdictRequest::Accepted => Verdict::Accepted,
            VerdictRequest::Rejected => Verdict::Rejected,
            VerdictRequest::UnderReview => Verdict::UnderReview,
        }
    }
}

/// Request body for grading a submission.
#[derive(Debug, Deserialize, ToSchema)]
pub struct GradeRequest {
    /// Verdict to record.
    pub verdict: VerdictRequest,
    /// Whether a rejection leaves the retry door open.
    #[serde(default)]
    pub can_retry: bool,
}

/// Request body for resolving a pending retry request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RetryDecisionRequest {
    /// `true` grants the resubmission, `false` denies it.
    pub grant: bool,
}

/// Response to the administrative broadcast ingress.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IngressResponse {
    /// Whether the event was accepted and fanned out.
    pub success: bool,
    /// Number of connections the event was delivered to.
    pub client_count: usize,
}

/// Jury queue entry listing a submission awaiting a verdict.
#[derive(Debug, Serialize, ToSchema)]
pub struct QueueEntry {
    /// Submission identifier.
    pub submission_id: uuid::Uuid,
    /// Owning team.
    pub team_id: uuid::Uuid,
    /// Target problem.
    pub problem_id: String,
    /// Current verdict (PENDING or UNDER_REVIEW).
    pub status: SubmissionStatus,
    /// Creation instant (RFC 3339); the queue is ordered by it.
    pub submitted_at: String,
}

impl From<SubmissionEntity> for QueueEntry {
    fn from(submission: SubmissionEntity) -> Self {
        Self {
            submission_id: submission.id,
            team_id: submission.team_id,
            problem_id: submission.problem_id,
            status: submission.status,
            submitted_at: format_system_time(submission.submitted_at),
        }
    }
}
