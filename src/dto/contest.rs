use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{ContestEntity, RetryStatus, SubmissionEntity, SubmissionStatus, TeamEntity},
    dto::format_system_time,
    state::clock::{self, ContestStatus},
};

/// Snapshot of a contest returned by read endpoints and action responses.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ContestSummary {
    /// Contest identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Start instant (RFC 3339).
    pub start_time: String,
    /// End instant (RFC 3339).
    pub end_time: String,
    /// Pause flag.
    pub is_paused: bool,
    /// Pause start (RFC 3339), when paused.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paused_at: Option<String>,
    /// Leaderboard freeze flag.
    pub is_frozen: bool,
    /// Status resolved at response time.
    pub status: ContestStatus,
    /// Milliseconds of contest time left at response time.
    pub remaining_ms: u64,
}

impl ContestSummary {
    /// Project an entity onto the response shape, resolving status at `now`.
    pub fn from_entity(contest: &ContestEntity, now: SystemTime) -> Self {
        Self {
            id: contest.id,
            name: contest.name.clone(),
            start_time: format_system_time(contest.start_time),
            end_time: format_system_time(contest.end_time),
            is_paused: contest.is_paused,
            paused_at: contest.paused_at.map(format_system_time),
            is_frozen: contest.is_frozen,
            status: clock::resolve_status(contest, now),
            remaining_ms: clock::remaining_ms(contest, now),
        }
    }
}

/// Team snapshot exposed to admin responses.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeamSummary {
    /// Team identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Kill-switch state.
    pub is_blocked: bool,
}

impl From<TeamEntity> for TeamSummary {
    fn from(team: TeamEntity) -> Self {
        Self {
            id: team.id,
            name: team.name,
            is_blocked: team.is_blocked,
        }
    }
}

/// Request body for submitting a solution.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SubmitRequest {
    /// Problem the solution targets.
    #[validate(length(min = 1, max = 64))]
    pub problem_id: String,
}

/// Request body for filing a retry request after a rejection.
///
/// The configured minimum reason length is enforced in the service layer;
/// the derive only rules out the trivially empty case.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RetryRequestBody {
    /// Free-text justification for the retry.
    #[validate(length(min = 1))]
    pub reason: String,
}

/// Submission snapshot returned by submit/grade/retry endpoints.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubmissionSummary {
    /// Submission identifier.
    pub id: Uuid,
    /// Owning team.
    pub team_id: Uuid,
    /// Target problem.
    pub problem_id: String,
    /// Current verdict.
    pub status: SubmissionStatus,
    /// Whether a resubmission is currently allowed.
    pub can_retry: bool,
    /// Retry resolution state, when a request exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_status: Option<RetryStatus>,
    /// Creation instant (RFC 3339).
    pub submitted_at: String,
    /// Last mutation instant (RFC 3339).
    pub updated_at: String,
}

impl From<SubmissionEntity> for SubmissionSummary {
    fn from(submission: SubmissionEntity) -> Self {
        Self {
            id: submission.id,
            team_id: submission.team_id,
            problem_id: submission.problem_id,
            status: submission.status,
            can_retry: submission.can_retry,
            retry_status: submission.retry.as_ref().map(|retry| retry.status),
            submitted_at: format_system_time(submission.submitted_at),
            updated_at: format_system_time(submission.updated_at),
        }
    }
}
