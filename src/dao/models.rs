use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Contest record persisted by the storage layer.
///
/// `is_paused` and `paused_at` always change together through a
/// compare-and-swap replace keyed on `version`, so readers never observe a
/// half-updated pause state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContestEntity {
    /// Primary key of the contest.
    pub id: Uuid,
    /// Display name shown to participants.
    pub name: String,
    /// Instant the contest opens for submissions.
    pub start_time: SystemTime,
    /// Instant the contest stops accepting submissions.
    pub end_time: SystemTime,
    /// Whether an administrator has paused the contest.
    pub is_paused: bool,
    /// Instant the current pause began; present iff `is_paused` is true.
    pub paused_at: Option<SystemTime>,
    /// Whether the public leaderboard is frozen.
    pub is_frozen: bool,
    /// Optimistic concurrency token, bumped on every replace.
    pub version: u32,
}

/// Team record with the administrator kill switch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamEntity {
    /// Primary key of the team.
    pub id: Uuid,
    /// Display name chosen by the team.
    pub name: String,
    /// Administrator kill switch; never set automatically.
    pub is_blocked: bool,
    /// Optimistic concurrency token.
    pub version: u32,
}

/// Verdict assigned to a submission by the jury.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    /// Awaiting a grading decision.
    Pending,
    /// Graded as correct.
    Accepted,
    /// Graded as incorrect.
    Rejected,
    /// Pulled aside for closer jury inspection.
    UnderReview,
}

impl SubmissionStatus {
    /// Whether this status represents a settled grading decision.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected)
    }
}

/// Resolution state of a retry request attached to a rejected submission.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetryStatus {
    /// The team asked for another chance; awaiting a jury decision.
    Requested,
    /// The jury granted a resubmission.
    Granted,
    /// The jury denied a resubmission.
    Denied,
}

/// Retry request embedded in its submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryRequestEntity {
    /// Free-text justification supplied by the team.
    pub reason: String,
    /// Current resolution state.
    pub status: RetryStatus,
    /// Instant the request was filed.
    pub requested_at: SystemTime,
}

/// Submission record persisted by the storage layer.
///
/// Submissions are never deleted by the grading workflow; deletion is an
/// administrative data-management action outside this service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmissionEntity {
    /// Primary key of the submission.
    pub id: Uuid,
    /// Team that submitted the solution.
    pub team_id: Uuid,
    /// Problem the solution targets.
    pub problem_id: String,
    /// Current grading verdict.
    pub status: SubmissionStatus,
    /// Whether the team may submit again for the same problem.
    pub can_retry: bool,
    /// Retry request, if the team filed one.
    pub retry: Option<RetryRequestEntity>,
    /// Instant the submission was created.
    pub submitted_at: SystemTime,
    /// Instant the submission was last mutated.
    pub updated_at: SystemTime,
    /// Optimistic concurrency token.
    pub version: u32,
}

/// Kind of action recorded in the audit log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// Jury assigned a verdict to a submission.
    SubmissionGraded,
    /// Team requested another chance after a rejection.
    RetryRequested,
    /// Jury granted a retry request.
    RetryGranted,
    /// Jury denied a retry request.
    RetryDenied,
    /// Administrator override allowing a resubmission.
    ResubmissionAllowed,
}

/// Immutable audit log entry, committed atomically with the submission
/// mutation it records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditEntryEntity {
    /// Primary key of the entry.
    pub id: Uuid,
    /// What happened.
    pub action: AuditAction,
    /// Identifier of the acting user.
    pub actor_id: Uuid,
    /// Role the actor held when performing the action.
    pub actor_role: String,
    /// Affected submission, when applicable.
    pub submission_id: Option<Uuid>,
    /// Affected contest, when applicable.
    pub contest_id: Option<Uuid>,
    /// Optional free-form detail (verdict, reason excerpt).
    pub detail: Option<String>,
    /// Instant the action was recorded.
    pub at: SystemTime,
}
