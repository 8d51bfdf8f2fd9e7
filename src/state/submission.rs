//! Grading and retry workflow state machine for a single submission.
//!
//! Operates on a value extracted from [`SubmissionEntity`] so services can
//! validate a transition, persist the result through a compare-and-swap
//! replace, and only then broadcast.

use thiserror::Error;

use crate::dao::models::{
    AuditAction, RetryRequestEntity, RetryStatus, SubmissionEntity, SubmissionStatus,
};

/// Verdict a jury member can assign while grading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Solution is correct.
    Accepted,
    /// Solution is incorrect.
    Rejected,
    /// Needs a closer look before settling.
    UnderReview,
}

impl From<Verdict> for SubmissionStatus {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Accepted => SubmissionStatus::Accepted,
            Verdict::Rejected => SubmissionStatus::Rejected,
            Verdict::UnderReview => SubmissionStatus::UnderReview,
        }
    }
}

/// Events that can be applied to a submission's workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    /// Jury grades the submission.
    Grade {
        /// Verdict to record.
        verdict: Verdict,
        /// Whether a rejection leaves the retry door open.
        can_retry: bool,
    },
    /// Team asks for another chance after a rejection.
    RequestRetry {
        /// Free-text justification (already length-validated).
        reason: String,
    },
    /// Jury grants the pending retry request.
    GrantRetry,
    /// Jury denies the pending retry request.
    DenyRetry,
    /// Administrator override unlocking a resubmission directly.
    AllowResubmission,
}

impl WorkflowEvent {
    /// Audit log action corresponding to this event.
    pub fn audit_action(&self) -> AuditAction {
        match self {
            Self::Grade { .. } => AuditAction::SubmissionGraded,
            Self::RequestRetry { .. } => AuditAction::RetryRequested,
            Self::GrantRetry => AuditAction::RetryGranted,
            Self::DenyRetry => AuditAction::RetryDenied,
            Self::AllowResubmission => AuditAction::ResubmissionAllowed,
        }
    }
}

/// Error returned when an event cannot be applied to the current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while {status:?} (retry {retry:?})")]
pub struct InvalidTransition {
    /// Status the submission held when the event arrived.
    pub status: SubmissionStatus,
    /// Retry resolution state at that moment.
    pub retry: Option<RetryStatus>,
    /// The offending event.
    pub event: WorkflowEvent,
}

/// Apply `event` to `submission` in place, at `now`.
///
/// On success the caller owns persisting the mutated entity together with
/// the matching audit entry; the entity is untouched on error.
pub fn apply_event(
    submission: &mut SubmissionEntity,
    event: WorkflowEvent,
    now: std::time::SystemTime,
) -> Result<(), InvalidTransition> {
    fn invalid(submission: &SubmissionEntity, event: WorkflowEvent) -> InvalidTransition {
        InvalidTransition {
            status: submission.status,
            retry: submission.retry.as_ref().map(|retry| retry.status),
            event,
        }
    }

    match event {
        WorkflowEvent::Grade { verdict, can_retry } => {
            // Terminal verdicts cannot be re-graded; UNDER_REVIEW may settle.
            if submission.status.is_terminal() {
                return Err(invalid(
                    submission,
                    WorkflowEvent::Grade { verdict, can_retry },
                ));
            }
            submission.status = verdict.into();
            submission.can_retry = matches!(verdict, Verdict::Rejected) && can_retry;
        }
        WorkflowEvent::RequestRetry { reason } => {
            if submission.status != SubmissionStatus::Rejected || submission.retry.is_some() {
                return Err(invalid(submission, WorkflowEvent::RequestRetry { reason }));
            }
            submission.retry = Some(RetryRequestEntity {
                reason,
                status: RetryStatus::Requested,
                requested_at: now,
            });
        }
        WorkflowEvent::GrantRetry => {
            match submission.retry.as_mut() {
                Some(retry) if retry.status == RetryStatus::Requested => {
                    retry.status = RetryStatus::Granted;
                }
                _ => return Err(invalid(submission, WorkflowEvent::GrantRetry)),
            }
            submission.can_retry = true;
        }
        WorkflowEvent::DenyRetry => {
            match submission.retry.as_mut() {
                Some(retry) if retry.status == RetryStatus::Requested => {
                    retry.status = RetryStatus::Denied;
                }
                _ => return Err(invalid(submission, WorkflowEvent::DenyRetry)),
            }
            submission.can_retry = false;
        }
        WorkflowEvent::AllowResubmission => {
            if !submission.status.is_terminal() {
                return Err(invalid(submission, WorkflowEvent::AllowResubmission));
            }
            submission.can_retry = true;
        }
    }

    submission.updated_at = now;
    Ok(())
}
