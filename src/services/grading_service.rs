//! Jury-side grading, retry resolution and the admin resubmission override.

use tracing::info;
use uuid::Uuid;

use crate::{
    auth::{Caller, Role},
    dto::{admin::QueueEntry, contest::SubmissionSummary},
    error::ServiceError,
    services::{
        events,
        submission_service::{broadcast_queue_depth, mutate_submission},
    },
    state::{
        SharedState,
        submission::{Verdict, WorkflowEvent, apply_event},
    },
};

/// Record a verdict on a submission.
///
/// `can_retry` only matters for rejections; the workflow clears it for any
/// other verdict. Terminal submissions cannot be re-graded.
pub async fn grade(
    state: &SharedState,
    caller: &Caller,
    submission_id: Uuid,
    verdict: Verdict,
    can_retry: bool,
) -> Result<SubmissionSummary, ServiceError> {
    caller.require(Role::Jury)?;

    let submission = mutate_submission(state, caller, submission_id, move |submission, now| {
        let event = WorkflowEvent::Grade { verdict, can_retry };
        let action = event.audit_action();
        apply_event(submission, event, now)?;
        Ok((action, Some(format!("{verdict:?}"))))
    })
    .await?;

    info!(submission_id = %submission_id, actor = %caller.id, ?verdict, "submission graded");
    events::broadcast_submission_update(state, &submission).await;
    broadcast_queue_depth(state).await;

    Ok(submission.into())
}

/// Settle a pending retry request.
pub async fn resolve_retry(
    state: &SharedState,
    caller: &Caller,
    submission_id: Uuid,
    grant: bool,
) -> Result<SubmissionSummary, ServiceError> {
    caller.require(Role::Jury)?;

    let submission = mutate_submission(state, caller, submission_id, move |submission, now| {
        let event = if grant {
            WorkflowEvent::GrantRetry
        } else {
            WorkflowEvent::DenyRetry
        };
        let action = event.audit_action();
        apply_event(submission, event, now)?;
        Ok((action, None))
    })
    .await?;

    info!(submission_id = %submission_id, actor = %caller.id, grant, "retry request settled");
    if grant {
        events::broadcast_retry_granted(state, &submission).await;
    } else {
        events::broadcast_submission_update(state, &submission).await;
    }

    Ok(submission.into())
}

/// Administrator override: unlock a resubmission on a settled submission
/// without going through the retry request flow.
pub async fn allow_resubmission(
    state: &SharedState,
    caller: &Caller,
    submission_id: Uuid,
) -> Result<SubmissionSummary, ServiceError> {
    caller.require(Role::Admin)?;

    let submission = mutate_submission(state, caller, submission_id, move |submission, now| {
        let event = WorkflowEvent::AllowResubmission;
        let action = event.audit_action();
        apply_event(submission, event, now)?;
        Ok((action, None))
    })
    .await?;

    info!(submission_id = %submission_id, actor = %caller.id, "resubmission allowed by override");
    events::broadcast_submission_update(state, &submission).await;

    Ok(submission.into())
}

/// Submissions awaiting a verdict, oldest first.
pub async fn jury_queue(
    state: &SharedState,
    caller: &Caller,
) -> Result<Vec<QueueEntry>, ServiceError> {
    caller.require(Role::Jury)?;
    let store = state.require_store().await?;

    let pending = store.list_unsettled_submissions().await?;
    Ok(pending.into_iter().map(QueueEntry::from).collect())
}

#[cfg(test)]
mod tests {
    use std::{
        sync::Arc,
        time::{Duration, SystemTime},
    };

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            contest_store::ContestStore,
            memory::MemoryStore,
            models::{
                AuditAction, ContestEntity, RetryStatus, SubmissionEntity, SubmissionStatus,
                TeamEntity,
            },
        },
        services::submission_service::{request_retry, submit},
        state::AppState,
    };

    struct Fixture {
        state: crate::state::SharedState,
        store: MemoryStore,
        team: Caller,
        jury: Caller,
        admin: Caller,
        submission_id: Uuid,
    }

    async fn fixture() -> Fixture {
        let state = AppState::new(AppConfig::default());
        let store = MemoryStore::new();
        state.install_store(Arc::new(store.clone())).await;

        let now = SystemTime::now();
        let contest = ContestEntity {
            id: Uuid::new_v4(),
            name: "finals".into(),
            start_time: now - Duration::from_secs(3600),
            end_time: now + Duration::from_secs(3600),
            is_paused: false,
            paused_at: None,
            is_frozen: false,
            version: 0,
        };
        let team_entity = TeamEntity {
            id: Uuid::new_v4(),
            name: "rustaceans".into(),
            is_blocked: false,
            version: 0,
        };
        let team = Caller {
            id: team_entity.id,
            role: Role::Participant,
        };
        let contest_id = contest.id;
        store.save_contest(contest).await.unwrap();
        store.save_team(team_entity).await.unwrap();

        let summary = submit(&state, &team, contest_id, "p1".into()).await.unwrap();

        Fixture {
            state,
            store,
            team,
            jury: Caller {
                id: Uuid::new_v4(),
                role: Role::Jury,
            },
            admin: Caller {
                id: Uuid::new_v4(),
                role: Role::Admin,
            },
            submission_id: summary.id,
        }
    }

    async fn find(fx: &Fixture) -> SubmissionEntity {
        fx.store
            .find_submission(fx.submission_id)
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn grading_records_the_verdict_and_an_audit_entry() {
        let fx = fixture().await;

        let summary = grade(&fx.state, &fx.jury, fx.submission_id, Verdict::Accepted, false)
            .await
            .unwrap();

        assert_eq!(summary.status, SubmissionStatus::Accepted);
        let log = fx.store.audit_log();
        assert!(
            log.iter()
                .any(|entry| entry.action == AuditAction::SubmissionGraded
                    && entry.submission_id == Some(fx.submission_id))
        );
    }

    #[tokio::test]
    async fn terminal_submissions_cannot_be_regraded() {
        let fx = fixture().await;
        grade(&fx.state, &fx.jury, fx.submission_id, Verdict::Accepted, false)
            .await
            .unwrap();

        let err = grade(&fx.state, &fx.jury, fx.submission_id, Verdict::Rejected, false)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn under_review_can_settle_later() {
        let fx = fixture().await;

        grade(
            &fx.state,
            &fx.jury,
            fx.submission_id,
            Verdict::UnderReview,
            false,
        )
        .await
        .unwrap();
        let summary = grade(&fx.state, &fx.jury, fx.submission_id, Verdict::Rejected, true)
            .await
            .unwrap();

        assert_eq!(summary.status, SubmissionStatus::Rejected);
        assert!(summary.can_retry);
    }

    #[tokio::test]
    async fn can_retry_does_not_stick_on_accepted_verdicts() {
        let fx = fixture().await;

        let summary = grade(&fx.state, &fx.jury, fx.submission_id, Verdict::Accepted, true)
            .await
            .unwrap();

        assert!(!summary.can_retry);
    }

    #[tokio::test]
    async fn granting_a_retry_unlocks_resubmission() {
        let fx = fixture().await;
        grade(&fx.state, &fx.jury, fx.submission_id, Verdict::Rejected, false)
            .await
            .unwrap();
        request_retry(
            &fx.state,
            &fx.team,
            fx.submission_id,
            "grader host ran out of memory".into(),
        )
        .await
        .unwrap();

        let summary = resolve_retry(&fx.state, &fx.jury, fx.submission_id, true)
            .await
            .unwrap();

        assert_eq!(summary.retry_status, Some(RetryStatus::Granted));
        assert!(summary.can_retry);
        assert!(find(&fx).await.can_retry);
    }

    #[tokio::test]
    async fn denying_a_retry_keeps_the_submission_locked() {
        let fx = fixture().await;
        grade(&fx.state, &fx.jury, fx.submission_id, Verdict::Rejected, false)
            .await
            .unwrap();
        request_retry(
            &fx.state,
            &fx.team,
            fx.submission_id,
            "grader host ran out of memory".into(),
        )
        .await
        .unwrap();

        let summary = resolve_retry(&fx.state, &fx.jury, fx.submission_id, false)
            .await
            .unwrap();

        assert_eq!(summary.retry_status, Some(RetryStatus::Denied));
        assert!(!summary.can_retry);
    }

    #[tokio::test]
    async fn retry_cannot_be_settled_twice() {
        let fx = fixture().await;
        grade(&fx.state, &fx.jury, fx.submission_id, Verdict::Rejected, false)
            .await
            .unwrap();
        request_retry(
            &fx.state,
            &fx.team,
            fx.submission_id,
            "grader host ran out of memory".into(),
        )
        .await
        .unwrap();
        resolve_retry(&fx.state, &fx.jury, fx.submission_id, true)
            .await
            .unwrap();

        let err = resolve_retry(&fx.state, &fx.jury, fx.submission_id, false)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn admin_override_unlocks_a_settled_submission() {
        let fx = fixture().await;
        grade(&fx.state, &fx.jury, fx.submission_id, Verdict::Rejected, false)
            .await
            .unwrap();

        let summary = allow_resubmission(&fx.state, &fx.admin, fx.submission_id)
            .await
            .unwrap();

        assert!(summary.can_retry);
        let log = fx.store.audit_log();
        assert!(
            log.iter()
                .any(|entry| entry.action == AuditAction::ResubmissionAllowed)
        );
    }

    #[tokio::test]
    async fn participants_cannot_grade() {
        let fx = fixture().await;

        let err = grade(&fx.state, &fx.team, fx.submission_id, Verdict::Accepted, false)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn jury_queue_lists_unsettled_submissions_oldest_first() {
        let fx = fixture().await;

        let queue = jury_queue(&fx.state, &fx.jury).await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].submission_id, fx.submission_id);

        grade(&fx.state, &fx.jury, fx.submission_id, Verdict::Accepted, false)
            .await
            .unwrap();
        let queue = jury_queue(&fx.state, &fx.jury).await.unwrap();
        assert!(queue.is_empty());
    }
}
