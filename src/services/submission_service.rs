//! Participant-facing submission intake and retry requests.
//!
//! Every write goes through the access gate first; any storage failure
//! while loading the contest or team denies the attempt rather than
//! letting it slip past a check we could not run.

use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;

use crate::{
    auth::{Caller, Role},
    dao::models::{AuditEntryEntity, SubmissionEntity, SubmissionStatus},
    dto::{contest::SubmissionSummary, validation::validate_retry_reason},
    error::ServiceError,
    services::events,
    state::{
        SharedState,
        gate::{self, AccessDecision},
        submission::{WorkflowEvent, apply_event},
    },
};

/// Attempts before an optimistic-concurrency conflict is surfaced.
const MAX_CAS_ATTEMPTS: u32 = 3;

/// Accept a solution for grading.
///
/// The caller must be a participant; their actor id is the team id. Denials
/// from the access gate surface as 403 with a stable reason string.
pub async fn submit(
    state: &SharedState,
    caller: &Caller,
    contest_id: Uuid,
    problem_id: String,
) -> Result<SubmissionSummary, ServiceError> {
    caller.require(Role::Participant)?;
    let store = state.require_store().await?;
    let team_id = caller.id;

    // Fail closed: a missing record denies just like a storage error.
    let contest = store
        .find_contest(contest_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("contest `{contest_id}` not found")))?;
    let team = store
        .find_team(team_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("team `{team_id}` not found")))?;

    let now = SystemTime::now();
    if let AccessDecision::Denied(reason) = gate::validate_access(&contest, &team, now) {
        info!(team_id = %team_id, contest_id = %contest_id, reason = reason.as_str(), "submission denied");
        return Err(ServiceError::AccessDenied(reason.as_str()));
    }

    let siblings = store.list_submissions(team_id, problem_id.clone()).await?;
    if !gate::resubmission_allowed(&siblings) {
        info!(team_id = %team_id, problem_id = %problem_id, "resubmission without a retry grant denied");
        return Err(ServiceError::AccessDenied("resubmission not allowed"));
    }

    let submission = SubmissionEntity {
        id: Uuid::new_v4(),
        team_id,
        problem_id,
        status: SubmissionStatus::Pending,
        can_retry: false,
        retry: None,
        submitted_at: now,
        updated_at: now,
        version: 0,
    };
    store.insert_submission(submission.clone()).await?;

    info!(submission_id = %submission.id, team_id = %team_id, "submission accepted");
    events::broadcast_new_submission(state, &submission).await;
    broadcast_queue_depth(state).await;

    Ok(submission.into())
}

/// File a retry request on a rejected submission owned by the caller.
pub async fn request_retry(
    state: &SharedState,
    caller: &Caller,
    submission_id: Uuid,
    reason: String,
) -> Result<SubmissionSummary, ServiceError> {
    caller.require(Role::Participant)?;
    validate_retry_reason(&reason, state.config().retry_reason_min_len)?;

    let submission = mutate_submission(state, caller, submission_id, move |submission, now| {
        if submission.team_id != caller.id {
            return Err(ServiceError::Unauthorized(
                "only the owning team may request a retry".into(),
            ));
        }
        let event = WorkflowEvent::RequestRetry {
            reason: reason.clone(),
        };
        let detail = Some(reason.clone());
        apply_event(submission, event.clone(), now)?;
        Ok((event.audit_action(), detail))
    })
    .await?;

    info!(submission_id = %submission_id, team_id = %caller.id, "retry requested");
    events::broadcast_retry_requested(state, &submission).await;

    Ok(submission.into())
}

/// Load, mutate and compare-and-swap a submission; the matching audit entry
/// is committed by the store in the same transaction as the replace.
pub(crate) async fn mutate_submission<F>(
    state: &SharedState,
    caller: &Caller,
    submission_id: Uuid,
    mutate: F,
) -> Result<SubmissionEntity, ServiceError>
where
    F: Fn(
        &mut SubmissionEntity,
        SystemTime,
    ) -> Result<(crate::dao::models::AuditAction, Option<String>), ServiceError>,
{
    let store = state.require_store().await?;

    for _ in 0..MAX_CAS_ATTEMPTS {
        let mut submission = store.find_submission(submission_id).await?.ok_or_else(|| {
            ServiceError::NotFound(format!("submission `{submission_id}` not found"))
        })?;

        let now = SystemTime::now();
        let (action, detail) = mutate(&mut submission, now)?;

        let expected = submission.version;
        submission.version += 1;

        let audit = AuditEntryEntity {
            id: Uuid::new_v4(),
            action,
            actor_id: caller.id,
            actor_role: caller.role.as_str().to_owned(),
            submission_id: Some(submission_id),
            contest_id: None,
            detail,
            at: now,
        };

        if store
            .replace_submission(submission.clone(), expected, audit)
            .await?
        {
            return Ok(submission);
        }
    }

    Err(ServiceError::Conflict(format!(
        "submission `{submission_id}` kept changing concurrently"
    )))
}

/// Broadcast the current jury queue depth. Best effort.
pub(crate) async fn broadcast_queue_depth(state: &SharedState) {
    let Some(store) = state.store().await else {
        return;
    };
    match store.list_unsettled_submissions().await {
        Ok(pending) => {
            events::broadcast_jury_queue(state, pending.len() as u64).await;
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to count jury queue for broadcast");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::{
        auth::Role,
        config::AppConfig,
        dao::{
            contest_store::ContestStore,
            memory::MemoryStore,
            models::{AuditAction, ContestEntity, RetryStatus, TeamEntity},
        },
        state::AppState,
    };

    struct Fixture {
        state: SharedState,
        store: MemoryStore,
        contest_id: Uuid,
        team: Caller,
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
        let team_id = Uuid::new_v4();
        let team = TeamEntity {
            id: team_id,
            name: "rustaceans".into(),
            is_blocked: false,
            version: 0,
        };
        let contest_id = contest.id;
        store.save_contest(contest).await.unwrap();
        store.save_team(team).await.unwrap();

        Fixture {
            state,
            store,
            contest_id,
            team: Caller {
                id: team_id,
                role: Role::Participant,
            },
        }
    }

    #[tokio::test]
    async fn active_contest_accepts_a_submission() {
        let fx = fixture().await;

        let summary = submit(&fx.state, &fx.team, fx.contest_id, "p1".into())
            .await
            .unwrap();

        assert_eq!(summary.status, SubmissionStatus::Pending);
        assert_eq!(summary.team_id, fx.team.id);
    }

    #[tokio::test]
    async fn blocked_team_is_denied_with_the_block_reason() {
        let fx = fixture().await;
        let mut team = fx.store.find_team(fx.team.id).await.unwrap().unwrap();
        team.is_blocked = true;
        fx.store.save_team(team).await.unwrap();

        let err = submit(&fx.state, &fx.team, fx.contest_id, "p1".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AccessDenied("team blocked")));
    }

    #[tokio::test]
    async fn paused_contest_rejects_submissions() {
        let fx = fixture().await;
        let mut contest = fx.store.find_contest(fx.contest_id).await.unwrap().unwrap();
        contest.is_paused = true;
        contest.paused_at = Some(SystemTime::now());
        fx.store.save_contest(contest).await.unwrap();

        let err = submit(&fx.state, &fx.team, fx.contest_id, "p1".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AccessDenied("paused")));
    }

    #[tokio::test]
    async fn frozen_contest_still_accepts_submissions() {
        let fx = fixture().await;
        let mut contest = fx.store.find_contest(fx.contest_id).await.unwrap().unwrap();
        contest.is_frozen = true;
        fx.store.save_contest(contest).await.unwrap();

        assert!(
            submit(&fx.state, &fx.team, fx.contest_id, "p1".into())
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn rejected_submission_blocks_resubmission_until_granted() {
        let fx = fixture().await;

        let first = submit(&fx.state, &fx.team, fx.contest_id, "p1".into())
            .await
            .unwrap();

        // Jury rejects without leaving the retry door open.
        let mut entity = fx.store.find_submission(first.id).await.unwrap().unwrap();
        entity.status = SubmissionStatus::Rejected;
        entity.can_retry = false;
        let version = entity.version;
        entity.version += 1;
        let audit = AuditEntryEntity {
            id: Uuid::new_v4(),
            action: AuditAction::SubmissionGraded,
            actor_id: Uuid::new_v4(),
            actor_role: "JURY".into(),
            submission_id: Some(first.id),
            contest_id: None,
            detail: None,
            at: SystemTime::now(),
        };
        fx.store
            .replace_submission(entity, version, audit)
            .await
            .unwrap();

        let err = submit(&fx.state, &fx.team, fx.contest_id, "p1".into())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::AccessDenied("resubmission not allowed")
        ));

        // Different problem is unaffected by the sibling check.
        assert!(
            submit(&fx.state, &fx.team, fx.contest_id, "p2".into())
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn retry_request_requires_a_rejected_submission() {
        let fx = fixture().await;
        let pending = submit(&fx.state, &fx.team, fx.contest_id, "p1".into())
            .await
            .unwrap();

        let err = request_retry(
            &fx.state,
            &fx.team,
            pending.id,
            "compiler segfaulted on the grader host".into(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn retry_request_is_audited_and_marked_requested() {
        let fx = fixture().await;
        let summary = submit(&fx.state, &fx.team, fx.contest_id, "p1".into())
            .await
            .unwrap();

        let mut entity = fx.store.find_submission(summary.id).await.unwrap().unwrap();
        entity.status = SubmissionStatus::Rejected;
        let version = entity.version;
        entity.version += 1;
        let audit = AuditEntryEntity {
            id: Uuid::new_v4(),
            action: AuditAction::SubmissionGraded,
            actor_id: Uuid::new_v4(),
            actor_role: "JURY".into(),
            submission_id: Some(summary.id),
            contest_id: None,
            detail: None,
            at: SystemTime::now(),
        };
        fx.store
            .replace_submission(entity, version, audit)
            .await
            .unwrap();

        let updated = request_retry(
            &fx.state,
            &fx.team,
            summary.id,
            "compiler segfaulted on the grader host".into(),
        )
        .await
        .unwrap();

        assert_eq!(updated.retry_status, Some(RetryStatus::Requested));
        let log = fx.store.audit_log();
        assert!(
            log.iter()
                .any(|entry| entry.action == AuditAction::RetryRequested)
        );
    }

    #[tokio::test]
    async fn short_retry_reason_is_rejected_before_any_write() {
        let fx = fixture().await;

        let err = request_retry(&fx.state, &fx.team, Uuid::new_v4(), "short".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn another_team_cannot_request_a_retry() {
        let fx = fixture().await;
        let summary = submit(&fx.state, &fx.team, fx.contest_id, "p1".into())
            .await
            .unwrap();

        let intruder = Caller {
            id: Uuid::new_v4(),
            role: Role::Participant,
        };
        let err = request_retry(
            &fx.state,
            &intruder,
            summary.id,
            "definitely my submission, honest".into(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn submissions_fail_closed_without_storage() {
        let state = AppState::new(AppConfig::default());
        let caller = Caller {
            id: Uuid::new_v4(),
            role: Role::Participant,
        };

        let err = submit(&state, &caller, Uuid::new_v4(), "p1".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Degraded));
    }
}
