//! Access gate consulted before accepting any submission write.
//!
//! Pure over the contest and team records; callers load those through
//! storage and must treat any load failure as a denial (fail closed).

use std::time::SystemTime;

use crate::{
    dao::models::{ContestEntity, SubmissionEntity, TeamEntity},
    state::clock::{ContestStatus, resolve_status},
};

/// Reason a submission attempt was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// The team kill switch is set; overrides any contest status.
    TeamBlocked,
    /// Contest has not started yet.
    NotStarted,
    /// Contest is paused.
    Paused,
    /// Contest is over.
    Ended,
}

impl DenialReason {
    /// Stable reason string surfaced to clients.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TeamBlocked => "team blocked",
            Self::NotStarted => "not started",
            Self::Paused => "paused",
            Self::Ended => "ended",
        }
    }
}

/// Outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// Submission may proceed.
    Granted,
    /// Submission must be rejected with the given reason.
    Denied(DenialReason),
}

/// Decide whether `team` may submit to `contest` at `now`.
///
/// The kill switch is a higher-priority veto: a blocked team is denied
/// even while the contest is active. A frozen contest still accepts
/// submissions; freezing only hides leaderboard movement.
pub fn validate_access(
    contest: &ContestEntity,
    team: &TeamEntity,
    now: SystemTime,
) -> AccessDecision {
    if team.is_blocked {
        return AccessDecision::Denied(DenialReason::TeamBlocked);
    }

    match resolve_status(contest, now) {
        ContestStatus::NotStarted => AccessDecision::Denied(DenialReason::NotStarted),
        ContestStatus::Paused => AccessDecision::Denied(DenialReason::Paused),
        ContestStatus::Ended => AccessDecision::Denied(DenialReason::Ended),
        ContestStatus::Active | ContestStatus::Frozen => AccessDecision::Granted,
    }
}

/// Sibling check for repeat submissions on the same (team, problem) pair.
///
/// A new submission is allowed when no prior terminal non-retryable
/// submission exists, or when the most recent submission carries a retry
/// grant.
pub fn resubmission_allowed(prior: &[SubmissionEntity]) -> bool {
    let blocked = prior
        .iter()
        .any(|submission| submission.status.is_terminal() && !submission.can_retry);

    if !blocked {
        return true;
    }

    prior
        .iter()
        .max_by_key(|submission| submission.submitted_at)
        .map(|latest| latest.can_retry)
        .unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::dao::models::SubmissionStatus;
    use uuid::Uuid;

    fn active_contest(now: SystemTime) -> ContestEntity {
        ContestEntity {
            id: Uuid::new_v4(),
            name: "round".into(),
            start_time: now - Duration::from_secs(60),
            end_time: now + Duration::from_secs(3600),
            is_paused: false,
            paused_at: None,
            is_frozen: false,
            version: 0,
        }
    }

    fn team(blocked: bool) -> TeamEntity {
        TeamEntity {
            id: Uuid::new_v4(),
            name: "team".into(),
            is_blocked: blocked,
            version: 0,
        }
    }

    fn submission(status: SubmissionStatus, can_retry: bool, age_s: u64) -> SubmissionEntity {
        let at = SystemTime::now() - Duration::from_secs(age_s);
        SubmissionEntity {
            id: Uuid::new_v4(),
            team_id: Uuid::new_v4(),
            problem_id: "p1".into(),
            status,
            can_retry,
            retry: None,
            submitted_at: at,
            updated_at: at,
            version: 0,
        }
    }

    #[test]
    fn active_contest_grants_access() {
        let now = SystemTime::now();
        assert_eq!(
            validate_access(&active_contest(now), &team(false), now),
            AccessDecision::Granted
        );
    }

    #[test]
    fn blocked_team_denied_even_while_active() {
        let now = SystemTime::now();
        assert_eq!(
            validate_access(&active_contest(now), &team(true), now),
            AccessDecision::Denied(DenialReason::TeamBlocked)
        );
    }

    #[test]
    fn paused_contest_denies_with_paused_reason() {
        let now = SystemTime::now();
        let mut contest = active_contest(now);
        contest.is_paused = true;
        contest.paused_at = Some(now);
        assert_eq!(
            validate_access(&contest, &team(false), now),
            AccessDecision::Denied(DenialReason::Paused)
        );
    }

    #[test]
    fn frozen_contest_still_accepts_submissions() {
        let now = SystemTime::now();
        let mut contest = active_contest(now);
        contest.is_frozen = true;
        assert_eq!(
            validate_access(&contest, &team(false), now),
            AccessDecision::Granted
        );
    }

    #[test]
    fn ended_contest_denies_with_ended_reason() {
        let now = SystemTime::now();
        let mut contest = active_contest(now);
        contest.end_time = now - Duration::from_secs(1);
        assert_eq!(
            validate_access(&contest, &team(false), now),
            AccessDecision::Denied(DenialReason::Ended)
        );
    }

    #[test]
    fn first_submission_always_allowed() {
        assert!(resubmission_allowed(&[]));
    }

    #[test]
    fn pending_sibling_does_not_block() {
        let prior = vec![submission(SubmissionStatus::Pending, false, 10)];
        assert!(resubmission_allowed(&prior));
    }

    #[test]
    fn non_retryable_rejection_blocks_resubmit() {
        let prior = vec![submission(SubmissionStatus::Rejected, false, 10)];
        assert!(!resubmission_allowed(&prior));
    }

    #[test]
    fn retry_grant_on_latest_unblocks_resubmit() {
        let prior = vec![
            submission(SubmissionStatus::Rejected, false, 120),
            submission(SubmissionStatus::Rejected, true, 10),
        ];
        assert!(resubmission_allowed(&prior));
    }

    #[test]
    fn older_grant_does_not_unblock_latest_rejection() {
        let prior = vec![
            submission(SubmissionStatus::Rejected, true, 120),
            submission(SubmissionStatus::Rejected, false, 10),
        ];
        assert!(!resubmission_allowed(&prior));
    }
}
