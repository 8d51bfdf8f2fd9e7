//! Helpers that build wire events from entities and hand them to the
//! broadcast engine.
//!
//! Broadcasting is best effort by contract: persistence has already
//! committed when these run, so nothing here returns an error.

use std::time::SystemTime;

use crate::{
    dao::models::{ContestEntity, SubmissionEntity},
    dto::{
        events::{
            ContestStatusUpdate, EventKind, JuryQueueUpdate, SubmissionNotice, TeamStatusUpdate,
            TimeUpdate,
        },
        format_system_time,
    },
    state::{SharedState, clock},
};

/// Broadcast the full lifecycle snapshot of a contest after an admin action.
pub async fn broadcast_contest_status(state: &SharedState, contest: &ContestEntity) {
    let now = SystemTime::now();
    let update = ContestStatusUpdate {
        contest_id: Some(contest.id),
        status: Some(clock::resolve_status(contest, now)),
        is_paused: Some(contest.is_paused),
        paused_at: Some(contest.paused_at.map(format_system_time)),
        start_time: Some(format_system_time(contest.start_time)),
        end_time: Some(format_system_time(contest.end_time)),
        is_frozen: Some(contest.is_frozen),
    };
    state
        .broadcast()
        .publish(EventKind::ContestStatusUpdate(update))
        .await;
}

/// Broadcast the remaining contest time.
pub async fn broadcast_time_update(state: &SharedState, contest: &ContestEntity) {
    let now = SystemTime::now();
    let update = TimeUpdate {
        contest_id: contest.id,
        remaining_ms: clock::remaining_ms(contest, now),
    };
    state
        .broadcast()
        .publish(EventKind::TimeUpdate(update))
        .await;
}

/// Broadcast a team block or unblock.
pub async fn broadcast_team_status(state: &SharedState, team_id: uuid::Uuid, is_blocked: bool) {
    state
        .broadcast()
        .publish(EventKind::TeamStatusUpdate(TeamStatusUpdate {
            team_id,
            is_blocked,
        }))
        .await;
}

/// Broadcast the arrival of a new submission in the queue.
pub async fn broadcast_new_submission(state: &SharedState, submission: &SubmissionEntity) {
    state
        .broadcast()
        .publish(EventKind::NewSubmission(notice(submission)))
        .await;
}

/// Broadcast a verdict or retry-state change on an existing submission.
pub async fn broadcast_submission_update(state: &SharedState, submission: &SubmissionEntity) {
    state
        .broadcast()
        .publish(EventKind::SubmissionUpdate(notice(submission)))
        .await;
}

/// Broadcast a freshly filed retry request.
pub async fn broadcast_retry_requested(state: &SharedState, submission: &SubmissionEntity) {
    state
        .broadcast()
        .publish(EventKind::RetryRequested(notice(submission)))
        .await;
}

/// Broadcast a granted retry request.
pub async fn broadcast_retry_granted(state: &SharedState, submission: &SubmissionEntity) {
    state
        .broadcast()
        .publish(EventKind::RetryGranted(notice(submission)))
        .await;
}

/// Broadcast the current depth of the jury queue.
pub async fn broadcast_jury_queue(state: &SharedState, pending_count: u64) {
    state
        .broadcast()
        .publish(EventKind::JuryQueueUpdate(JuryQueueUpdate { pending_count }))
        .await;
}

fn notice(submission: &SubmissionEntity) -> SubmissionNotice {
    SubmissionNotice {
        submission_id: submission.id,
        team_id: submission.team_id,
        problem_id: submission.problem_id.clone(),
        status: submission.status,
        can_retry: submission.can_retry,
        retry_status: submission.retry.as_ref().map(|retry| retry.status),
    }
}
