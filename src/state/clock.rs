//! Pure contest clock: derives the authoritative status from persisted
//! timestamps plus live flags. No I/O, callable identically on the server
//! and on a client holding fields refreshed by broadcast events.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::dao::models::ContestEntity;

/// Status of a contest at a given instant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContestStatus {
    /// Wall clock has not reached the start time yet.
    NotStarted,
    /// Contest is running and accepting submissions.
    Active,
    /// An administrator paused the contest.
    Paused,
    /// Leaderboard is frozen; submissions still flow.
    Frozen,
    /// Wall clock passed the end time.
    Ended,
}

/// Resolve the contest status for `now`.
///
/// Precedence is total, first match wins: not-started, ended, paused,
/// frozen, active. A contest paused past its end time reports `Ended`;
/// once ended the pause state is moot.
pub fn resolve_status(contest: &ContestEntity, now: SystemTime) -> ContestStatus {
    if now < contest.start_time {
        ContestStatus::NotStarted
    } else if now > contest.end_time {
        ContestStatus::Ended
    } else if contest.is_paused {
        ContestStatus::Paused
    } else if contest.is_frozen {
        ContestStatus::Frozen
    } else {
        ContestStatus::Active
    }
}

/// Milliseconds of contest time left at `now`, saturating at zero.
///
/// While paused the remaining time is measured from `paused_at`, so the
/// countdown shown to clients holds still until the contest resumes.
pub fn remaining_ms(contest: &ContestEntity, now: SystemTime) -> u64 {
    let reference = match (contest.is_paused, contest.paused_at) {
        (true, Some(paused_at)) => paused_at,
        _ => now,
    };

    contest
        .end_time
        .duration_since(reference)
        .map(|remaining| remaining.as_millis() as u64)
        .unwrap_or(0)
}
