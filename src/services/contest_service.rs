//! Administrative contest control: pause, resume, extend, freeze, unfreeze
//! and the team kill switch.
//!
//! Every action persists through a compare-and-swap replace before anything
//! is broadcast, so a crash between the two leaves the database right and
//! only the notification lost. Broadcasts are best effort and never fail
//! the request.

use std::time::{Duration, SystemTime};

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{Caller, Role},
    dao::models::{ContestEntity, TeamEntity},
    dto::{contest::ContestSummary, validation::validate_extension_minutes},
    error::ServiceError,
    services::events,
    state::SharedState,
};

/// Attempts before an optimistic-concurrency conflict is surfaced.
const MAX_CAS_ATTEMPTS: u32 = 3;

/// Pause the contest. Pausing an already paused contest is a no-op.
pub async fn pause_contest(
    state: &SharedState,
    caller: &Caller,
    contest_id: Uuid,
) -> Result<ContestSummary, ServiceError> {
    caller.require(Role::Admin)?;

    let contest = modify_contest(state, contest_id, |contest, now| {
        if contest.is_paused {
            return Ok(false);
        }
        contest.is_paused = true;
        contest.paused_at = Some(now);
        Ok(true)
    })
    .await?;

    info!(contest_id = %contest_id, actor = %caller.id, "contest paused");
    events::broadcast_contest_status(state, &contest).await;
    events::broadcast_time_update(state, &contest).await;
    Ok(summary(&contest))
}

/// Resume a paused contest. When pause compensation is enabled the end time
/// shifts forward by the paused duration so teams lose no contest time.
/// Resuming a contest that is not paused is a no-op.
pub async fn resume_contest(
    state: &SharedState,
    caller: &Caller,
    contest_id: Uuid,
) -> Result<ContestSummary, ServiceError> {
    caller.require(Role::Admin)?;
    let compensate = state.config().pause_compensation;

    let contest = modify_contest(state, contest_id, move |contest, now| {
        if !contest.is_paused {
            return Ok(false);
        }
        if compensate && let Some(paused_at) = contest.paused_at {
            let paused_for = now.duration_since(paused_at).unwrap_or(Duration::ZERO);
            contest.end_time += paused_for;
        }
        contest.is_paused = false;
        contest.paused_at = None;
        Ok(true)
    })
    .await?;

    info!(contest_id = %contest_id, actor = %caller.id, "contest resumed");
    events::broadcast_contest_status(state, &contest).await;
    events::broadcast_time_update(state, &contest).await;
    Ok(summary(&contest))
}

/// Push the contest end time forward by `minutes`.
pub async fn extend_contest(
    state: &SharedState,
    caller: &Caller,
    contest_id: Uuid,
    minutes: u64,
) -> Result<ContestSummary, ServiceError> {
    caller.require(Role::Admin)?;
    validate_extension_minutes(minutes, state.config().max_extension_minutes)?;

    let contest = modify_contest(state, contest_id, move |contest, _now| {
        contest.end_time += Duration::from_secs(minutes * 60);
        Ok(true)
    })
    .await?;

    info!(contest_id = %contest_id, actor = %caller.id, minutes, "contest extended");
    events::broadcast_contest_status(state, &contest).await;
    events::broadcast_time_update(state, &contest).await;
    Ok(summary(&contest))
}

/// Freeze the public leaderboard. Submissions keep flowing while frozen.
pub async fn freeze_contest(
    state: &SharedState,
    caller: &Caller,
    contest_id: Uuid,
) -> Result<ContestSummary, ServiceError> {
    caller.require(Role::Admin)?;
    set_frozen(state, caller, contest_id, true).await
}

/// Lift a leaderboard freeze.
pub async fn unfreeze_contest(
    state: &SharedState,
    caller: &Caller,
    contest_id: Uuid,
) -> Result<ContestSummary, ServiceError> {
    caller.require(Role::Admin)?;
    set_frozen(state, caller, contest_id, false).await
}

async fn set_frozen(
    state: &SharedState,
    caller: &Caller,
    contest_id: Uuid,
    frozen: bool,
) -> Result<ContestSummary, ServiceError> {
    let contest = modify_contest(state, contest_id, move |contest, _now| {
        if contest.is_frozen == frozen {
            return Ok(false);
        }
        contest.is_frozen = frozen;
        Ok(true)
    })
    .await?;

    info!(contest_id = %contest_id, actor = %caller.id, frozen, "freeze flag changed");
    events::broadcast_contest_status(state, &contest).await;
    Ok(summary(&contest))
}

/// Flip the kill switch on a team. Blocking an already blocked team (or
/// unblocking an unblocked one) is a no-op.
pub async fn set_team_blocked(
    state: &SharedState,
    caller: &Caller,
    team_id: Uuid,
    blocked: bool,
) -> Result<TeamEntity, ServiceError> {
    caller.require(Role::Admin)?;
    let store = state.require_store().await?;

    for _ in 0..MAX_CAS_ATTEMPTS {
        let mut team = store
            .find_team(team_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("team `{team_id}` not found")))?;

        if team.is_blocked == blocked {
            return Ok(team);
        }

        let expected = team.version;
        team.is_blocked = blocked;
        team.version += 1;

        if store.replace_team(team.clone(), expected).await? {
            info!(team_id = %team_id, actor = %caller.id, blocked, "team block flag changed");
            events::broadcast_team_status(state, team_id, blocked).await;
            return Ok(team);
        }

        warn!(team_id = %team_id, "team replace lost a concurrent update, retrying");
    }

    Err(ServiceError::Conflict(format!(
        "team `{team_id}` kept changing concurrently"
    )))
}

/// Public contest snapshot: resolved status plus remaining time.
pub async fn contest_status(
    state: &SharedState,
    contest_id: Uuid,
) -> Result<ContestSummary, ServiceError> {
    let store = state.require_store().await?;
    let contest = store
        .find_contest(contest_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("contest `{contest_id}` not found")))?;
    Ok(summary(&contest))
}

/// Load, mutate and compare-and-swap a contest. `mutate` returns whether it
/// changed anything; a `false` short-circuits without persisting, which is
/// what makes the admin actions idempotent.
async fn modify_contest<F>(
    state: &SharedState,
    contest_id: Uuid,
    mutate: F,
) -> Result<ContestEntity, ServiceError>
where
    F: Fn(&mut ContestEntity, SystemTime) -> Result<bool, ServiceError>,
{
    let store = state.require_store().await?;

    for _ in 0..MAX_CAS_ATTEMPTS {
        let mut contest = store
            .find_contest(contest_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("contest `{contest_id}` not found")))?;

        let now = SystemTime::now();
        if !mutate(&mut contest, now)? {
            return Ok(contest);
        }

        let expected = contest.version;
        contest.version += 1;

        if store.replace_contest(contest.clone(), expected).await? {
            return Ok(contest);
        }

        warn!(contest_id = %contest_id, "contest replace lost a concurrent update, retrying");
    }

    Err(ServiceError::Conflict(format!(
        "contest `{contest_id}` kept changing concurrently"
    )))
}

fn summary(contest: &ContestEntity) -> ContestSummary {
    ContestSummary::from_entity(contest, SystemTime::now())
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{contest_store::ContestStore, memory::MemoryStore},
        state::{AppState, clock::ContestStatus},
    };

    fn admin() -> Caller {
        Caller {
            id: Uuid::new_v4(),
            role: Role::Admin,
        }
    }

    fn participant() -> Caller {
        Caller {
            id: Uuid::new_v4(),
            role: Role::Participant,
        }
    }

    async fn state_with_contest(config: AppConfig) -> (SharedState, MemoryStore, Uuid) {
        let state = AppState::new(config);
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
        let id = contest.id;
        store.save_contest(contest).await.unwrap();
        (state, store, id)
    }

    #[tokio::test]
    async fn pause_sets_flag_and_timestamp_atomically() {
        let (state, store, id) = state_with_contest(AppConfig::default()).await;

        pause_contest(&state, &admin(), id).await.unwrap();

        let contest = store.find_contest(id).await.unwrap().unwrap();
        assert!(contest.is_paused);
        assert!(contest.paused_at.is_some());
        assert_eq!(contest.version, 1);
    }

    #[tokio::test]
    async fn pausing_twice_is_idempotent() {
        let (state, store, id) = state_with_contest(AppConfig::default()).await;

        pause_contest(&state, &admin(), id).await.unwrap();
        pause_contest(&state, &admin(), id).await.unwrap();

        // Second call persisted nothing.
        let contest = store.find_contest(id).await.unwrap().unwrap();
        assert_eq!(contest.version, 1);
    }

    #[tokio::test]
    async fn resume_clears_pause_and_compensates_end_time() {
        let (state, store, id) = state_with_contest(AppConfig::default()).await;

        pause_contest(&state, &admin(), id).await.unwrap();
        let end_before = store.find_contest(id).await.unwrap().unwrap().end_time;

        resume_contest(&state, &admin(), id).await.unwrap();

        let contest = store.find_contest(id).await.unwrap().unwrap();
        assert!(!contest.is_paused);
        assert!(contest.paused_at.is_none());
        // End time moved forward by the (tiny) paused duration.
        assert!(contest.end_time >= end_before);
    }

    #[tokio::test]
    async fn resume_compensates_by_the_exact_paused_duration() {
        let (state, store, id) = state_with_contest(AppConfig::default()).await;

        // Seed a pause that began five minutes ago.
        let mut contest = store.find_contest(id).await.unwrap().unwrap();
        let paused_for = Duration::from_secs(300);
        contest.is_paused = true;
        contest.paused_at = Some(SystemTime::now() - paused_for);
        let expected = contest.version;
        contest.version += 1;
        assert!(
            store
                .replace_contest(contest.clone(), expected)
                .await
                .unwrap()
        );
        let end_before = contest.end_time;

        resume_contest(&state, &admin(), id).await.unwrap();

        let resumed = store.find_contest(id).await.unwrap().unwrap();
        let shift = resumed.end_time.duration_since(end_before).unwrap();
        assert!(shift >= paused_for);
        assert!(shift < paused_for + Duration::from_secs(1));
    }

    #[tokio::test]
    async fn resume_without_compensation_keeps_end_time() {
        let config = AppConfig {
            pause_compensation: false,
            ..AppConfig::default()
        };
        let (state, store, id) = state_with_contest(config).await;

        pause_contest(&state, &admin(), id).await.unwrap();
        let end_before = store.find_contest(id).await.unwrap().unwrap().end_time;

        resume_contest(&state, &admin(), id).await.unwrap();

        let contest = store.find_contest(id).await.unwrap().unwrap();
        assert_eq!(contest.end_time, end_before);
    }

    #[tokio::test]
    async fn resuming_a_running_contest_is_a_no_op() {
        let (state, store, id) = state_with_contest(AppConfig::default()).await;

        resume_contest(&state, &admin(), id).await.unwrap();

        let contest = store.find_contest(id).await.unwrap().unwrap();
        assert_eq!(contest.version, 0);
    }

    #[tokio::test]
    async fn extend_moves_the_end_time() {
        let (state, store, id) = state_with_contest(AppConfig::default()).await;
        let end_before = store.find_contest(id).await.unwrap().unwrap().end_time;

        extend_contest(&state, &admin(), id, 30).await.unwrap();

        let contest = store.find_contest(id).await.unwrap().unwrap();
        assert_eq!(contest.end_time, end_before + Duration::from_secs(30 * 60));
    }

    #[tokio::test]
    async fn extending_delivers_the_new_end_time_to_viewers() {
        use axum::extract::ws::Message;
        use tokio::sync::mpsc;

        use crate::dto::{
            events::{EventKind, parse_known},
            format_system_time,
        };

        let (state, store, id) = state_with_contest(AppConfig::default()).await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        state.broadcast().register(tx).await;
        let _greeting = rx.recv().await;

        extend_contest(&state, &admin(), id, 30).await.unwrap();
        let contest = store.find_contest(id).await.unwrap().unwrap();

        let frame = match rx.recv().await {
            Some(Message::Text(text)) => parse_known(&text).unwrap().unwrap(),
            other => panic!("expected text frame, got {other:?}"),
        };
        match frame.kind {
            EventKind::ContestStatusUpdate(update) => {
                assert_eq!(update.contest_id, Some(id));
                assert_eq!(update.end_time, Some(format_system_time(contest.end_time)));
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[tokio::test]
    async fn extension_bounds_are_enforced() {
        let (state, _store, id) = state_with_contest(AppConfig::default()).await;

        assert!(matches!(
            extend_contest(&state, &admin(), id, 0).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            extend_contest(&state, &admin(), id, 500).await,
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn frozen_contest_still_reports_frozen_status() {
        let (state, _store, id) = state_with_contest(AppConfig::default()).await;

        let summary = freeze_contest(&state, &admin(), id).await.unwrap();
        assert_eq!(summary.status, ContestStatus::Frozen);

        let summary = unfreeze_contest(&state, &admin(), id).await.unwrap();
        assert_eq!(summary.status, ContestStatus::Active);
    }

    #[tokio::test]
    async fn non_admin_cannot_control_the_contest() {
        let (state, _store, id) = state_with_contest(AppConfig::default()).await;

        assert!(matches!(
            pause_contest(&state, &participant(), id).await,
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn blocking_a_team_flips_the_kill_switch() {
        let (state, store, _id) = state_with_contest(AppConfig::default()).await;
        let team = TeamEntity {
            id: Uuid::new_v4(),
            name: "rustaceans".into(),
            is_blocked: false,
            version: 0,
        };
        store.save_team(team.clone()).await.unwrap();

        let updated = set_team_blocked(&state, &admin(), team.id, true)
            .await
            .unwrap();
        assert!(updated.is_blocked);
        assert_eq!(updated.version, 1);

        // Idempotent: no extra version bump.
        let again = set_team_blocked(&state, &admin(), team.id, true)
            .await
            .unwrap();
        assert_eq!(again.version, 1);
    }

    #[tokio::test]
    async fn control_actions_fail_closed_without_storage() {
        let state = AppState::new(AppConfig::default());

        assert!(matches!(
            pause_contest(&state, &admin(), Uuid::new_v4()).await,
            Err(ServiceError::Degraded)
        ));
    }
}
