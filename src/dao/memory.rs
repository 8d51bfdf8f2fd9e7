//! In-memory [`ContestStore`] used by tests and storage-less local runs.
//!
//! State is volatile; the process forgets everything on restart. The
//! compare-and-swap semantics match the MongoDB backend so services behave
//! identically against either.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    contest_store::ContestStore,
    models::{AuditEntryEntity, ContestEntity, SubmissionEntity, TeamEntity},
    storage::StorageResult,
};

#[derive(Default)]
struct MemoryInner {
    contests: HashMap<Uuid, ContestEntity>,
    teams: HashMap<Uuid, TeamEntity>,
    submissions: HashMap<Uuid, SubmissionEntity>,
    audit: Vec<AuditEntryEntity>,
}

/// Volatile store backed by process memory.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Audit entries recorded so far, oldest first. Test hook.
    pub fn audit_log(&self) -> Vec<AuditEntryEntity> {
        self.inner.lock().expect("memory store poisoned").audit.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().expect("memory store poisoned")
    }
}

impl ContestStore for MemoryStore {
    fn save_contest(&self, contest: ContestEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.lock().contests.insert(contest.id, contest);
            Ok(())
        })
    }

    fn find_contest(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<ContestEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.lock().contests.get(&id).cloned()) })
    }

    fn replace_contest(
        &self,
        contest: ContestEntity,
        expected_version: u32,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let mut guard = store.lock();
            match guard.contests.get(&contest.id) {
                Some(current) if current.version == expected_version => {
                    guard.contests.insert(contest.id, contest);
                    Ok(true)
                }
                _ => Ok(false),
            }
        })
    }

    fn save_team(&self, team: TeamEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.lock().teams.insert(team.id, team);
            Ok(())
        })
    }

    fn find_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.lock().teams.get(&id).cloned()) })
    }

    fn replace_team(
        &self,
        team: TeamEntity,
        expected_version: u32,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let mut guard = store.lock();
            match guard.teams.get(&team.id) {
                Some(current) if current.version == expected_version => {
                    guard.teams.insert(team.id, team);
                    Ok(true)
                }
                _ => Ok(false),
            }
        })
    }

    fn insert_submission(
        &self,
        submission: SubmissionEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.lock().submissions.insert(submission.id, submission);
            Ok(())
        })
    }

    fn find_submission(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SubmissionEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.lock().submissions.get(&id).cloned()) })
    }

    fn list_submissions(
        &self,
        team_id: Uuid,
        problem_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<SubmissionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let guard = store.lock();
            let mut matching: Vec<_> = guard
                .submissions
                .values()
                .filter(|s| s.team_id == team_id && s.problem_id == problem_id)
                .cloned()
                .collect();
            matching.sort_by_key(|s| s.submitted_at);
            Ok(matching)
        })
    }

    fn list_unsettled_submissions(
        &self,
    ) -> BoxFuture<'static, StorageResult<Vec<SubmissionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let guard = store.lock();
            let mut unsettled: Vec<_> = guard
                .submissions
                .values()
                .filter(|s| !s.status.is_terminal())
                .cloned()
                .collect();
            unsettled.sort_by_key(|s| s.submitted_at);
            Ok(unsettled)
        })
    }

    fn replace_submission(
        &self,
        submission: SubmissionEntity,
        expected_version: u32,
        audit: AuditEntryEntity,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let mut guard = store.lock();
            match guard.submissions.get(&submission.id) {
                Some(current) if current.version == expected_version => {
                    // Mutation and audit land under the same lock, the
                    // in-memory equivalent of a single transaction.
                    guard.submissions.insert(submission.id, submission);
                    guard.audit.push(audit);
                    Ok(true)
                }
                _ => Ok(false),
            }
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::dao::models::{AuditAction, SubmissionStatus};

    fn contest() -> ContestEntity {
        let now = SystemTime::now();
        ContestEntity {
            id: Uuid::new_v4(),
            name: "round".into(),
            start_time: now,
            end_time: now,
            is_paused: false,
            paused_at: None,
            is_frozen: false,
            version: 0,
        }
    }

    #[tokio::test]
    async fn replace_contest_is_compare_and_swap() {
        let store = MemoryStore::new();
        let mut c = contest();
        store.save_contest(c.clone()).await.unwrap();

        c.is_paused = true;
        c.paused_at = Some(SystemTime::now());
        c.version = 1;
        assert!(store.replace_contest(c.clone(), 0).await.unwrap());

        // Stale expected version must not overwrite.
        c.is_frozen = true;
        c.version = 2;
        assert!(!store.replace_contest(c, 0).await.unwrap());
    }

    #[tokio::test]
    async fn replace_submission_records_audit_atomically() {
        let store = MemoryStore::new();
        let now = SystemTime::now();
        let submission = SubmissionEntity {
            id: Uuid::new_v4(),
            team_id: Uuid::new_v4(),
            problem_id: "p1".into(),
            status: SubmissionStatus::Pending,
            can_retry: false,
            retry: None,
            submitted_at: now,
            updated_at: now,
            version: 0,
        };
        store.insert_submission(submission.clone()).await.unwrap();

        let mut graded = submission.clone();
        graded.status = SubmissionStatus::Accepted;
        graded.version = 1;
        let audit = AuditEntryEntity {
            id: Uuid::new_v4(),
            action: AuditAction::SubmissionGraded,
            actor_id: Uuid::new_v4(),
            actor_role: "JURY".into(),
            submission_id: Some(submission.id),
            contest_id: None,
            detail: Some("ACCEPTED".into()),
            at: now,
        };

        assert!(store.replace_submission(graded, 0, audit).await.unwrap());
        assert_eq!(store.audit_log().len(), 1);

        // A failed swap must not append an audit entry.
        let mut stale = submission;
        stale.version = 9;
        let audit = AuditEntryEntity {
            id: Uuid::new_v4(),
            action: AuditAction::SubmissionGraded,
            actor_id: Uuid::new_v4(),
            actor_role: "JURY".into(),
            submission_id: None,
            contest_id: None,
            detail: None,
            at: now,
        };
        assert!(!store.replace_submission(stale, 5, audit).await.unwrap());
        assert_eq!(store.audit_log().len(), 1);
    }
}
