use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    models::{AuditEntryEntity, ContestEntity, SubmissionEntity, TeamEntity},
    storage::StorageResult,
};

/// Abstraction over the persistence layer for contests, teams, submissions
/// and the audit log.
///
/// `replace_*` methods are compare-and-swap: they only write when the
/// stored `version` matches `expected_version` and report whether the swap
/// happened, so concurrent admin actions never tear paired fields apart.
/// `replace_submission` commits the audit entry in the same transaction as
/// the submission mutation.
pub trait ContestStore: Send + Sync {
    /// Insert or overwrite a contest unconditionally.
    fn save_contest(&self, contest: ContestEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Load a contest by id.
    fn find_contest(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<ContestEntity>>>;
    /// Compare-and-swap a contest keyed on `expected_version`.
    fn replace_contest(
        &self,
        contest: ContestEntity,
        expected_version: u32,
    ) -> BoxFuture<'static, StorageResult<bool>>;

    /// Insert or overwrite a team unconditionally.
    fn save_team(&self, team: TeamEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Load a team by id.
    fn find_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>>;
    /// Compare-and-swap a team keyed on `expected_version`.
    fn replace_team(
        &self,
        team: TeamEntity,
        expected_version: u32,
    ) -> BoxFuture<'static, StorageResult<bool>>;

    /// Append a freshly accepted submission.
    fn insert_submission(
        &self,
        submission: SubmissionEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Load a submission by id.
    fn find_submission(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SubmissionEntity>>>;
    /// All submissions of one team for one problem, oldest first.
    fn list_submissions(
        &self,
        team_id: Uuid,
        problem_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<SubmissionEntity>>>;
    /// Submissions still awaiting a verdict, oldest first.
    fn list_unsettled_submissions(
        &self,
    ) -> BoxFuture<'static, StorageResult<Vec<SubmissionEntity>>>;
    /// Compare-and-swap a submission and append `audit` in one transaction.
    fn replace_submission(
        &self,
        submission: SubmissionEntity,
        expected_version: u32,
        audit: AuditEntryEntity,
    ) -> BoxFuture<'static, StorageResult<bool>>;

    /// Cheap liveness probe against the backend.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Rebuild the backend connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
