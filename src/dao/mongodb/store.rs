use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{Client, Collection, Database, bson::doc, options::IndexOptions};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
};
use crate::dao::{
    contest_store::ContestStore,
    models::{AuditEntryEntity, ContestEntity, SubmissionEntity, TeamEntity},
    storage::StorageResult,
};

const CONTEST_COLLECTION_NAME: &str = "contests";
const TEAM_COLLECTION_NAME: &str = "teams";
const SUBMISSION_COLLECTION_NAME: &str = "submissions";
const AUDIT_COLLECTION_NAME: &str = "audit_log";

/// Contest store backed by MongoDB collections, sharing one reconnectable
/// client across clones.
#[derive(Clone)]
pub struct MongoContestStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoContestStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        let submissions =
            database.collection::<mongodb::bson::Document>(SUBMISSION_COLLECTION_NAME);
        let sibling_index = mongodb::IndexModel::builder()
            .keys(doc! {"team_id": 1, "problem_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("submission_sibling_idx".to_owned()))
                    .build(),
            )
            .build();
        submissions
            .create_index(sibling_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: SUBMISSION_COLLECTION_NAME,
                index: "team_id,problem_id",
                source,
            })?;

        let status_index = mongodb::IndexModel::builder()
            .keys(doc! {"status": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("submission_status_idx".to_owned()))
                    .build(),
            )
            .build();
        submissions
            .create_index(status_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: SUBMISSION_COLLECTION_NAME,
                index: "status",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn client(&self) -> Client {
        let guard = self.inner.state.read().await;
        guard.client.clone()
    }

    async fn contests(&self) -> Collection<ContestEntity> {
        self.database()
            .await
            .collection::<ContestEntity>(CONTEST_COLLECTION_NAME)
    }

    async fn teams(&self) -> Collection<TeamEntity> {
        self.database()
            .await
            .collection::<TeamEntity>(TEAM_COLLECTION_NAME)
    }

    async fn submissions(&self) -> Collection<SubmissionEntity> {
        self.database()
            .await
            .collection::<SubmissionEntity>(SUBMISSION_COLLECTION_NAME)
    }

    async fn audit(&self) -> Collection<AuditEntryEntity> {
        self.database()
            .await
            .collection::<AuditEntryEntity>(AUDIT_COLLECTION_NAME)
    }

    async fn save_contest(&self, contest: ContestEntity) -> MongoResult<()> {
        let id = contest.id;
        self.contests()
            .await
            .replace_one(id_filter(id), &contest)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveContest { id, source })?;
        Ok(())
    }

    async fn find_contest(&self, id: Uuid) -> MongoResult<Option<ContestEntity>> {
        self.contests()
            .await
            .find_one(id_filter(id))
            .await
            .map_err(|source| MongoDaoError::LoadContest { id, source })
    }

    async fn replace_contest(
        &self,
        contest: ContestEntity,
        expected_version: u32,
    ) -> MongoResult<bool> {
        let id = contest.id;
        let result = self
            .contests()
            .await
            .replace_one(versioned_filter(id, expected_version), &contest)
            .await
            .map_err(|source| MongoDaoError::SaveContest { id, source })?;
        Ok(result.matched_count > 0)
    }

    async fn save_team(&self, team: TeamEntity) -> MongoResult<()> {
        let id = team.id;
        self.teams()
            .await
            .replace_one(id_filter(id), &team)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveTeam { id, source })?;
        Ok(())
    }

    async fn find_team(&self, id: Uuid) -> MongoResult<Option<TeamEntity>> {
        self.teams()
            .await
            .find_one(id_filter(id))
            .await
            .map_err(|source| MongoDaoError::LoadTeam { id, source })
    }

    async fn replace_team(&self, team: TeamEntity, expected_version: u32) -> MongoResult<bool> {
        let id = team.id;
        let result = self
            .teams()
            .await
            .replace_one(versioned_filter(id, expected_version), &team)
            .await
            .map_err(|source| MongoDaoError::SaveTeam { id, source })?;
        Ok(result.matched_count > 0)
    }

    async fn insert_submission(&self, submission: SubmissionEntity) -> MongoResult<()> {
        let id = submission.id;
        self.submissions()
            .await
            .insert_one(&submission)
            .await
            .map_err(|source| MongoDaoError::InsertSubmission { id, source })?;
        Ok(())
    }

    async fn find_submission(&self, id: Uuid) -> MongoResult<Option<SubmissionEntity>> {
        self.submissions()
            .await
            .find_one(id_filter(id))
            .await
            .map_err(|source| MongoDaoError::LoadSubmission { id, source })
    }

    async fn list_submissions(
        &self,
        team_id: Uuid,
        problem_id: &str,
    ) -> MongoResult<Vec<SubmissionEntity>> {
        self.submissions()
            .await
            .find(doc! {"team_id": team_id.to_string(), "problem_id": problem_id})
            .sort(doc! {"submitted_at.secs_since_epoch": 1})
            .await
            .map_err(|source| MongoDaoError::ListSubmissions { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListSubmissions { source })
    }

    async fn list_unsettled_submissions(&self) -> MongoResult<Vec<SubmissionEntity>> {
        self.submissions()
            .await
            .find(doc! {"status": {"$in": ["PENDING", "UNDER_REVIEW"]}})
            .sort(doc! {"submitted_at.secs_since_epoch": 1})
            .await
            .map_err(|source| MongoDaoError::ListSubmissions { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListSubmissions { source })
    }

    /// Replace the submission and append the audit entry inside one
    /// multi-document transaction, keyed on the expected version.
    async fn replace_submission(
        &self,
        submission: SubmissionEntity,
        expected_version: u32,
        audit: AuditEntryEntity,
    ) -> MongoResult<bool> {
        let id = submission.id;
        let client = self.client().await;
        let submissions = self.submissions().await;
        let audit_collection = self.audit().await;

        let mut session = client
            .start_session()
            .await
            .map_err(|source| MongoDaoError::GradingTransaction { id, source })?;
        session
            .start_transaction()
            .await
            .map_err(|source| MongoDaoError::GradingTransaction { id, source })?;

        let result = submissions
            .replace_one(versioned_filter(id, expected_version), &submission)
            .session(&mut session)
            .await
            .map_err(|source| MongoDaoError::GradingTransaction { id, source })?;

        if result.matched_count == 0 {
            session
                .abort_transaction()
                .await
                .map_err(|source| MongoDaoError::GradingTransaction { id, source })?;
            return Ok(false);
        }

        audit_collection
            .insert_one(&audit)
            .session(&mut session)
            .await
            .map_err(|source| MongoDaoError::GradingTransaction { id, source })?;

        session
            .commit_transaction()
            .await
            .map_err(|source| MongoDaoError::GradingTransaction { id, source })?;

        Ok(true)
    }
}

fn id_filter(id: Uuid) -> mongodb::bson::Document {
    doc! {"id": id.to_string()}
}

fn versioned_filter(id: Uuid, expected_version: u32) -> mongodb::bson::Document {
    doc! {"id": id.to_string(), "version": expected_version as i64}
}

impl ContestStore for MongoContestStore {
    fn save_contest(&self, contest: ContestEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_contest(contest).await.map_err(Into::into) })
    }

    fn find_contest(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<ContestEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_contest(id).await.map_err(Into::into) })
    }

    fn replace_contest(
        &self,
        contest: ContestEntity,
        expected_version: u32,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .replace_contest(contest, expected_version)
                .await
                .map_err(Into::into)
        })
    }

    fn save_team(&self, team: TeamEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_team(team).await.map_err(Into::into) })
    }

    fn find_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_team(id).await.map_err(Into::into) })
    }

    fn replace_team(
        &self,
        team: TeamEntity,
        expected_version: u32,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .replace_team(team, expected_version)
                .await
                .map_err(Into::into)
        })
    }

    fn insert_submission(
        &self,
        submission: SubmissionEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_submission(submission).await.map_err(Into::into) })
    }

    fn find_submission(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SubmissionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_submission(id).await.map_err(Into::into) })
    }

    fn list_submissions(
        &self,
        team_id: Uuid,
        problem_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<SubmissionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_submissions(team_id, &problem_id)
                .await
                .map_err(Into::into)
        })
    }

    fn list_unsettled_submissions(
        &self,
    ) -> BoxFuture<'static, StorageResult<Vec<SubmissionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_unsettled_submissions().await.map_err(Into::into) })
    }

    fn replace_submission(
        &self,
        submission: SubmissionEntity,
        expected_version: u32,
        audit: AuditEntryEntity,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .replace_submission(submission, expected_version, audit)
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
