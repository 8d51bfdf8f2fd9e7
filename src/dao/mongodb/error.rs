use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

/// Result alias for MongoDB-backed operations.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Failures raised by the MongoDB backend.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// The connection URI did not parse.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    /// A required environment variable is unset.
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    /// The driver rejected the parsed options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    /// The server never answered the connection ping.
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    /// A periodic liveness ping failed.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    /// Creating a collection index failed.
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    /// Writing a contest failed.
    #[error("failed to save contest `{id}`")]
    SaveContest {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    /// Reading a contest failed.
    #[error("failed to load contest `{id}`")]
    LoadContest {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    /// Writing a team failed.
    #[error("failed to save team `{id}`")]
    SaveTeam {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    /// Reading a team failed.
    #[error("failed to load team `{id}`")]
    LoadTeam {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    /// Inserting a submission failed.
    #[error("failed to insert submission `{id}`")]
    InsertSubmission {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    /// Reading a submission failed.
    #[error("failed to load submission `{id}`")]
    LoadSubmission {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    /// A submission query failed.
    #[error("failed to list submissions")]
    ListSubmissions {
        #[source]
        source: MongoError,
    },
    /// The submission-plus-audit transaction failed.
    #[error("failed to commit grading transaction for submission `{id}`")]
    GradingTransaction {
        id: Uuid,
        #[source]
        source: MongoError,
    },
}
