//! MongoDB-backed implementation of the contest store.

/// Connection configuration resolved from a URI or the environment.
pub mod config;
mod connection;
/// MongoDB-specific error types.
pub mod error;
mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoContestStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
