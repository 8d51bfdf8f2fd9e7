/// Persistence trait consumed by the service layer.
pub mod contest_store;
/// Volatile in-memory backend for tests and storage-less runs.
pub mod memory;
/// Database model definitions.
pub mod models;
/// MongoDB backend.
#[cfg(feature = "mongo-store")]
pub mod mongodb;
/// Storage abstraction layer for database operations.
pub mod storage;
