use mongodb::options::ClientOptions;

use super::error::{MongoDaoError, MongoResult};

const DEFAULT_DB: &str = "contest_live";

/// Parsed client options plus the database the store operates on.
#[derive(Clone, Debug)]
pub struct MongoConfig {
    /// Driver options parsed from the connection URI.
    pub options: ClientOptions,
    /// Name of the database holding the contest collections.
    pub database_name: String,
}

impl MongoConfig {
    /// Parse a connection URI, targeting `db_name` or the default database.
    pub async fn from_uri(uri: &str, db_name: Option<&str>) -> MongoResult<Self> {
        let database_name = db_name.unwrap_or(DEFAULT_DB).to_owned();
        let options =
            ClientOptions::parse(uri)
                .await
                .map_err(|source| MongoDaoError::InvalidUri {
                    uri: uri.to_owned(),
                    source,
                })?;

        Ok(Self {
            options,
            database_name,
        })
    }

    /// Read the connection settings from `MONGO_URI` (required) and
    /// `MONGO_DB` (optional).
    pub async fn from_env() -> MongoResult<Self> {
        let uri = std::env::var("MONGO_URI")
            .map_err(|_| MongoDaoError::MissingEnvVar { var: "MONGO_URI" })?;
        let db = std::env::var("MONGO_DB").ok();
        Self::from_uri(&uri, db.as_deref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn from_env_requires_the_uri_variable() {
        unsafe { std::env::remove_var("MONGO_URI") };

        let err = MongoConfig::from_env().await.unwrap_err();
        assert!(matches!(
            err,
            MongoDaoError::MissingEnvVar { var: "MONGO_URI" }
        ));
    }

    #[tokio::test]
    async fn from_uri_falls_back_to_the_default_database() {
        let config = MongoConfig::from_uri("mongodb://localhost:27017", None)
            .await
            .unwrap();
        assert_eq!(config.database_name, DEFAULT_DB);

        let config = MongoConfig::from_uri("mongodb://localhost:27017", Some("finals"))
            .await
            .unwrap();
        assert_eq!(config.database_name, "finals");
    }
}
