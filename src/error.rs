use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("configuration file not found in '{0}'")]
    NotFound(PathBuf),
    #[error("no ID token verification key in '{0}' and ID_TOKEN_SECRET isn't set")]
    MissingVerificationKey(PathBuf),
    #[error("invalid ID token verification key: {0}")]
    InvalidKey(#[source] jsonwebtoken::errors::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no such document: {collection}/{id}")]
    NotFound { collection: String, id: String },
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    // External errors
    #[error(transparent)]
    Database(#[from] mongodb::error::Error),
    #[error(transparent)]
    BsonSerialize(#[from] bson::ser::Error),
    #[error(transparent)]
    BsonDeserialize(#[from] bson::de::Error),
}

impl StoreError {
    pub fn not_found(collection: impl ToString, id: impl ToString) -> StoreError {
        StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("ID token rejected: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("ID token has no subject")]
    MissingSubject,
    #[error("identity provider failure: {0}")]
    Provider(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Auth(#[from] AuthError),

    // External errors
    #[error(transparent)]
    Database(#[from] mongodb::error::Error),
}
