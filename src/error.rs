//! Error types shared by the ingestion and query paths.

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Document store driver error
    #[error("document store error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("could not encode document: {0}")]
    BsonSerialize(#[from] mongodb::bson::ser::Error),

    #[error("could not decode document: {0}")]
    BsonDeserialize(#[from] mongodb::bson::de::Error),

    /// A collaborator (cache, queue, hook) reported a failure
    #[error("upstream failure: {0}")]
    Upstream(String),

    #[error("match not found")]
    MatchNotFound { match_id: u64 },

    /// A cached value could not be decoded. Never falls back to a rebuild.
    #[error("corrupt cache entry for {key}: {source}")]
    CacheCorruption {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The inner parse job failed; the message is relayed verbatim
    #[error("{0}")]
    JobFailed(String),

    #[error("invalid steam id: {0}")]
    InvalidSteamId(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn upstream(err: impl std::fmt::Display) -> Self {
        Error::Upstream(err.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::MatchNotFound { .. })
    }
}
