use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error("Invalid cached metadata: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Rate limited: retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Package not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid version string \"{0}\"")]
pub struct ParseVersionError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseConstraintError {
    #[error("Empty version constraint")]
    Empty,

    #[error("Could not parse version constraint \"{constraint}\": {source}")]
    InvalidVersion {
        constraint: String,
        #[source]
        source: ParseVersionError,
    },

    #[error("Could not parse version constraint \"{0}\"")]
    Malformed(String),
}
