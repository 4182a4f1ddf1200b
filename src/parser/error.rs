use std::path::PathBuf;

use thiserror::Error;

use crate::version::error::ParseConstraintError;

/// Errors raised while reading project files
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid requirement for {name}: {source}")]
    InvalidRequirement {
        name: String,
        #[source]
        source: ParseConstraintError,
    },

    #[error("Invalid minimum-stability \"{0}\"")]
    InvalidStability(String),

    #[error("Invalid check-updates configuration: {0}")]
    InvalidConfig(#[source] serde_json::Error),
}
