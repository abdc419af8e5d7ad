//! Error types for vhoster-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::SiteId;

/// All errors that can arise from registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error (write/save path).
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// The settings document exists but could not be read or parsed.
    #[error("invalid configuration at {path}: {source}")]
    InvalidConfig {
        path: PathBuf,
        #[source]
        source: ConfigProblem,
    },

    /// The settings document does not exist yet.
    #[error("configuration not found at {path}; run `vhoster setup` first")]
    ConfigNotFound { path: PathBuf },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// No record is stored under the given id.
    #[error("cannot find site with ID: {0}")]
    NotFound(SiteId),
}

/// Why an existing settings document was rejected.
#[derive(Debug, Error)]
pub enum ConfigProblem {
    #[error("unreadable: {0}")]
    Read(#[source] std::io::Error),

    #[error("{0}")]
    Parse(#[source] serde_json::Error),
}
