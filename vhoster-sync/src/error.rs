//! Error types for vhoster-sync.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use vhoster_core::error::RegistryError;
use vhoster_renderer::RenderError;

/// Errors from writing or removing site artifacts.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the rendering engine.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// An error from the registry.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Certificate generation failed.
    #[error("certificate error for {host}: {source}")]
    Certificate {
        host: String,
        #[source]
        source: rcgen::Error,
    },

    /// A certificate file could not be decoded.
    #[error("invalid certificate file {path}")]
    InvalidCertificate { path: PathBuf },

    /// An external command exited unsuccessfully.
    #[error("`{command}` failed ({status}): {stderr}")]
    Process {
        command: String,
        status: String,
        stderr: String,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

/// Which unique key another site already holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    /// Full host name, e.g. `app.test`.
    Domain(String),
    Path(PathBuf),
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conflict::Domain(host) => write!(f, "a site has already been registered to: {host}"),
            Conflict::Path(path) => {
                write!(f, "a site has already been linked to path: {}", path.display())
            }
        }
    }
}

/// Errors surfaced by [`crate::site::Site`] operations.
#[derive(Debug, Error)]
pub enum SiteError {
    /// Another record already claims the domain+tld or the path.
    #[error("{0}")]
    Exists(Conflict),

    /// A lookup that requires an existing site came up empty.
    #[error("{0}")]
    NotFound(String),

    /// Required fields are missing at save time.
    #[error("property '{0}' must not be empty")]
    Validation(&'static str),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl SiteError {
    /// Lookup miss, worded after whichever key the caller searched by.
    pub fn not_found(domain: Option<&str>, path: Option<&std::path::Path>) -> Self {
        let message = match (domain.filter(|d| !d.is_empty()), path) {
            (Some(domain), _) => format!("no site is registered to: {domain}"),
            (None, Some(path)) => format!("no site linked to path: {}", path.display()),
            (None, None) => "site not found".to_string(),
        };
        SiteError::NotFound(message)
    }
}
