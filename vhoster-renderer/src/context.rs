//! Template context: serializable rendering payload for one site stanza.

use std::path::Path;

use serde::{Deserialize, Serialize};

use vhoster_core::types::SiteRecord;

use crate::error::RenderError;

/// Values available to `site.conf.tera`.
///
/// Field names match the keys older user templates were written against
/// (`domain`, `url`, `path`, `cert`, `certkey`, `secure`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteContext {
    /// Full host name, e.g. `app.test`.
    pub domain: String,
    /// `http(s)://<domain>`
    pub url: String,
    /// Absolute document root.
    pub path: String,
    pub secure: bool,
    /// Certificate file, rendered only when `secure`.
    pub cert: String,
    pub certkey: String,
}

impl SiteContext {
    /// Build the context for `record` with certificate files `cert` / `key`.
    pub fn from_record(record: &SiteRecord, default_tld: &str, cert: &Path, key: &Path) -> Self {
        let domain = record.host_name(default_tld);
        let scheme = if record.secure { "https" } else { "http" };
        Self {
            url: format!("{scheme}://{domain}"),
            domain,
            path: display_path(&record.document_root()),
            secure: record.secure,
            cert: display_path(cert),
            certkey: display_path(key),
        }
    }

    /// Convert to a [`tera::Context`] for rendering.
    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}

/// Apache accepts forward slashes on every platform.
fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
