//! Domain types for the vhoster registry.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.
//! The settings document is serialized with serde + serde_json.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// TLD used when neither the site nor the settings document name one.
pub const DEFAULT_TLD: &str = "test";

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Stable identifier of a stored site. Handed out from a monotonic counter and
/// never reused, so deleting one site never invalidates another site's id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(pub u64);

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for SiteId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

// ---------------------------------------------------------------------------
// Site records
// ---------------------------------------------------------------------------

/// One registered virtual host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRecord {
    pub domain: String,
    /// Absolute path to the site directory.
    pub path: PathBuf,
    /// Document root, relative to `path` or absolute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    #[serde(default)]
    pub secure: bool,
    /// Per-site TLD override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tld: Option<String>,
}

impl SiteRecord {
    pub fn new(domain: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            domain: domain.into(),
            path: path.into(),
            root: None,
            secure: false,
            tld: None,
        }
    }

    /// `tld` if set, else `default`.
    pub fn effective_tld<'a>(&'a self, default: &'a str) -> &'a str {
        self.tld.as_deref().unwrap_or(default)
    }

    /// `<domain>.<effective tld>`
    pub fn host_name(&self, default_tld: &str) -> String {
        format!("{}.{}", self.domain, self.effective_tld(default_tld))
    }

    /// `path/root` if a root is set, else `path`.
    pub fn document_root(&self) -> PathBuf {
        match &self.root {
            Some(root) => self.path.join(root),
            None => self.path.clone(),
        }
    }

    /// Older documents store "no root" as `""` and "no tld" as `""`.
    pub(crate) fn normalize(&mut self) {
        if self.root.as_deref().is_some_and(|r| r.as_os_str().is_empty()) {
            self.root = None;
        }
        if self.tld.as_deref().is_some_and(str::is_empty) {
            self.tld = None;
        }
    }
}

/// Partial update merged into an existing [`SiteRecord`].
///
/// `root` and `tld` are doubly optional: `Some(None)` clears the field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SitePatch {
    pub domain: Option<String>,
    pub path: Option<PathBuf>,
    pub root: Option<Option<PathBuf>>,
    pub secure: Option<bool>,
    pub tld: Option<Option<String>>,
}

impl SitePatch {
    pub fn apply(self, record: &mut SiteRecord) {
        if let Some(domain) = self.domain {
            record.domain = domain;
        }
        if let Some(path) = self.path {
            record.path = path;
        }
        if let Some(root) = self.root {
            record.root = root;
        }
        if let Some(secure) = self.secure {
            record.secure = secure;
        }
        if let Some(tld) = self.tld {
            record.tld = tld;
        }
    }
}

impl From<SiteRecord> for SitePatch {
    fn from(r: SiteRecord) -> Self {
        Self {
            domain: Some(r.domain),
            path: Some(r.path),
            root: Some(r.root),
            secure: Some(r.secure),
            tld: Some(r.tld),
        }
    }
}

/// Lookup parameters for [`crate::registry::SiteStore::find`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteQuery {
    pub id: Option<SiteId>,
    pub domain: Option<String>,
    pub path: Option<PathBuf>,
    pub tld: Option<String>,
    /// Never match this id (self-exclusion while checking uniqueness).
    pub ignore: Option<SiteId>,
}

impl SiteQuery {
    pub fn id(id: SiteId) -> Self {
        Self { id: Some(id), ..Self::default() }
    }

    pub fn domain(domain: impl Into<String>) -> Self {
        Self { domain: Some(domain.into()), ..Self::default() }
    }

    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self { path: Some(path.into()), ..Self::default() }
    }

    pub fn with_tld(mut self, tld: Option<String>) -> Self {
        self.tld = tld;
        self
    }

    pub fn ignoring(mut self, id: Option<SiteId>) -> Self {
        self.ignore = id;
        self
    }

    /// Path equality, or the same full host name (`<domain>.<tld>`).
    ///
    /// `app.dev` under TLD `test` and `app` under TLD `dev.test` are the same
    /// host, so they match each other.
    pub fn matches(&self, record: &SiteRecord, default_tld: &str) -> bool {
        if self.path.as_deref().is_some_and(|p| p == record.path.as_path()) {
            return true;
        }
        match &self.domain {
            Some(domain) => {
                let tld = self.tld.as_deref().unwrap_or(default_tld);
                format!("{domain}.{tld}") == record.host_name(default_tld)
            }
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Settings document
// ---------------------------------------------------------------------------

/// How site stanzas reach the Apache master configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConfLayout {
    /// One file per site plus an `Include "<file>"` line in the master conf.
    #[default]
    Include,
    /// Stanza written into the master conf between `## StartHost` markers.
    Inline,
}

impl fmt::Display for ConfLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfLayout::Include => write!(f, "include"),
            ConfLayout::Inline => write!(f, "inline"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsSettings {
    /// Hosts file receiving `127.0.0.1 <host> #VirtualHost` lines.
    pub file: PathBuf,
}

impl Default for DnsSettings {
    fn default() -> Self {
        let file = if cfg!(windows) {
            PathBuf::from(r"C:\Windows\System32\drivers\etc\hosts")
        } else {
            PathBuf::from("/etc/hosts")
        };
        Self { file }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApacheSettings {
    /// Apache daemon binary (`httpd`).
    pub bin: PathBuf,
    /// Master configuration file.
    pub conf: PathBuf,
    #[serde(default)]
    pub layout: ConfLayout,
}

impl Default for ApacheSettings {
    fn default() -> Self {
        Self {
            bin: PathBuf::from("httpd"),
            conf: PathBuf::from("/etc/httpd/conf/httpd.conf"),
            layout: ConfLayout::default(),
        }
    }
}

/// Directory overrides; `None` falls back to `~/.vhoster/<name>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conf: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certs: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templates: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsSettings {
    /// Add generated certificates to the OS trust store.
    pub trust: bool,
}

impl Default for TlsSettings {
    fn default() -> Self {
        Self { trust: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NgrokSettings {
    pub bin: PathBuf,
    pub port: u16,
}

impl Default for NgrokSettings {
    fn default() -> Self {
        Self { bin: PathBuf::from("ngrok"), port: 80 }
    }
}

/// Registry-wide settings, resolved once when the document is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_tld")]
    pub tld: String,
    #[serde(default)]
    pub dns: DnsSettings,
    #[serde(default)]
    pub apache: ApacheSettings,
    #[serde(default)]
    pub paths: PathSettings,
    #[serde(default)]
    pub tls: TlsSettings,
    #[serde(default)]
    pub ngrok: NgrokSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tld: default_tld(),
            dns: DnsSettings::default(),
            apache: ApacheSettings::default(),
            paths: PathSettings::default(),
            tls: TlsSettings::default(),
            ngrok: NgrokSettings::default(),
        }
    }
}

impl Settings {
    /// Older setup wrote `""` for "use the default directory".
    pub(crate) fn normalize(&mut self) {
        for dir in [&mut self.paths.conf, &mut self.paths.certs, &mut self.paths.templates] {
            if dir.as_deref().is_some_and(|d| d.as_os_str().is_empty()) {
                *dir = None;
            }
        }
        if self.tld.is_empty() {
            self.tld = default_tld();
        }
    }
}

fn default_tld() -> String {
    DEFAULT_TLD.to_string()
}

/// A record as persisted: ids are optional so documents written before stable
/// ids existed still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSite {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SiteId>,
    #[serde(flatten)]
    pub record: SiteRecord,
}

/// Root of the on-disk settings document (`~/.vhoster/config.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Document {
    #[serde(flatten)]
    pub settings: Settings,
    #[serde(default)]
    pub next_id: u64,
    #[serde(default)]
    pub sites: Vec<StoredSite>,
}

/// Resolve `path` against `base` unless it is already absolute.
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
