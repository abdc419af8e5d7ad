//! Site registry backed by a single JSON settings document.
//!
//! # Storage layout
//!
//! ```text
//! ~/.vhoster/
//!   config.json     (settings + sites: mode 0600)
//!   conf/           (default per-site Apache stanzas)
//!   certs/          (default certificate directory)
//!   templates/      (optional user template overrides)
//! ```
//!
//! # API pattern
//!
//! Functions touching the home directory have two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::error::{ConfigProblem, RegistryError};
use crate::types::{Document, Settings, SiteId, SitePatch, SiteQuery, SiteRecord, StoredSite};

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.vhoster/`: pure, no I/O.
pub fn data_dir_at(home: &Path) -> PathBuf {
    home.join(".vhoster")
}

/// `<home>/.vhoster/config.json`: pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    data_dir_at(home).join("config.json")
}

/// `config_path_at` convenience wrapper.
pub fn config_path() -> Result<PathBuf, RegistryError> {
    Ok(config_path_at(&home()?))
}

// ---------------------------------------------------------------------------
// 2. Document load / save (atomic)
// ---------------------------------------------------------------------------

/// Load the settings document at `path`.
///
/// Returns `RegistryError::ConfigNotFound` if absent,
/// `RegistryError::InvalidConfig` (with path) if unreadable or malformed JSON.
pub fn load_document(path: &Path) -> Result<Document, RegistryError> {
    let invalid = |source| RegistryError::InvalidConfig { path: path.to_path_buf(), source };
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(RegistryError::ConfigNotFound { path: path.to_path_buf() });
        }
        Err(e) => return Err(invalid(ConfigProblem::Read(e))),
    };
    let mut doc: Document =
        serde_json::from_str(&contents).map_err(|e| invalid(ConfigProblem::Parse(e)))?;
    doc.settings.normalize();
    for stored in &mut doc.sites {
        stored.record.normalize();
    }
    Ok(doc)
}

/// Atomically save the settings document to `path`.
///
/// Write flow: serialize → `config.json.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_document(path: &Path, doc: &Document) -> Result<(), RegistryError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
            set_dir_permissions(parent)?;
        }
    }
    let tmp_path = path.with_extension("json.tmp");

    let json = serde_json::to_string_pretty(doc)?;
    std::fs::write(&tmp_path, json)?;
    set_file_permissions(&tmp_path)?;
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    tracing::debug!("saved registry: {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// 3. Setup
// ---------------------------------------------------------------------------

/// Write `settings` to `<home>/.vhoster/config.json`.
///
/// Sites already registered in an existing document are kept.
pub fn setup_at(home: &Path, settings: Settings) -> Result<PathBuf, RegistryError> {
    let path = config_path_at(home);
    let mut doc = match load_document(&path) {
        Ok(doc) => doc,
        Err(RegistryError::ConfigNotFound { .. }) => Document::default(),
        Err(e) => return Err(e),
    };
    doc.settings = settings;
    save_document(&path, &doc)?;
    Ok(path)
}

/// `setup_at` convenience wrapper.
pub fn setup(settings: Settings) -> Result<PathBuf, RegistryError> {
    setup_at(&home()?, settings)
}

// ---------------------------------------------------------------------------
// 4. SiteStore
// ---------------------------------------------------------------------------

/// Ordered collection of site records persisted in the settings document.
///
/// Every mutation rewrites the whole document before returning.
#[derive(Debug, Clone)]
pub struct SiteStore {
    path: PathBuf,
    settings: Settings,
    next_id: u64,
    sites: IndexMap<SiteId, SiteRecord>,
}

impl SiteStore {
    /// Open the store at `<home>/.vhoster/config.json`.
    pub fn open_at(home: &Path) -> Result<Self, RegistryError> {
        Self::from_path(config_path_at(home))
    }

    /// `open_at` convenience wrapper.
    pub fn open() -> Result<Self, RegistryError> {
        Self::open_at(&home()?)
    }

    /// Open the store backed by the document at `path`.
    ///
    /// Records without an id (older documents) receive one in storage order.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let path = path.into();
        let doc = load_document(&path)?;

        let mut next_id = doc.next_id;
        for stored in &doc.sites {
            if let Some(id) = stored.id {
                next_id = next_id.max(id.0 + 1);
            }
        }

        let mut sites = IndexMap::with_capacity(doc.sites.len());
        for stored in doc.sites {
            let id = match stored.id {
                Some(id) if !sites.contains_key(&id) => id,
                _ => {
                    let id = SiteId(next_id);
                    next_id += 1;
                    id
                }
            };
            sites.insert(id, stored.record);
        }

        Ok(Self { path, settings: doc.settings, next_id, sites })
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Registry-wide default TLD.
    pub fn default_tld(&self) -> &str {
        &self.settings.tld
    }

    /// Directory the backing document lives in (`~/.vhoster`).
    pub fn data_dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Directory for per-site Apache stanzas.
    pub fn conf_dir(&self) -> PathBuf {
        self.resolve_dir(self.settings.paths.conf.as_deref(), "conf")
    }

    /// Directory for site certificates.
    pub fn certs_dir(&self) -> PathBuf {
        self.resolve_dir(self.settings.paths.certs.as_deref(), "certs")
    }

    /// Directory scanned for user template overrides.
    pub fn templates_dir(&self) -> PathBuf {
        self.resolve_dir(self.settings.paths.templates.as_deref(), "templates")
    }

    fn resolve_dir(&self, configured: Option<&Path>, fallback: &str) -> PathBuf {
        let data_dir = self.data_dir();
        match configured {
            Some(dir) => crate::types::absolutize(&data_dir, dir),
            None => data_dir.join(fallback),
        }
    }

    /// Find a site.
    ///
    /// A present `query.id` is returned directly. Otherwise records are scanned
    /// in storage order; the first record matching by path, or by domain under
    /// the same effective TLD, wins. `query.ignore` never matches.
    pub fn find(&self, query: &SiteQuery) -> Option<(SiteId, SiteRecord)> {
        if let Some(id) = query.id {
            if let Some(record) = self.sites.get(&id) {
                return Some((id, record.clone()));
            }
        }
        let default_tld = self.default_tld();
        self.sites
            .iter()
            .filter(|(id, _)| query.ignore != Some(**id))
            .find(|(_, record)| query.matches(record, default_tld))
            .map(|(id, record)| (*id, record.clone()))
    }

    pub fn get(&self, id: SiteId) -> Option<&SiteRecord> {
        self.sites.get(&id)
    }

    /// Append a record and persist. Returns the new id.
    pub fn create(&mut self, record: SiteRecord) -> Result<SiteId, RegistryError> {
        let id = SiteId(self.next_id);
        let mut sites = self.sites.clone();
        sites.insert(id, record);
        self.commit(self.next_id + 1, sites)?;
        Ok(id)
    }

    /// Merge `patch` into the record at `id` and persist.
    pub fn update(&mut self, id: SiteId, patch: SitePatch) -> Result<SiteId, RegistryError> {
        let mut sites = self.sites.clone();
        let record = sites.get_mut(&id).ok_or(RegistryError::NotFound(id))?;
        patch.apply(record);
        self.commit(self.next_id, sites)?;
        Ok(id)
    }

    /// Remove the record at `id` (order of the others is kept) and persist.
    pub fn delete(&mut self, id: SiteId) -> Result<SiteId, RegistryError> {
        let mut sites = self.sites.clone();
        sites.shift_remove(&id).ok_or(RegistryError::NotFound(id))?;
        self.commit(self.next_id, sites)?;
        Ok(id)
    }

    /// Independent copy of every record, in storage order.
    pub fn all(&self) -> Vec<(SiteId, SiteRecord)> {
        self.sites.iter().map(|(id, r)| (*id, r.clone())).collect()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Persist the candidate state; memory only changes once the write lands.
    fn commit(&mut self, next_id: u64, sites: IndexMap<SiteId, SiteRecord>) -> Result<(), RegistryError> {
        let doc = Document {
            settings: self.settings.clone(),
            next_id,
            sites: sites
                .iter()
                .map(|(id, record)| StoredSite { id: Some(*id), record: record.clone() })
                .collect(),
        };
        save_document(&self.path, &doc)?;
        self.next_id = next_id;
        self.sites = sites;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, RegistryError> {
    dirs::home_dir().ok_or(RegistryError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), RegistryError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), RegistryError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), RegistryError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), RegistryError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
