//! The site entity: one virtual host plus the artifacts derived from it.
//!
//! A [`Site`] is either bound to a stored record (it has an id) or unbound.
//! Setters on a bound site remember the value they replaced as a
//! [`PendingChange`] (first change per field only). [`Site::save`] uses those
//! old values to find and remove the artifacts written under the previous
//! identity before writing fresh ones:
//!
//! 1. remove old Apache configuration, hosts entry and certificate,
//! 2. upsert the record,
//! 3. create the certificate (secure sites), write the configuration, write the
//!    hosts entry.
//!
//! The sequence is not transactional. A failure midway leaves earlier steps in
//! place; rerunning `refresh` rewrites everything.

use std::path::{Path, PathBuf};

use vhoster_core::types::{SiteId, SitePatch, SiteQuery, SiteRecord};
use vhoster_core::SiteStore;
use vhoster_renderer::{Renderer, SiteContext};

use crate::apache::ApacheConf;
use crate::certificate::{Certificates, SelfSigned};
use crate::error::{Conflict, SiteError, SyncError};
use crate::hosts;

// ---------------------------------------------------------------------------
// Dirty tracking
// ---------------------------------------------------------------------------

/// The value a field held before it was first changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingChange {
    Domain(String),
    Path(Option<PathBuf>),
    Root(Option<PathBuf>),
    Secure(bool),
    Tld(Option<String>),
}

impl PendingChange {
    fn same_field(&self, other: &PendingChange) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// Whether a bound site has unsaved changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteState<'a> {
    Clean,
    Dirty(&'a [PendingChange]),
}

// ---------------------------------------------------------------------------
// Workspace
// ---------------------------------------------------------------------------

/// Everything a save or delete touches besides the site itself.
pub struct Workspace {
    store: SiteStore,
    renderer: Renderer,
    certificates: Box<dyn Certificates>,
}

impl Workspace {
    pub fn new(store: SiteStore, renderer: Renderer, certificates: Box<dyn Certificates>) -> Self {
        Self {
            store,
            renderer,
            certificates,
        }
    }

    /// Workspace with template overrides from the store's templates directory
    /// and self-signed certificates.
    pub fn open(store: SiteStore) -> Result<Self, SyncError> {
        let renderer = Renderer::with_overrides(&store.templates_dir())?;
        let certificates = Box::new(SelfSigned::new(store.settings().tls.trust));
        Ok(Self::new(store, renderer, certificates))
    }

    pub fn store(&self) -> &SiteStore {
        &self.store
    }

    pub fn into_store(self) -> SiteStore {
        self.store
    }
}

// ---------------------------------------------------------------------------
// Site
// ---------------------------------------------------------------------------

/// Field values for [`Site::new`]. Ignored when the lookup finds a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteDraft {
    pub id: Option<SiteId>,
    pub domain: Option<String>,
    pub path: Option<PathBuf>,
    pub root: Option<PathBuf>,
    pub secure: bool,
    pub tld: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    id: Option<SiteId>,
    domain: String,
    path: Option<PathBuf>,
    root: Option<PathBuf>,
    secure: bool,
    tld: Option<String>,
    default_tld: String,
    changes: Vec<PendingChange>,
}

impl Site {
    /// Bind to the record found by id, path, or domain+tld; otherwise build an
    /// unbound site from `draft`.
    pub fn new(store: &SiteStore, draft: SiteDraft) -> Self {
        let path = draft.path.as_deref().map(absolute);
        let query = SiteQuery {
            id: draft.id,
            domain: draft.domain.clone().filter(|d| !d.is_empty()),
            path: path.clone(),
            tld: draft.tld.clone(),
            ignore: None,
        };
        match store.find(&query) {
            Some((id, record)) => Self::bound(store, id, record),
            None => Self {
                id: None,
                domain: draft.domain.unwrap_or_default(),
                path,
                root: draft.root.filter(|r| !r.as_os_str().is_empty()),
                secure: draft.secure,
                tld: draft.tld.filter(|t| !t.is_empty()),
                default_tld: store.default_tld().to_string(),
                changes: Vec::new(),
            },
        }
    }

    fn bound(store: &SiteStore, id: SiteId, record: SiteRecord) -> Self {
        Self {
            id: Some(id),
            domain: record.domain,
            path: Some(record.path),
            root: record.root,
            secure: record.secure,
            tld: record.tld,
            default_tld: store.default_tld().to_string(),
            changes: Vec::new(),
        }
    }

    /// Look up a site by domain (+tld) or path. The result may be unbound.
    pub fn find(
        store: &SiteStore,
        domain: Option<&str>,
        path: Option<&Path>,
        tld: Option<&str>,
    ) -> Self {
        Self::new(
            store,
            SiteDraft {
                domain: domain.map(str::to_string),
                path: path.map(Path::to_path_buf),
                tld: tld.map(str::to_string),
                ..SiteDraft::default()
            },
        )
    }

    /// Like [`Site::find`] but a miss is a [`SiteError::NotFound`].
    pub fn existing(
        store: &SiteStore,
        domain: Option<&str>,
        path: Option<&Path>,
        tld: Option<&str>,
    ) -> Result<Self, SiteError> {
        let site = Self::find(store, domain, path, tld);
        if site.exists() {
            Ok(site)
        } else {
            Err(SiteError::not_found(domain, path))
        }
    }

    /// One bound site per stored record, in storage order.
    pub fn list(store: &SiteStore) -> Vec<Self> {
        store
            .all()
            .into_iter()
            .map(|(id, record)| Self::bound(store, id, record))
            .collect()
    }

    // -- accessors ----------------------------------------------------------

    pub fn id(&self) -> Option<SiteId> {
        self.id
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn secure(&self) -> bool {
        self.secure
    }

    pub fn tld(&self) -> Option<&str> {
        self.tld.as_deref()
    }

    pub fn exists(&self) -> bool {
        self.id.is_some()
    }

    pub fn is_dirty(&self) -> bool {
        self.exists() && !self.changes.is_empty()
    }

    pub fn state(&self) -> SiteState<'_> {
        if self.is_dirty() {
            SiteState::Dirty(&self.changes)
        } else {
            SiteState::Clean
        }
    }

    pub fn changes(&self) -> &[PendingChange] {
        &self.changes
    }

    // -- setters ------------------------------------------------------------

    pub fn set_domain(&mut self, store: &SiteStore, domain: impl Into<String>) -> Result<(), SiteError> {
        let domain = domain.into();
        if domain == self.domain {
            return Ok(());
        }
        self.check_domain(store, &domain, self.tld.as_deref())?;
        let old = std::mem::replace(&mut self.domain, domain);
        self.note(PendingChange::Domain(old));
        Ok(())
    }

    pub fn set_path(&mut self, store: &SiteStore, path: impl AsRef<Path>) -> Result<(), SiteError> {
        let path = absolute(path.as_ref());
        if self.path.as_ref() == Some(&path) {
            return Ok(());
        }
        self.check_path(store, &path)?;
        let old = self.path.replace(path);
        self.note(PendingChange::Path(old));
        Ok(())
    }

    /// `None` (or an empty path) serves the site directory itself.
    pub fn set_root(&mut self, root: Option<PathBuf>) {
        let root = root.filter(|r| !r.as_os_str().is_empty());
        if root == self.root {
            return;
        }
        let old = std::mem::replace(&mut self.root, root);
        self.note(PendingChange::Root(old));
    }

    pub fn set_secure(&mut self, secure: bool) {
        if secure == self.secure {
            return;
        }
        self.secure = secure;
        self.note(PendingChange::Secure(!secure));
    }

    /// `None` (or `""`) falls back to the registry default.
    pub fn set_tld(&mut self, store: &SiteStore, tld: Option<String>) -> Result<(), SiteError> {
        let tld = tld.filter(|t| !t.is_empty());
        if tld == self.tld {
            return Ok(());
        }
        self.check_domain(store, &self.domain, tld.as_deref())?;
        let old = std::mem::replace(&mut self.tld, tld);
        self.note(PendingChange::Tld(old));
        Ok(())
    }

    fn note(&mut self, change: PendingChange) {
        if !self.changes.iter().any(|c| c.same_field(&change)) {
            self.changes.push(change);
        }
    }

    fn check_domain(&self, store: &SiteStore, domain: &str, tld: Option<&str>) -> Result<(), SiteError> {
        if domain.is_empty() {
            return Ok(());
        }
        let query = SiteQuery::domain(domain)
            .with_tld(tld.map(str::to_string))
            .ignoring(self.id);
        if store.find(&query).is_some() {
            let tld = tld.unwrap_or(&self.default_tld);
            return Err(SiteError::Exists(Conflict::Domain(format!("{domain}.{tld}"))));
        }
        Ok(())
    }

    fn check_path(&self, store: &SiteStore, path: &Path) -> Result<(), SiteError> {
        if store.find(&SiteQuery::path(path).ignoring(self.id)).is_some() {
            return Err(SiteError::Exists(Conflict::Path(path.to_path_buf())));
        }
        Ok(())
    }

    // -- derived values -----------------------------------------------------

    /// Current values, or the values before the first unsaved change.
    fn snapshot(&self, use_crumb: bool) -> SiteRecord {
        let mut record = SiteRecord {
            domain: self.domain.clone(),
            path: self.path.clone().unwrap_or_default(),
            root: self.root.clone(),
            secure: self.secure,
            tld: self.tld.clone(),
        };
        if use_crumb {
            for change in &self.changes {
                match change {
                    PendingChange::Domain(d) => record.domain = d.clone(),
                    PendingChange::Path(p) => record.path = p.clone().unwrap_or_default(),
                    PendingChange::Root(r) => record.root = r.clone(),
                    PendingChange::Secure(s) => record.secure = *s,
                    PendingChange::Tld(t) => record.tld = t.clone(),
                }
            }
        }
        record
    }

    /// `<domain>.<effective tld>`
    pub fn host_name(&self, use_crumb: bool) -> String {
        self.snapshot(use_crumb).host_name(&self.default_tld)
    }

    pub fn url(&self, use_crumb: bool) -> String {
        let record = self.snapshot(use_crumb);
        let scheme = if record.secure { "https" } else { "http" };
        format!("{scheme}://{}", record.host_name(&self.default_tld))
    }

    /// Absolute document root; `None` while no path is set.
    pub fn document_root(&self, use_crumb: bool) -> Option<PathBuf> {
        let record = self.snapshot(use_crumb);
        if record.path.as_os_str().is_empty() {
            return None;
        }
        Some(absolute(&record.document_root()))
    }

    /// Per-site Apache stanza file.
    pub fn conf_path(&self, store: &SiteStore, use_crumb: bool) -> PathBuf {
        ApacheConf::from_store(store).site_conf_path(&self.host_name(use_crumb))
    }

    /// Certificate and key files.
    pub fn cert_paths(&self, store: &SiteStore, use_crumb: bool) -> (PathBuf, PathBuf) {
        let host = self.host_name(use_crumb);
        let dir = store.certs_dir();
        (dir.join(format!("{host}.crt")), dir.join(format!("{host}.key")))
    }

    // -- persistence --------------------------------------------------------

    /// Persist the site and rewrite its artifacts.
    ///
    /// Artifacts for the previous identity are removed first when the site
    /// is dirty, or for the current identity when `force` is set.
    pub fn save(&mut self, ws: &mut Workspace, force: bool) -> Result<bool, SiteError> {
        if self.domain.is_empty() {
            return Err(SiteError::Validation("domain"));
        }
        let path = match &self.path {
            Some(path) if !path.as_os_str().is_empty() => path.clone(),
            _ => return Err(SiteError::Validation("path")),
        };
        self.check_domain(&ws.store, &self.domain, self.tld.as_deref())?;
        self.check_path(&ws.store, &path)?;

        if self.is_dirty() || force {
            let use_crumb = self.is_dirty();
            self.remove_artifacts(ws, use_crumb)?;
        }
        self.changes.clear();

        let record = self.snapshot(false);
        match self.id {
            Some(id) => {
                ws.store.update(id, SitePatch::from(record))?;
            }
            None => {
                let id = ws.store.create(record)?;
                tracing::info!("registered {} as site {id}", self.host_name(false));
                self.id = Some(id);
            }
        }

        self.write_artifacts(ws)?;
        Ok(true)
    }

    /// Unregister the site and remove its artifacts. `false` when unbound.
    pub fn delete(&mut self, ws: &mut Workspace) -> Result<bool, SiteError> {
        let Some(id) = self.id else {
            return Ok(false);
        };
        let use_crumb = self.is_dirty();
        ws.store.delete(id)?;
        self.remove_artifacts(ws, use_crumb)?;
        tracing::info!("unregistered {}", self.host_name(use_crumb));
        self.changes.clear();
        self.id = None;
        Ok(true)
    }

    fn remove_artifacts(&self, ws: &Workspace, use_crumb: bool) -> Result<(), SyncError> {
        let host = self.host_name(use_crumb);
        ApacheConf::from_store(&ws.store).uninstall(&host)?;
        hosts::remove_entry(&ws.store.settings().dns.file, &host)?;
        let (cert, key) = self.cert_paths(&ws.store, use_crumb);
        ws.certificates.delete(&host, &cert, &key)
    }

    fn write_artifacts(&self, ws: &Workspace) -> Result<(), SyncError> {
        let record = self.snapshot(false);
        let host = record.host_name(&self.default_tld);
        let (cert, key) = self.cert_paths(&ws.store, false);
        if record.secure {
            ws.certificates.create(&host, &cert, &key)?;
        }

        let ctx = SiteContext::from_record(&record, &self.default_tld, &cert, &key);
        let stanza = ws.renderer.render_site(&ctx)?;
        ApacheConf::from_store(&ws.store).install(&host, &stanza)?;

        let dns = &ws.store.settings().dns.file;
        hosts::remove_entry(dns, &host)?;
        hosts::add_entry(dns, &host)
    }
}

/// Resolve against the current directory; unresolvable paths stay as given.
fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
