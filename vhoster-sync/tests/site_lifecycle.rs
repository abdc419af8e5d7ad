use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use vhoster_core::registry::setup_at;
use vhoster_core::types::{ApacheSettings, ConfLayout, DnsSettings, Settings, TlsSettings};
use vhoster_core::SiteStore;
use vhoster_renderer::Renderer;
use vhoster_sync::{
    Certificates, Conflict, PendingChange, SelfSigned, Site, SiteDraft, SiteError, SiteState,
    SyncError, Workspace,
};
use tempfile::TempDir;

struct Env {
    home: TempDir,
    sites: TempDir,
}

impl Env {
    fn new(layout: ConfLayout) -> Self {
        let home = TempDir::new().expect("home");
        let sites = TempDir::new().expect("sites");
        let etc = home.path().join("etc");
        fs::create_dir_all(&etc).expect("etc");
        fs::write(etc.join("hosts"), "127.0.0.1 localhost\n").expect("hosts");
        fs::write(etc.join("httpd.conf"), "Listen 80\n").expect("httpd.conf");

        let settings = Settings {
            dns: DnsSettings { file: etc.join("hosts") },
            apache: ApacheSettings {
                bin: PathBuf::from("httpd"),
                conf: etc.join("httpd.conf"),
                layout,
            },
            tls: TlsSettings { trust: false },
            ..Settings::default()
        };
        setup_at(home.path(), settings).expect("setup");
        Self { home, sites }
    }

    fn workspace(&self) -> Workspace {
        Workspace::open(SiteStore::open_at(self.home.path()).expect("open")).expect("workspace")
    }

    fn site_dir(&self, name: &str) -> PathBuf {
        let dir = self.sites.path().join(name);
        fs::create_dir_all(&dir).expect("site dir");
        dir
    }

    fn hosts(&self) -> String {
        fs::read_to_string(self.home.path().join("etc").join("hosts")).expect("read hosts")
    }

    fn master(&self) -> String {
        fs::read_to_string(self.home.path().join("etc").join("httpd.conf")).expect("read conf")
    }
}

fn create(ws: &mut Workspace, domain: &str, path: &Path) -> Result<Site, SiteError> {
    let mut site = Site::new(ws.store(), SiteDraft::default());
    site.set_domain(ws.store(), domain)?;
    site.set_path(ws.store(), path)?;
    site.save(ws, false)?;
    Ok(site)
}

#[test]
fn created_site_is_listed_with_default_tld() {
    let env = Env::new(ConfLayout::Include);
    let mut ws = env.workspace();
    let dir = env.site_dir("app");
    create(&mut ws, "app", &dir).expect("create");

    let sites = Site::list(ws.store());
    assert_eq!(sites.len(), 1);
    assert_eq!(sites[0].url(false), "http://app.test");
    assert_eq!(sites[0].document_root(false), Some(dir.clone()));

    assert!(env.hosts().contains("127.0.0.1 app.test #VirtualHost"));
    assert!(env.hosts().contains("127.0.0.1 www.app.test #VirtualHost"));
    let conf = sites[0].conf_path(ws.store(), false);
    assert!(conf.exists());
    assert!(env.master().contains(&format!("Include \"{}\"", conf.display())));
}

#[test]
fn duplicate_domain_is_rejected() {
    let env = Env::new(ConfLayout::Include);
    let mut ws = env.workspace();
    create(&mut ws, "app", &env.site_dir("app")).expect("create");

    let err = create(&mut ws, "app", &env.site_dir("other")).unwrap_err();
    assert!(matches!(err, SiteError::Exists(Conflict::Domain(ref host)) if host == "app.test"));
    assert_eq!(ws.store().len(), 1);
}

#[test]
fn same_domain_under_other_tld_is_allowed() {
    let env = Env::new(ConfLayout::Include);
    let mut ws = env.workspace();
    create(&mut ws, "app", &env.site_dir("app")).expect("create");

    let mut site = Site::new(ws.store(), SiteDraft::default());
    site.set_tld(ws.store(), Some("dev".into())).unwrap();
    site.set_domain(ws.store(), "app").unwrap();
    site.set_path(ws.store(), env.site_dir("other")).unwrap();
    site.save(&mut ws, false).unwrap();
    assert_eq!(ws.store().len(), 2);
    assert!(env.hosts().contains("127.0.0.1 app.dev #VirtualHost"));
}

#[test]
fn dotted_domain_and_nested_tld_cannot_share_a_host() {
    let env = Env::new(ConfLayout::Include);
    let mut ws = env.workspace();
    let first = create(&mut ws, "app.dev", &env.site_dir("a")).expect("create");
    assert_eq!(first.host_name(false), "app.dev.test");

    let mut site = Site::new(ws.store(), SiteDraft::default());
    site.set_tld(ws.store(), Some("dev.test".into())).unwrap();
    let err = site.set_domain(ws.store(), "app").unwrap_err();
    assert!(matches!(err, SiteError::Exists(Conflict::Domain(ref host)) if host == "app.dev.test"));

    // The same collision reached through a draft is caught at save time.
    let mut drafted = Site::new(
        ws.store(),
        SiteDraft {
            domain: Some("app".into()),
            path: Some(env.site_dir("b")),
            tld: Some("dev.test".into()),
            ..SiteDraft::default()
        },
    );
    assert!(matches!(drafted.save(&mut ws, false), Err(SiteError::Exists(_))));
    assert_eq!(ws.store().len(), 1);
    assert!(env.hosts().contains("127.0.0.1 app.dev.test #VirtualHost"));
}

#[test]
fn duplicate_path_is_rejected_but_own_path_is_fine() {
    let env = Env::new(ConfLayout::Include);
    let mut ws = env.workspace();
    let dir = env.site_dir("app");
    let mut site = create(&mut ws, "app", &dir).expect("create");

    // Re-setting its own path is not a conflict.
    site.set_path(ws.store(), &dir).unwrap();

    let err = create(&mut ws, "other", &dir).unwrap_err();
    assert!(matches!(err, SiteError::Exists(Conflict::Path(_))));
}

#[test]
fn rename_moves_every_artifact() {
    let env = Env::new(ConfLayout::Include);
    let mut ws = env.workspace();
    let mut site = create(&mut ws, "app", &env.site_dir("app")).expect("create");
    let old_conf = site.conf_path(ws.store(), false);

    let mut site2 = Site::existing(ws.store(), Some("app"), None, None).expect("existing");
    assert_eq!(site2.id(), site.id());
    site2.set_domain(ws.store(), "app2").unwrap();
    assert!(site2.is_dirty());
    assert_eq!(site2.state(), SiteState::Dirty(&[PendingChange::Domain("app".into())]));
    site2.save(&mut ws, false).unwrap();
    assert_eq!(site2.state(), SiteState::Clean);

    let hosts = env.hosts();
    assert!(!hosts.contains("127.0.0.1 app.test #VirtualHost"));
    assert!(hosts.contains("127.0.0.1 app2.test #VirtualHost"));
    assert!(!old_conf.exists());
    assert!(site2.conf_path(ws.store(), false).exists());
    assert!(!env.master().contains("app.test.conf"));
    assert!(env.master().contains("app2.test.conf"));

    // The stale entity no longer matches anything on disk by name.
    site = Site::find(ws.store(), Some("app"), None, None);
    assert!(!site.exists());
}

#[test]
fn rename_of_secure_site_replaces_certificate() {
    let env = Env::new(ConfLayout::Include);
    let mut ws = env.workspace();
    let mut site = create(&mut ws, "app", &env.site_dir("app")).expect("create");
    site.set_secure(true);
    site.save(&mut ws, false).unwrap();
    let (old_cert, old_key) = site.cert_paths(ws.store(), false);
    assert!(old_cert.exists() && old_key.exists());

    site.set_domain(ws.store(), "shop").unwrap();
    site.save(&mut ws, false).unwrap();

    let (cert, key) = site.cert_paths(ws.store(), false);
    assert_eq!(cert.file_name().unwrap(), "shop.test.crt");
    assert!(cert.exists() && key.exists());
    assert!(!old_cert.exists());
    assert!(!old_key.exists());
    let stanza = fs::read_to_string(site.conf_path(ws.store(), false)).unwrap();
    assert!(stanza.contains(&format!("SSLCertificateFile \"{}\"", cert.display())));
}

#[test]
fn tld_move_removes_old_artifacts() {
    let env = Env::new(ConfLayout::Include);
    let mut ws = env.workspace();
    let mut site = create(&mut ws, "app", &env.site_dir("app")).expect("create");
    site.set_secure(true);
    site.save(&mut ws, false).unwrap();
    let old_conf = site.conf_path(ws.store(), false);
    let (old_cert, old_key) = site.cert_paths(ws.store(), false);

    site.set_tld(ws.store(), Some("local".into())).unwrap();
    assert_eq!(site.state(), SiteState::Dirty(&[PendingChange::Tld(None)]));
    site.save(&mut ws, false).unwrap();

    let hosts = env.hosts();
    assert!(!hosts.contains("127.0.0.1 app.test #VirtualHost"));
    assert!(!hosts.contains("127.0.0.1 www.app.test #VirtualHost"));
    assert!(hosts.contains("127.0.0.1 app.local #VirtualHost"));
    assert!(!old_conf.exists());
    assert!(!env.master().contains("app.test.conf"));
    assert!(env.master().contains("app.local.conf"));
    assert!(!old_cert.exists() && !old_key.exists());
    let (cert, _) = site.cert_paths(ws.store(), false);
    assert!(cert.exists());
    assert_eq!(site.url(false), "https://app.local");
}

#[test]
fn saved_record_roundtrips_through_find() {
    let env = Env::new(ConfLayout::Include);
    let mut ws = env.workspace();
    let dir = env.site_dir("app");
    let mut site = Site::new(ws.store(), SiteDraft::default());
    site.set_domain(ws.store(), "app").unwrap();
    site.set_path(ws.store(), &dir).unwrap();
    site.set_root(Some("public".into()));
    site.set_tld(ws.store(), Some("local".into())).unwrap();
    site.save(&mut ws, false).unwrap();

    let found = Site::find(ws.store(), Some("app"), None, Some("local"));
    assert!(found.exists());
    assert_eq!(found.domain(), "app");
    assert_eq!(found.path(), Some(dir.as_path()));
    assert_eq!(found.root(), Some(Path::new("public")));
    assert_eq!(found.tld(), Some("local"));
    assert!(!found.secure());

    // Persisted, not just in memory.
    let reopened = SiteStore::open_at(env.home.path()).unwrap();
    assert!(Site::find(&reopened, Some("app"), None, Some("local")).exists());
}

#[test]
fn resaving_a_clean_site_does_not_duplicate_entries() {
    let env = Env::new(ConfLayout::Include);
    let mut ws = env.workspace();
    let mut site = create(&mut ws, "app", &env.site_dir("app")).expect("create");
    site.save(&mut ws, false).unwrap();
    site.save(&mut ws, true).unwrap();

    assert_eq!(env.hosts().matches("127.0.0.1 app.test #VirtualHost").count(), 1);
    assert_eq!(env.master().matches("app.test.conf").count(), 1);
}

#[test]
fn delete_removes_artifacts_and_unbinds() {
    let env = Env::new(ConfLayout::Include);
    let mut ws = env.workspace();
    let mut site = create(&mut ws, "app", &env.site_dir("app")).expect("create");
    let conf = site.conf_path(ws.store(), false);

    assert!(site.delete(&mut ws).unwrap());
    assert!(!site.exists());
    assert!(ws.store().is_empty());
    assert!(!conf.exists());
    assert_eq!(env.hosts(), "127.0.0.1 localhost\n");
    assert_eq!(env.master(), "Listen 80\n");

    // Unbound delete is a no-op.
    assert!(!site.delete(&mut ws).unwrap());
}

#[test]
fn delete_of_dirty_site_removes_old_identity() {
    let env = Env::new(ConfLayout::Include);
    let mut ws = env.workspace();
    let mut site = create(&mut ws, "app", &env.site_dir("app")).expect("create");
    site.set_domain(ws.store(), "renamed").unwrap();
    site.delete(&mut ws).unwrap();
    assert!(!env.hosts().contains("app.test"));
}

#[test]
fn save_without_domain_or_path_is_a_validation_error() {
    let env = Env::new(ConfLayout::Include);
    let mut ws = env.workspace();
    let mut site = Site::new(ws.store(), SiteDraft::default());
    assert!(matches!(site.save(&mut ws, false), Err(SiteError::Validation("domain"))));
    site.set_domain(ws.store(), "app").unwrap();
    assert!(matches!(site.save(&mut ws, false), Err(SiteError::Validation("path"))));
    assert!(ws.store().is_empty());
}

#[test]
fn inline_layout_keeps_stanza_in_master() {
    let env = Env::new(ConfLayout::Inline);
    let mut ws = env.workspace();
    let mut site = create(&mut ws, "app", &env.site_dir("app")).expect("create");
    assert!(env.master().contains("## StartHost: app.test"));
    assert!(!site.conf_path(ws.store(), false).exists());

    site.delete(&mut ws).unwrap();
    assert_eq!(env.master(), "Listen 80\n");
}

#[test]
fn secure_creates_certificate_then_unsecure_removes_it() {
    let env = Env::new(ConfLayout::Include);
    let mut ws = env.workspace();
    let mut site = create(&mut ws, "app", &env.site_dir("app")).expect("create");

    site.set_secure(true);
    site.save(&mut ws, false).unwrap();
    let (cert, key) = site.cert_paths(ws.store(), false);
    assert!(cert.exists() && key.exists());
    let stanza = fs::read_to_string(site.conf_path(ws.store(), false)).unwrap();
    assert!(stanza.contains(&format!("SSLCertificateFile \"{}\"", cert.display())));
    assert_eq!(site.url(false), "https://app.test");

    site.set_secure(false);
    site.save(&mut ws, false).unwrap();
    assert!(!cert.exists() && !key.exists());
    let stanza = fs::read_to_string(site.conf_path(ws.store(), false)).unwrap();
    assert!(!stanza.contains("SSLCertificateFile"));
}

/// Records the order of certificate calls relative to the stanza file.
struct CallLog {
    events: Rc<RefCell<Vec<String>>>,
    conf: PathBuf,
}

impl Certificates for CallLog {
    fn create(&self, host: &str, cert: &Path, key: &Path) -> Result<(), SyncError> {
        let conf_written = self.conf.exists();
        self.events
            .borrow_mut()
            .push(format!("create {host} conf_written={conf_written}"));
        SelfSigned::new(false).create(host, cert, key)
    }

    fn delete(&self, host: &str, cert: &Path, key: &Path) -> Result<(), SyncError> {
        self.events.borrow_mut().push(format!("delete {host}"));
        SelfSigned::new(false).delete(host, cert, key)
    }
}

#[test]
fn certificate_exists_before_stanza_is_written() {
    let env = Env::new(ConfLayout::Include);
    let store = SiteStore::open_at(env.home.path()).unwrap();
    let events = Rc::new(RefCell::new(Vec::new()));
    let log = CallLog {
        events: Rc::clone(&events),
        conf: store.conf_dir().join("app.test.conf"),
    };
    let mut ws = Workspace::new(store, Renderer::new().unwrap(), Box::new(log));

    let mut site = Site::new(ws.store(), SiteDraft { secure: true, ..SiteDraft::default() });
    site.set_domain(ws.store(), "app").unwrap();
    site.set_path(ws.store(), env.site_dir("app")).unwrap();
    site.save(&mut ws, false).unwrap();

    assert_eq!(*events.borrow(), vec!["create app.test conf_written=false".to_string()]);
}
