use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;

use vhoster_core::SiteStore;
use tempfile::TempDir;

struct Fixture {
    home: TempDir,
    sites: TempDir,
}

impl Fixture {
    /// Home with a finished `vhoster setup` pointing at private hosts/conf files.
    fn new() -> Self {
        let home = TempDir::new().expect("home");
        let sites = TempDir::new().expect("sites");
        let fixture = Self { home, sites };
        fs::write(fixture.hosts_path(), "127.0.0.1 localhost\n").expect("hosts");
        fs::write(fixture.master_path(), "Listen 80\n").expect("httpd.conf");

        fixture
            .cmd()
            .arg("setup")
            .arg("--hosts")
            .arg(fixture.hosts_path())
            .arg("--apache-conf")
            .arg(fixture.master_path())
            .arg("--apache-bin")
            .arg("/nonexistent/httpd")
            .arg("--no-trust")
            .assert()
            .success()
            .stdout(contains("Configuration saved"));
        fixture
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("vhoster"));
        cmd.env("HOME", self.home.path())
            .env("USERPROFILE", self.home.path())
            .env_remove("RUST_LOG")
            .arg("--no-restart");
        cmd
    }

    fn hosts_path(&self) -> PathBuf {
        self.home.path().join("hosts")
    }

    fn master_path(&self) -> PathBuf {
        self.home.path().join("httpd.conf")
    }

    fn site_dir(&self, name: &str) -> PathBuf {
        let dir = self.sites.path().join(name);
        fs::create_dir_all(&dir).expect("site dir");
        dir
    }

    fn hosts(&self) -> String {
        fs::read_to_string(self.hosts_path()).expect("read hosts")
    }

    fn store(&self) -> SiteStore {
        SiteStore::open_at(self.home.path()).expect("open store")
    }
}

fn park(fx: &Fixture, domain: &str, dir: &Path) {
    fx.cmd()
        .arg("park")
        .arg(domain)
        .arg(dir)
        .assert()
        .success()
        .stdout(contains("Site registered successfully!"));
}

#[test]
fn commands_fail_before_setup() {
    let home = TempDir::new().expect("home");
    Command::new(assert_cmd::cargo::cargo_bin!("vhoster"))
        .env("HOME", home.path())
        .env("USERPROFILE", home.path())
        .arg("list")
        .assert()
        .failure()
        .code(1)
        .stderr(contains("vhoster setup"));
}

#[test]
fn park_registers_and_writes_hosts() {
    let fx = Fixture::new();
    let dir = fx.site_dir("app");
    park(&fx, "app", &dir);

    assert!(fx.hosts().contains("127.0.0.1 app.test #VirtualHost"));
    assert!(fx.hosts().contains("127.0.0.1 www.app.test #VirtualHost"));
    assert_eq!(fx.store().len(), 1);

    fx.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(contains("http://app.test"))
        .stdout(contains(dir.display().to_string()));
}

#[test]
fn park_uses_path_flag_as_default_directory() {
    let fx = Fixture::new();
    let dir = fx.site_dir("blog");
    fx.cmd()
        .arg("--path")
        .arg(&dir)
        .args(["create", "blog", "--tld", "local"])
        .assert()
        .success();

    // `show` without a domain resolves the site by --path.
    fx.cmd()
        .arg("--path")
        .arg(&dir)
        .arg("info")
        .assert()
        .success()
        .stdout(contains("http://blog.local"));
}

#[test]
fn duplicate_domain_exits_with_error() {
    let fx = Fixture::new();
    park(&fx, "app", &fx.site_dir("app"));

    fx.cmd()
        .arg("park")
        .arg("app")
        .arg(fx.site_dir("other"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("already been registered to: app.test"));
    assert_eq!(fx.store().len(), 1);
}

#[test]
fn rename_moves_hosts_entry() {
    let fx = Fixture::new();
    park(&fx, "app", &fx.site_dir("app"));

    fx.cmd()
        .args(["rename", "app", "app2"])
        .assert()
        .success()
        .stdout(contains("renamed to http://app2.test"));

    let hosts = fx.hosts();
    assert!(!hosts.contains("127.0.0.1 app.test #VirtualHost"));
    assert!(hosts.contains("127.0.0.1 app2.test #VirtualHost"));
}

#[test]
fn secure_then_unsecure_toggles_certificate() {
    let fx = Fixture::new();
    park(&fx, "app", &fx.site_dir("app"));
    let cert = fx.home.path().join(".vhoster").join("certs").join("app.test.crt");

    fx.cmd()
        .args(["secure", "app"])
        .assert()
        .success()
        .stdout(contains("https://app.test"));
    assert!(cert.exists());

    fx.cmd()
        .args(["show", "app"])
        .assert()
        .success()
        .stdout(contains("SHA-256"));

    fx.cmd().args(["unsecure", "app"]).assert().success();
    assert!(!cert.exists());
}

#[test]
fn forget_removes_everything() {
    let fx = Fixture::new();
    park(&fx, "app", &fx.site_dir("app"));

    fx.cmd()
        .args(["forget", "app"])
        .assert()
        .success()
        .stdout(contains("removed successfully"));

    assert_eq!(fx.hosts(), "127.0.0.1 localhost\n");
    assert_eq!(fs::read_to_string(fx.master_path()).unwrap(), "Listen 80\n");
    assert!(fx.store().is_empty());

    fx.cmd()
        .args(["forget", "app"])
        .assert()
        .failure()
        .stderr(contains("no site is registered to: app"));
}

#[test]
fn link_and_set_root_update_record() {
    let fx = Fixture::new();
    park(&fx, "app", &fx.site_dir("app"));
    let moved = fx.site_dir("moved");

    fx.cmd().arg("link").arg("app").arg(&moved).assert().success();
    fx.cmd().args(["set-root", "public", "app"]).assert().success();

    let (_, record) = fx.store().all().into_iter().next().expect("one site");
    assert_eq!(record.path, moved);
    assert_eq!(record.root, Some(PathBuf::from("public")));
}

#[test]
fn list_json_and_refresh_all() {
    let fx = Fixture::new();
    park(&fx, "one", &fx.site_dir("one"));
    park(&fx, "two", &fx.site_dir("two"));

    fx.cmd()
        .args(["list", "--json"])
        .assert()
        .success()
        .stdout(contains("\"domain\": \"one.test\""))
        .stdout(contains("\"domain\": \"two.test\""));

    fx.cmd()
        .args(["rebuild", "--all"])
        .assert()
        .success()
        .stdout(contains("2 site(s) refreshed"));
    assert_eq!(fx.hosts().matches("127.0.0.1 one.test #VirtualHost").count(), 1);
}

#[test]
fn restart_reports_missing_binary() {
    let fx = Fixture::new();
    fx.cmd()
        .arg("restart")
        .assert()
        .failure()
        .stderr(contains("failed to restart Apache"));
}

#[test]
fn stop_reports_missing_binary() {
    let fx = Fixture::new();
    fx.cmd()
        .arg("stop")
        .assert()
        .failure()
        .code(1)
        .stderr(contains("failed to stop Apache"));
}

#[test]
fn setup_rerun_keeps_sites() {
    let fx = Fixture::new();
    park(&fx, "app", &fx.site_dir("app"));
    fx.cmd()
        .args(["setup", "--tld", "dev"])
        .assert()
        .success();
    let store = fx.store();
    assert_eq!(store.default_tld(), "dev");
    assert_eq!(store.len(), 1);
    assert_eq!(store.settings().dns.file, fx.hosts_path());
    assert!(!store.settings().tls.trust);

    fx.cmd().args(["setup", "--trust"]).assert().success();
    assert!(fx.store().settings().tls.trust);
}

#[test]
fn unknown_layout_is_rejected_by_parser() {
    let fx = Fixture::new();
    fx.cmd()
        .args(["setup", "--layout", "sideways"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown layout"));
}
