//! Subcommand implementations.

pub mod edit;
pub mod forget;
pub mod park;
pub mod refresh;
pub mod secure;
pub mod setup;
pub mod share;
pub mod show;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use vhoster_core::SiteStore;
use vhoster_sync::{Apache, ServerControl, Site, Workspace};

/// Per-invocation state shared by every command.
#[derive(Debug, Clone)]
pub struct Session {
    /// Directory selecting the current site.
    pub cwd: PathBuf,
    /// Restart Apache after a change.
    pub restart: bool,
}

impl Session {
    pub fn new(cwd: PathBuf, restart: bool) -> Self {
        Self { cwd, restart }
    }

    pub fn store(&self) -> Result<SiteStore> {
        Ok(SiteStore::open()?)
    }

    pub fn workspace(&self) -> Result<Workspace> {
        let store = self.store()?;
        Workspace::open(store).context("failed to load site templates")
    }

    /// Site named by `domain`, else the one linked to `path`, else the one
    /// linked to the current directory.
    pub fn resolve(
        &self,
        store: &SiteStore,
        domain: Option<&str>,
        path: Option<&Path>,
        tld: Option<&str>,
    ) -> Result<Site> {
        let path = match (domain, path) {
            (None, None) => Some(self.cwd.as_path()),
            (_, path) => path,
        };
        Ok(Site::existing(store, domain, path, tld)?)
    }

    /// Restart Apache unless disabled. A failed restart only warns: the site
    /// change itself already succeeded.
    pub fn restart_apache(&self, store: &SiteStore) {
        if !self.restart {
            tracing::debug!("skipping Apache restart");
            return;
        }
        if let Err(err) = Apache::from_store(store).restart() {
            warn(&format!("Apache was not restarted: {err}"));
        }
    }
}

/// Positional site selector shared by most commands.
#[derive(Args, Debug, Clone, Default)]
pub struct SiteArgs {
    /// Site domain without TLD (defaults to the current directory's site).
    pub domain: Option<String>,

    /// Site directory.
    pub path: Option<PathBuf>,

    /// TLD the site was registered with.
    #[arg(long, value_name = "TLD")]
    pub tld: Option<String>,
}

impl SiteArgs {
    pub fn resolve(&self, session: &Session, store: &SiteStore) -> Result<Site> {
        session.resolve(
            store,
            self.domain.as_deref(),
            self.path.as_deref(),
            self.tld.as_deref(),
        )
    }
}

/// `vhoster restart`
pub fn restart(session: &Session) -> Result<()> {
    let store = session.store()?;
    Apache::from_store(&store)
        .restart()
        .context("failed to restart Apache")?;
    success("Apache restarted");
    Ok(())
}

/// `vhoster stop`
pub fn stop(session: &Session) -> Result<()> {
    let store = session.store()?;
    Apache::from_store(&store)
        .stop()
        .context("failed to stop Apache")?;
    success("Apache stopped");
    Ok(())
}

pub(crate) fn success(message: &str) {
    println!("{} {}", "✓".green(), message.green());
}

pub(crate) fn warn(message: &str) {
    eprintln!("{} {}", "!".yellow(), message.yellow());
}
