//! Commands that change one field of an existing site: `link`, `rename`,
//! `set-root`.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use super::{success, Session};

/// `vhoster link <domain> [path] [--tld TLD]`
#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Domain of the site to move.
    pub domain: String,

    /// New site directory (defaults to the current directory).
    pub path: Option<PathBuf>,

    /// TLD the site was registered with.
    #[arg(long, value_name = "TLD")]
    pub tld: Option<String>,
}

impl LinkArgs {
    pub fn run(self, session: &Session) -> Result<()> {
        let mut ws = session.workspace()?;
        let mut site = session.resolve(ws.store(), Some(self.domain.as_str()), None, self.tld.as_deref())?;
        let path = self.path.unwrap_or_else(|| session.cwd.clone());

        site.set_path(ws.store(), &path)?;
        site.save(&mut ws, false)?;
        session.restart_apache(ws.store());
        success(&format!(
            "{} now serves {}",
            site.url(false),
            path.display()
        ));
        Ok(())
    }
}

/// `vhoster rename <old> <new> [--tld TLD] [--new-tld TLD | --auto-tld]`
#[derive(Args, Debug)]
pub struct RenameArgs {
    /// Current domain.
    pub old: String,

    /// New domain.
    pub new: String,

    /// TLD the site was registered with.
    #[arg(long, value_name = "TLD")]
    pub tld: Option<String>,

    /// Also move the site to this TLD.
    #[arg(long, value_name = "TLD", conflicts_with = "auto_tld")]
    pub new_tld: Option<String>,

    /// Drop a custom TLD and use the registry default.
    #[arg(long)]
    pub auto_tld: bool,
}

impl RenameArgs {
    pub fn run(self, session: &Session) -> Result<()> {
        let mut ws = session.workspace()?;
        let mut site = session.resolve(ws.store(), Some(self.old.as_str()), None, self.tld.as_deref())?;
        let before = site.url(false);

        if self.auto_tld {
            site.set_tld(ws.store(), None)?;
        } else if let Some(tld) = self.new_tld {
            site.set_tld(ws.store(), Some(tld))?;
        }
        site.set_domain(ws.store(), self.new)?;
        site.save(&mut ws, false)?;
        session.restart_apache(ws.store());
        success(&format!("{before} renamed to {}", site.url(false)));
        Ok(())
    }
}

/// `vhoster set-root <root> [domain] [--tld TLD]`
#[derive(Args, Debug)]
pub struct SetRootArgs {
    /// Document root, relative to the site directory or absolute. `""`
    /// serves the site directory itself.
    pub root: PathBuf,

    /// Domain of the site (defaults to the current directory's site).
    pub domain: Option<String>,

    /// TLD the site was registered with.
    #[arg(long, value_name = "TLD")]
    pub tld: Option<String>,
}

impl SetRootArgs {
    pub fn run(self, session: &Session) -> Result<()> {
        let mut ws = session.workspace()?;
        let mut site = session.resolve(ws.store(), self.domain.as_deref(), None, self.tld.as_deref())?;

        site.set_root(Some(self.root));
        site.save(&mut ws, false)?;
        session.restart_apache(ws.store());
        let root = site
            .document_root(false)
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        success(&format!("{} document root set to {root}", site.url(false)));
        Ok(())
    }
}
