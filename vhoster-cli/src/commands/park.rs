//! `vhoster park <domain> [path] [--root DIR] [--secure] [--tld TLD | --auto-tld]`

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use vhoster_sync::Site;

use super::{show, success, Session};

/// Register a directory under a domain.
#[derive(Args, Debug)]
pub struct ParkArgs {
    /// Domain without TLD, e.g. `app` for `app.test`.
    pub domain: String,

    /// Site directory (defaults to the current directory).
    pub path: Option<PathBuf>,

    /// Document root, relative to the site directory or absolute.
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Serve over HTTPS with a generated certificate.
    #[arg(long)]
    pub secure: bool,

    /// TLD for this site instead of the registry default.
    #[arg(long, value_name = "TLD", conflicts_with = "auto_tld")]
    pub tld: Option<String>,

    /// Drop a custom TLD and use the registry default.
    #[arg(long)]
    pub auto_tld: bool,
}

impl ParkArgs {
    pub fn run(self, session: &Session) -> Result<()> {
        let mut ws = session.workspace()?;
        let path = self.path.unwrap_or_else(|| session.cwd.clone());

        // Parking an already registered directory renames that site.
        let mut site = Site::find(ws.store(), None, Some(&path), None);
        site.set_path(ws.store(), &path)?;
        if self.auto_tld {
            site.set_tld(ws.store(), None)?;
        } else if let Some(tld) = self.tld {
            site.set_tld(ws.store(), Some(tld))?;
        }
        site.set_domain(ws.store(), self.domain)?;
        if let Some(root) = self.root {
            site.set_root(Some(root));
        }
        if self.secure {
            site.set_secure(true);
        }

        site.save(&mut ws, false)?;
        session.restart_apache(ws.store());
        success("Site registered successfully!");
        show::print_site(ws.store(), &site)
    }
}
