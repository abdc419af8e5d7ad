//! `vhoster refresh [domain] [path] [--tld TLD] [--all]`

use anyhow::Result;
use clap::Args;

use vhoster_sync::Site;

use super::{success, Session, SiteArgs};

/// Rewrite every artifact of one site, or of all sites.
#[derive(Args, Debug)]
pub struct RefreshArgs {
    #[command(flatten)]
    pub site: SiteArgs,

    /// Refresh every registered site.
    #[arg(long, conflicts_with_all = ["domain", "path"])]
    pub all: bool,
}

impl RefreshArgs {
    pub fn run(self, session: &Session) -> Result<()> {
        let mut ws = session.workspace()?;
        let mut sites = if self.all {
            Site::list(ws.store())
        } else {
            vec![self.site.resolve(session, ws.store())?]
        };

        for site in &mut sites {
            site.save(&mut ws, true)?;
            println!("  refreshed {}", site.url(false));
        }
        session.restart_apache(ws.store());
        success(&format!("{} site(s) refreshed", sites.len()));
        Ok(())
    }
}
