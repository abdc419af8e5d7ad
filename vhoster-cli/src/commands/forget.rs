//! `vhoster forget [domain] [path] [--tld TLD]`

use anyhow::Result;

use super::{success, Session, SiteArgs};

pub fn run(session: &Session, args: SiteArgs) -> Result<()> {
    let mut ws = session.workspace()?;
    let mut site = args.resolve(session, ws.store())?;
    let url = site.url(false);

    site.delete(&mut ws)?;
    session.restart_apache(ws.store());
    success(&format!("Site {url} removed successfully!"));
    Ok(())
}
