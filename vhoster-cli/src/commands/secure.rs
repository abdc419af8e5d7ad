//! `vhoster secure|unsecure [domain] [path] [--tld TLD]`

use anyhow::Result;

use super::{success, Session, SiteArgs};

pub fn run(session: &Session, args: SiteArgs, secure: bool) -> Result<()> {
    let mut ws = session.workspace()?;
    let mut site = args.resolve(session, ws.store())?;

    site.set_secure(secure);
    site.save(&mut ws, false)?;
    session.restart_apache(ws.store());

    if secure {
        success(&format!("Site is now available at {}", site.url(false)));
    } else {
        success(&format!("TLS certificate removed; site served at {}", site.url(false)));
    }
    Ok(())
}
