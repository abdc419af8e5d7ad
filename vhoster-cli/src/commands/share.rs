//! `vhoster share [domain] [--tld TLD]`

use anyhow::{Context, Result};

use vhoster_sync::Tunnel;

use super::{Session, SiteArgs};

pub fn run(session: &Session, args: SiteArgs) -> Result<()> {
    let store = session.store()?;
    let site = args.resolve(session, &store)?;
    let host = site.host_name(false);

    println!("Sharing {} (Ctrl+C to stop)", site.url(false));
    Tunnel::from_settings(&store.settings().ngrok)
        .share(&host)
        .with_context(|| format!("tunnel for {host} failed"))
}
