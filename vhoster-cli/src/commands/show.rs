//! `vhoster list` and `vhoster show`.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use vhoster_core::SiteStore;
use vhoster_sync::{certificate, Site};

use super::{warn, Session, SiteArgs};

/// Arguments for `vhoster list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct SiteRow {
    #[tabled(rename = "path")]
    path: String,
    #[tabled(rename = "url")]
    url: String,
    #[tabled(rename = "secure")]
    secure: &'static str,
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "field")]
    field: &'static str,
    #[tabled(rename = "value")]
    value: String,
}

#[derive(Serialize)]
struct SiteJson {
    id: Option<u64>,
    domain: String,
    url: String,
    path: Option<String>,
    document_root: Option<String>,
    secure: bool,
    tld: Option<String>,
}

pub fn list(session: &Session, args: ListArgs) -> Result<()> {
    let store = session.store()?;
    let sites = Site::list(&store);

    if args.json {
        let payload: Vec<SiteJson> = sites.iter().map(site_json).collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&payload).context("failed to serialize site list")?
        );
        return Ok(());
    }

    if sites.is_empty() {
        warn("No registered sites found");
        return Ok(());
    }

    let rows: Vec<SiteRow> = sites
        .iter()
        .map(|site| {
            let mut path = display(site.path());
            if site.root().is_some() {
                path.push_str(&format!("\n => (root) {}", display(site.document_root(false).as_deref())));
            }
            SiteRow {
                path,
                url: site.url(false),
                secure: yes_no(site.secure()),
            }
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

pub fn show(session: &Session, args: SiteArgs) -> Result<()> {
    let store = session.store()?;
    let site = args.resolve(session, &store)?;
    print_site(&store, &site)
}

/// Key/value table for one site.
pub fn print_site(store: &SiteStore, site: &Site) -> Result<()> {
    let (cert, _) = site.cert_paths(store, false);
    let mut rows = vec![
        FieldRow { field: "URL", value: site.url(false) },
        FieldRow { field: "Path", value: display(site.path()) },
        FieldRow { field: "Document root", value: display(site.document_root(false).as_deref()) },
        FieldRow { field: "Secure", value: yes_no(site.secure()).to_string() },
        FieldRow {
            field: "TLD",
            value: site.tld().unwrap_or(store.default_tld()).to_string(),
        },
        FieldRow {
            field: "Config",
            value: site.conf_path(store, false).display().to_string(),
        },
    ];
    if site.secure() {
        let fingerprint = certificate::fingerprint(&cert)
            .with_context(|| format!("cannot read certificate {}", cert.display()))?;
        rows.push(FieldRow { field: "Certificate", value: cert.display().to_string() });
        rows.push(FieldRow {
            field: "SHA-256",
            value: fingerprint.unwrap_or_else(|| "missing".to_string()),
        });
    }

    println!("{}", site.host_name(false).bold());
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn site_json(site: &Site) -> SiteJson {
    SiteJson {
        id: site.id().map(|id| id.0),
        domain: site.host_name(false),
        url: site.url(false),
        path: site.path().map(|p| p.display().to_string()),
        document_root: site.document_root(false).map(|p| p.display().to_string()),
        secure: site.secure(),
        tld: site.tld().map(str::to_string),
    }
}

fn display(path: Option<&std::path::Path>) -> String {
    path.map(|p| p.display().to_string()).unwrap_or_default()
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
