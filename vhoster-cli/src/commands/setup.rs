//! `vhoster setup`: write `~/.vhoster/config.json`.
//!
//! Flags left out keep their current value (or the default on first run).
//! Registered sites are preserved.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Args;

use vhoster_core::{registry, ConfLayout, Settings};

use super::success;

/// Thin wrapper so clap can parse `ConfLayout` from CLI args.
#[derive(Debug, Clone, Copy)]
pub struct LayoutArg(pub ConfLayout);

impl FromStr for LayoutArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "include" => Ok(Self(ConfLayout::Include)),
            "inline" => Ok(Self(ConfLayout::Inline)),
            other => Err(format!("unknown layout '{other}'; expected: include, inline")),
        }
    }
}

impl fmt::Display for LayoutArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Configure hosts file, Apache and storage locations.
#[derive(Args, Debug, Default)]
pub struct SetupArgs {
    /// Default TLD appended to site domains.
    #[arg(long, value_name = "TLD")]
    pub tld: Option<String>,

    /// System hosts file.
    #[arg(long, value_name = "FILE")]
    pub hosts: Option<PathBuf>,

    /// Apache daemon binary (httpd).
    #[arg(long, value_name = "BIN")]
    pub apache_bin: Option<PathBuf>,

    /// Apache master configuration file.
    #[arg(long, value_name = "FILE")]
    pub apache_conf: Option<PathBuf>,

    /// How site stanzas reach the master config: include | inline.
    #[arg(long, value_name = "LAYOUT")]
    pub layout: Option<LayoutArg>,

    /// Directory for per-site configuration files.
    #[arg(long, value_name = "DIR")]
    pub conf_dir: Option<PathBuf>,

    /// Directory for site certificates.
    #[arg(long, value_name = "DIR")]
    pub certs_dir: Option<PathBuf>,

    /// Directory with `.tera` template overrides.
    #[arg(long, value_name = "DIR")]
    pub templates_dir: Option<PathBuf>,

    /// Add generated certificates to the system trust store (default).
    #[arg(long, conflicts_with = "no_trust")]
    pub trust: bool,

    /// Do not add certificates to the system trust store.
    #[arg(long)]
    pub no_trust: bool,

    /// ngrok binary used by `share`.
    #[arg(long, value_name = "BIN")]
    pub ngrok_bin: Option<PathBuf>,

    /// Local port ngrok forwards to.
    #[arg(long, value_name = "PORT")]
    pub ngrok_port: Option<u16>,
}

impl SetupArgs {
    pub fn run(self) -> Result<()> {
        let path = registry::config_path()?;
        let current = if path.exists() {
            registry::load_document(&path)?.settings
        } else {
            Settings::default()
        };

        let settings = self.apply(current);
        let written = registry::setup(settings)
            .with_context(|| format!("failed to write {}", path.display()))?;
        success(&format!("Configuration saved to {}", written.display()));
        Ok(())
    }

    /// `settings` with every given flag applied.
    pub fn apply(self, mut settings: Settings) -> Settings {
        if let Some(tld) = self.tld.filter(|t| !t.is_empty()) {
            settings.tld = tld;
        }
        if let Some(file) = self.hosts {
            settings.dns.file = file;
        }
        if let Some(bin) = self.apache_bin {
            settings.apache.bin = bin;
        }
        if let Some(conf) = self.apache_conf {
            settings.apache.conf = conf;
        }
        if let Some(layout) = self.layout {
            settings.apache.layout = layout.0;
        }
        if let Some(dir) = self.conf_dir {
            settings.paths.conf = Some(dir);
        }
        if let Some(dir) = self.certs_dir {
            settings.paths.certs = Some(dir);
        }
        if let Some(dir) = self.templates_dir {
            settings.paths.templates = Some(dir);
        }
        if self.trust {
            settings.tls.trust = true;
        } else if self.no_trust {
            settings.tls.trust = false;
        }
        if let Some(bin) = self.ngrok_bin {
            settings.ngrok.bin = bin;
        }
        if let Some(port) = self.ngrok_port {
            settings.ngrok.port = port;
        }
        settings
    }
}
