//! Apache configuration artifacts and process control.
//!
//! With [`ConfLayout::Include`] each site gets `<conf_dir>/<host>.conf` and the
//! master config gains one `Include "<file>"` line. With [`ConfLayout::Inline`]
//! the stanza is written into the master config as a `## StartHost` region.

use std::path::{Path, PathBuf};
use std::process::Command;

use vhoster_core::types::ConfLayout;
use vhoster_core::SiteStore;

use crate::error::{io_err, SyncError};
use crate::patch::{self, Tidy};

/// `Include "<path>"` with forward slashes.
pub fn include_line(site_conf: &Path) -> String {
    format!("Include \"{}\"", site_conf.to_string_lossy().replace('\\', "/"))
}

/// Where site stanzas go, resolved from the registry settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApacheConf {
    /// Master configuration file.
    pub master: PathBuf,
    pub conf_dir: PathBuf,
    pub layout: ConfLayout,
}

impl ApacheConf {
    pub fn from_store(store: &SiteStore) -> Self {
        Self {
            master: store.settings().apache.conf.clone(),
            conf_dir: store.conf_dir(),
            layout: store.settings().apache.layout,
        }
    }

    /// Per-site stanza file for `host`.
    pub fn site_conf_path(&self, host: &str) -> PathBuf {
        self.conf_dir.join(format!("{host}.conf"))
    }

    /// Write `stanza` for `host` according to the layout.
    ///
    /// Any earlier stanza for the same host is replaced, never duplicated.
    pub fn install(&self, host: &str, stanza: &str) -> Result<(), SyncError> {
        match self.layout {
            ConfLayout::Include => {
                let site_conf = self.site_conf_path(host);
                patch::atomic_replace(&site_conf, stanza)?;
                let line = include_line(&site_conf);
                if !patch::contains_line(&self.master, &line)? {
                    patch::append_lines(&self.master, &[line])?;
                }
                tracing::info!("wrote {}", site_conf.display());
            }
            ConfLayout::Inline => {
                patch::remove_region(&self.master, host)?;
                patch::append_region(&self.master, host, stanza)?;
                tracing::info!("wrote {host} into {}", self.master.display());
            }
        }
        Ok(())
    }

    /// Remove every trace of `host`, whichever layout wrote it.
    ///
    /// Returns whether anything was removed.
    pub fn uninstall(&self, host: &str) -> Result<bool, SyncError> {
        let site_conf = self.site_conf_path(host);
        let mut removed = patch::remove_lines(&self.master, &[include_line(&site_conf)], Tidy::Trim)?;
        removed |= patch::remove_region(&self.master, host)?;
        match std::fs::remove_file(&site_conf) {
            Ok(()) => removed = true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_err(&site_conf, e)),
        }
        if removed {
            tracing::info!("removed Apache configuration for {host}");
        }
        Ok(removed)
    }
}

// ---------------------------------------------------------------------------
// Process control
// ---------------------------------------------------------------------------

/// Restart / stop the web server after configuration changes.
pub trait ServerControl {
    fn restart(&self) -> Result<(), SyncError>;
    fn stop(&self) -> Result<(), SyncError>;
}

/// Drives the Apache binary with `-k <action>`.
#[derive(Debug, Clone)]
pub struct Apache {
    bin: PathBuf,
}

impl Apache {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self { bin: bin.into() }
    }

    pub fn from_store(store: &SiteStore) -> Self {
        Self::new(store.settings().apache.bin.clone())
    }

    /// The command that would run for `action`.
    pub fn command(&self, action: &str) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.arg("-k").arg(action);
        cmd
    }

    fn run(&self, action: &str) -> Result<(), SyncError> {
        let shown = format!("{} -k {action}", self.bin.display());
        tracing::debug!("running {shown}");
        let output = self.command(action).output().map_err(|e| io_err(&self.bin, e))?;
        if !output.status.success() {
            return Err(SyncError::Process {
                command: shown,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

impl ServerControl for Apache {
    fn restart(&self) -> Result<(), SyncError> {
        self.run("restart")?;
        tracing::info!("Apache restarted");
        Ok(())
    }

    fn stop(&self) -> Result<(), SyncError> {
        self.run("stop")?;
        tracing::info!("Apache stopped");
        Ok(())
    }
}
