//! Public tunnel to a local site via ngrok.

use std::path::PathBuf;
use std::process::Command;

use vhoster_core::types::NgrokSettings;

use crate::error::{io_err, SyncError};

/// Runs `ngrok http <port> --host-header=<host>` in the foreground.
#[derive(Debug, Clone)]
pub struct Tunnel {
    bin: PathBuf,
    port: u16,
}

impl Tunnel {
    pub fn new(bin: impl Into<PathBuf>, port: u16) -> Self {
        Self { bin: bin.into(), port }
    }

    pub fn from_settings(settings: &NgrokSettings) -> Self {
        Self::new(settings.bin.clone(), settings.port)
    }

    pub fn command(&self, host: &str) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.arg("http")
            .arg(self.port.to_string())
            .arg(format!("--host-header={host}"));
        cmd
    }

    /// Block until the tunnel process exits.
    pub fn share(&self, host: &str) -> Result<(), SyncError> {
        tracing::info!("sharing {host} through {}", self.bin.display());
        let status = self
            .command(host)
            .status()
            .map_err(|e| io_err(&self.bin, e))?;
        if !status.success() {
            return Err(SyncError::Process {
                command: format!("{} http {}", self.bin.display(), self.port),
                status: status.to_string(),
                stderr: String::new(),
            });
        }
        Ok(())
    }
}
