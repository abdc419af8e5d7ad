//! Hosts-file entries mapping a site host name to the loopback address.

use std::path::Path;

use crate::error::SyncError;
use crate::patch::{self, Tidy};

/// Trailing tag marking lines owned by vhoster.
pub const HOSTS_TAG: &str = "#VirtualHost";

/// The two lines written for `host`: the bare name and its `www.` twin.
pub fn entry_lines(host: &str) -> Vec<String> {
    vec![
        format!("127.0.0.1 {host} {HOSTS_TAG}"),
        format!("127.0.0.1 www.{host} {HOSTS_TAG}"),
    ]
}

/// Append the entry lines for `host` to `file`.
pub fn add_entry(file: &Path, host: &str) -> Result<(), SyncError> {
    patch::append_lines(file, &entry_lines(host))?;
    tracing::info!("added {host} to {}", file.display());
    Ok(())
}

/// Remove the entry lines for `host` from `file`.
///
/// Returns `false` (and leaves the file alone) when no line matched.
pub fn remove_entry(file: &Path, host: &str) -> Result<bool, SyncError> {
    let removed = patch::remove_lines(file, &entry_lines(host), Tidy::Hosts)?;
    if removed {
        tracing::info!("removed {host} from {}", file.display());
    }
    Ok(removed)
}

/// Whether `file` maps `host` to the loopback address.
pub fn has_entry(file: &Path, host: &str) -> Result<bool, SyncError> {
    patch::contains_line(file, &format!("127.0.0.1 {host} {HOSTS_TAG}"))
}
