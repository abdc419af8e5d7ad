//! Text-region patcher for flat files (hosts file, Apache master config).
//!
//! Two tagging styles are supported:
//!
//! - single lines matched verbatim (after trimming), e.g.
//!   `127.0.0.1 app.test #VirtualHost` or `Include "/conf/app.test.conf"`;
//! - delimited regions:
//!
//! ```text
//! ## StartHost: app.test
//! <VirtualHost *:80> ... </VirtualHost>
//! ## EndHost
//! ```
//!
//! Appends never deduplicate. Removals are no-ops that leave the file untouched
//! when nothing matches. Every rewrite goes through [`atomic_replace`].

use std::path::{Path, PathBuf};

use crate::error::{io_err, SyncError};

const REGION_START: &str = "## StartHost:";
const REGION_END: &str = "## EndHost";

/// Clean-up applied to the remaining content after a removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tidy {
    /// Drop blank lines and duplicate lines (hosts file).
    Hosts,
    /// Trim blank lines at the start and end only.
    Trim,
}

// ---------------------------------------------------------------------------
// Pure text transforms
// ---------------------------------------------------------------------------

/// `content` with `lines` appended, one per line.
pub fn appended(content: &str, lines: &[String]) -> String {
    let mut out = String::from(content);
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// `content` without any line whose trimmed text equals one of `lines`.
///
/// Returns `None` when no line matched.
pub fn without_lines(content: &str, lines: &[String], tidy: Tidy) -> Option<String> {
    let mut removed = false;
    let mut kept: Vec<&str> = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if lines.iter().any(|l| l == trimmed) {
            removed = true;
            continue;
        }
        match tidy {
            Tidy::Hosts => {
                if trimmed.is_empty() || kept.contains(&line) {
                    continue;
                }
                kept.push(line);
            }
            Tidy::Trim => kept.push(line),
        }
    }
    removed.then(|| join_trimmed(kept))
}

/// `content` with a `## StartHost: <key>` region holding `body` appended,
/// separated from existing content by one blank line.
pub fn with_region(content: &str, key: &str, body: &str) -> String {
    let mut out = content.trim_end().to_string();
    if !out.is_empty() {
        out.push_str("\n\n");
    }
    out.push_str(&format!("{REGION_START} {key}\n"));
    let body = body.trim_end();
    if !body.is_empty() {
        out.push_str(body);
        out.push('\n');
    }
    out.push_str(REGION_END);
    out.push('\n');
    out
}

/// `content` without every region tagged `key`.
///
/// The blank separator line directly before a region goes with it. Returns
/// `None` when no region matched. An unterminated region runs to end of file.
pub fn without_region(content: &str, key: &str) -> Option<String> {
    let start = format!("{REGION_START} {key}");
    let mut removed = false;
    let mut skipping = false;
    let mut kept: Vec<&str> = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if skipping {
            if trimmed == REGION_END {
                skipping = false;
            }
            continue;
        }
        if trimmed == start {
            removed = true;
            skipping = true;
            if kept.last().is_some_and(|l| l.trim().is_empty()) {
                kept.pop();
            }
            continue;
        }
        kept.push(line);
    }
    removed.then(|| join_trimmed(kept))
}

fn join_trimmed(mut lines: Vec<&str>) -> String {
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    let first = lines.iter().position(|l| !l.trim().is_empty()).unwrap_or(lines.len());
    let lines = &lines[first..];
    if lines.is_empty() {
        return String::new();
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

// ---------------------------------------------------------------------------
// File operations
// ---------------------------------------------------------------------------

/// Contents of `path`, or an empty string when the file does not exist.
pub fn read_or_empty(path: &Path) -> Result<String, SyncError> {
    match std::fs::read_to_string(path) {
        Ok(s) => Ok(s),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(io_err(path, e)),
    }
}

/// Append `lines` to `path`, creating it if needed.
pub fn append_lines(path: &Path, lines: &[String]) -> Result<(), SyncError> {
    let content = read_or_empty(path)?;
    atomic_replace(path, &appended(&content, lines))
}

/// Whether `path` has a line equal (after trimming) to `line`.
pub fn contains_line(path: &Path, line: &str) -> Result<bool, SyncError> {
    Ok(read_or_empty(path)?.lines().any(|l| l.trim() == line))
}

/// Remove matching lines from `path`. Returns whether anything was removed.
pub fn remove_lines(path: &Path, lines: &[String], tidy: Tidy) -> Result<bool, SyncError> {
    if !path.exists() {
        return Ok(false);
    }
    let content = read_or_empty(path)?;
    match without_lines(&content, lines, tidy) {
        Some(next) => {
            atomic_replace(path, &next)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Append a region tagged `key` to `path`, creating it if needed.
pub fn append_region(path: &Path, key: &str, body: &str) -> Result<(), SyncError> {
    let content = read_or_empty(path)?;
    atomic_replace(path, &with_region(&content, key, body))
}

/// Remove regions tagged `key` from `path`. Returns whether anything was removed.
pub fn remove_region(path: &Path, key: &str) -> Result<bool, SyncError> {
    if !path.exists() {
        return Ok(false);
    }
    let content = read_or_empty(path)?;
    match without_region(&content, key) {
        Some(next) => {
            atomic_replace(path, &next)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Replace the contents of `path` via a `<target>.vhoster.tmp` sibling + rename.
///
/// A symlinked `path` is followed, so the link survives and its target gets
/// the new content. An existing file keeps its permissions (and, on unix, its
/// owner when the caller may set it). The sibling lives next to the target so
/// the rename stays on one filesystem. When the target cannot be renamed over
/// (a bind-mounted `/etc/hosts` gives `EBUSY`), the content is written in
/// place instead. On any other rename failure the original is untouched and
/// the tmp removed.
pub fn atomic_replace(path: &Path, content: &str) -> Result<(), SyncError> {
    let target = resolve_target(path)?;
    let tmp = PathBuf::from(format!("{}.vhoster.tmp", target.display()));
    atomic_replace_with_tmp(&target, content, &tmp)
}

fn atomic_replace_with_tmp(path: &Path, content: &str, tmp: &Path) -> Result<(), SyncError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    std::fs::write(tmp, content).map_err(|e| io_err(tmp, e))?;
    if let Err(e) = copy_metadata(path, tmp) {
        let _ = std::fs::remove_file(tmp);
        return Err(e);
    }

    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        if !rename_unsupported(&e) {
            return Err(io_err(path, e));
        }
        tracing::debug!("rename over {} refused ({e}); writing in place", path.display());
        std::fs::write(path, content).map_err(|e| io_err(path, e))?;
    }
    tracing::debug!("wrote: {}", path.display());
    Ok(())
}

/// The file a write to `path` should land in: symlinks are followed, even
/// dangling ones.
fn resolve_target(path: &Path) -> Result<PathBuf, SyncError> {
    let is_link = std::fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false);
    if !is_link {
        return Ok(path.to_path_buf());
    }
    match std::fs::canonicalize(path) {
        Ok(real) => Ok(real),
        Err(_) => {
            let link = std::fs::read_link(path).map_err(|e| io_err(path, e))?;
            let base = path.parent().unwrap_or_else(|| Path::new(""));
            Ok(base.join(link))
        }
    }
}

/// Give `tmp` the permissions (and owner, when allowed) of an existing `path`.
fn copy_metadata(path: &Path, tmp: &Path) -> Result<(), SyncError> {
    let meta = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(io_err(path, e)),
    };
    std::fs::set_permissions(tmp, meta.permissions()).map_err(|e| io_err(tmp, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        if let Err(e) = std::os::unix::fs::chown(tmp, Some(meta.uid()), Some(meta.gid())) {
            tracing::debug!("keeping default owner for {}: {e}", path.display());
        }
    }
    Ok(())
}

/// `EBUSY` (bind mount) or `EXDEV` (cross-device): the target must be
/// rewritten in place.
#[cfg(unix)]
fn rename_unsupported(err: &std::io::Error) -> bool {
    const EBUSY: i32 = 16;
    const EXDEV: i32 = 18;
    matches!(err.raw_os_error(), Some(EBUSY | EXDEV))
}

#[cfg(not(unix))]
fn rename_unsupported(_err: &std::io::Error) -> bool {
    false
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
