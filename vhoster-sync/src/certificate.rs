//! Per-site TLS certificates.
//!
//! [`SelfSigned`] generates a certificate for `<host>` and `www.<host>` with
//! rcgen and, when enabled, adds it to the operating-system trust store. Trust
//! operations shell out to the platform tool and only warn on failure.

use std::path::Path;
use std::process::Command;

use base64::Engine;
use rcgen::{BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair};
use sha2::{Digest, Sha256};

use crate::error::{io_err, SyncError};
use crate::patch;

/// Creates and removes the certificate/key pair for a host.
pub trait Certificates {
    fn create(&self, host: &str, cert: &Path, key: &Path) -> Result<(), SyncError>;
    fn delete(&self, host: &str, cert: &Path, key: &Path) -> Result<(), SyncError>;
}

/// rcgen-backed self-signed certificates.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelfSigned {
    /// Register certificates with the OS trust store.
    pub trust: bool,
}

impl SelfSigned {
    pub fn new(trust: bool) -> Self {
        Self { trust }
    }
}

/// PEM-encoded certificate and private key for `host`.
pub fn generate(host: &str) -> Result<(String, String), SyncError> {
    let cert_err = |source| SyncError::Certificate {
        host: host.to_string(),
        source,
    };

    let mut params =
        CertificateParams::new(vec![host.to_string(), format!("www.{host}")]).map_err(cert_err)?;
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, host);
    params.distinguished_name = dn;
    params.is_ca = IsCa::Ca(BasicConstraints::Constrained(0));

    let key_pair = KeyPair::generate().map_err(cert_err)?;
    let cert = params.self_signed(&key_pair).map_err(cert_err)?;
    Ok((cert.pem(), key_pair.serialize_pem()))
}

impl Certificates for SelfSigned {
    fn create(&self, host: &str, cert: &Path, key: &Path) -> Result<(), SyncError> {
        let (cert_pem, key_pem) = generate(host)?;
        patch::atomic_replace(cert, &cert_pem)?;
        patch::atomic_replace(key, &key_pem)?;
        restrict_permissions(key)?;
        tracing::info!("generated certificate for {host} at {}", cert.display());

        if self.trust {
            if let Some(fp) = fingerprint(cert)? {
                tracing::debug!("trusting {host} (sha256 {fp})");
            }
            run_best_effort(trust_command(cert), "trust", host);
        }
        Ok(())
    }

    fn delete(&self, host: &str, cert: &Path, key: &Path) -> Result<(), SyncError> {
        if self.trust && cert.exists() {
            run_best_effort(untrust_command(host, cert), "untrust", host);
        }
        for path in [cert, key] {
            match std::fs::remove_file(path) {
                Ok(()) => tracing::info!("removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(io_err(path, e)),
            }
        }
        Ok(())
    }
}

/// SHA-256 fingerprint of the first certificate in a PEM file, as
/// colon-separated upper-case hex. `None` when the file does not exist.
pub fn fingerprint(cert: &Path) -> Result<Option<String>, SyncError> {
    if !cert.exists() {
        return Ok(None);
    }
    let pem = patch::read_or_empty(cert)?;
    let body: String = pem
        .lines()
        .skip_while(|l| !l.starts_with("-----BEGIN CERTIFICATE-----"))
        .skip(1)
        .take_while(|l| !l.starts_with("-----END"))
        .map(str::trim)
        .collect();
    if body.is_empty() {
        return Err(SyncError::InvalidCertificate { path: cert.to_path_buf() });
    }
    let der = base64::engine::general_purpose::STANDARD
        .decode(body.as_bytes())
        .map_err(|_| SyncError::InvalidCertificate { path: cert.to_path_buf() })?;

    let digest = Sha256::digest(&der);
    let hex = hex::encode_upper(digest);
    let pairs: Vec<&str> = (0..hex.len())
        .step_by(2)
        .map(|i| &hex[i..i + 2])
        .collect();
    Ok(Some(pairs.join(":")))
}

fn trust_command(cert: &Path) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("certutil");
        cmd.args(["-addstore", "-f", "ROOT"]).arg(cert);
        cmd
    } else if cfg!(target_os = "macos") {
        let mut cmd = Command::new("security");
        cmd.args([
            "add-trusted-cert",
            "-d",
            "-r",
            "trustRoot",
            "-k",
            "/Library/Keychains/System.keychain",
        ])
        .arg(cert);
        cmd
    } else {
        let mut cmd = Command::new("trust");
        cmd.args(["anchor", "--store"]).arg(cert);
        cmd
    }
}

fn untrust_command(host: &str, cert: &Path) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("certutil");
        cmd.args(["-delstore", "ROOT", host]);
        cmd
    } else if cfg!(target_os = "macos") {
        let mut cmd = Command::new("security");
        cmd.args(["delete-certificate", "-c", host, "/Library/Keychains/System.keychain"]);
        cmd
    } else {
        let mut cmd = Command::new("trust");
        cmd.args(["anchor", "--remove"]).arg(cert);
        cmd
    }
}

fn run_best_effort(mut cmd: Command, what: &str, host: &str) {
    match cmd.output() {
        Ok(out) if out.status.success() => tracing::info!("{what}ed certificate for {host}"),
        Ok(out) => tracing::warn!(
            "could not {what} certificate for {host}: {}",
            String::from_utf8_lossy(&out.stderr).trim()
        ),
        Err(e) => tracing::warn!(
            "could not {what} certificate for {host}: {} unavailable ({e})",
            cmd.get_program().to_string_lossy()
        ),
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), SyncError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), SyncError> {
    Ok(())
}
