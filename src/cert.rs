//! TLS certificate bootstrap.
//!
//! Grounded on the Go original's `ensureCerts` (`examples/original_source/main.go`):
//! look for `cert.pem`/`key.pem` in the working directory, and generate a
//! self-signed CN=localhost certificate if neither exists. The original
//! shells out to the system `openssl` binary; this crate internalizes
//! that into the dependency graph with `rcgen` instead of spawning a
//! subprocess — see DESIGN.md for why that's a deliberate deviation
//! rather than an oversight.

use anyhow::{Context, Result};
use std::path::Path;

pub struct CertPaths<'a> {
    pub cert: &'a Path,
    pub key: &'a Path,
}

/// Loads `cert`/`key` if both already exist; otherwise generates a
/// self-signed CN=localhost certificate and writes them out, mirroring
/// the Go original's 365-day validity.
pub fn ensure(paths: CertPaths<'_>) -> Result<()> {
    if paths.cert.exists() && paths.key.exists() {
        log::debug!(
            "using existing certificate at {}",
            paths.cert.display()
        );
        return Ok(());
    }

    log::info!(
        "{} not found, generating a self-signed certificate for CN=localhost",
        paths.cert.display()
    );
    let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()])
        .context("generating self-signed certificate")?;
    let cert_pem = cert.serialize_pem().context("serializing certificate")?;
    let key_pem = cert.serialize_private_key_pem();

    std::fs::write(paths.cert, cert_pem)
        .with_context(|| format!("writing {}", paths.cert.display()))?;
    std::fs::write(paths.key, key_pem).with_context(|| format!("writing {}", paths.key.display()))?;
    Ok(())
}

/// Loads the PEM certificate chain + private key into the shapes
/// `rustls::ServerConfig` wants.
pub fn load(paths: CertPaths<'_>) -> Result<(Vec<rustls::Certificate>, rustls::PrivateKey)> {
    let cert_bytes = std::fs::read(paths.cert)
        .with_context(|| format!("reading {}", paths.cert.display()))?;
    let key_bytes =
        std::fs::read(paths.key).with_context(|| format!("reading {}", paths.key.display()))?;

    let certs = rustls_pemfile::certs(&mut cert_bytes.as_slice())
        .context("parsing certificate PEM")?
        .into_iter()
        .map(rustls::Certificate)
        .collect();

    let mut keys = rustls_pemfile::pkcs8_private_keys(&mut key_bytes.as_slice())
        .context("parsing private key PEM")?;
    if keys.is_empty() {
        keys = rustls_pemfile::rsa_private_keys(&mut key_bytes.as_slice())
            .context("parsing RSA private key PEM")?;
    }
    let key = keys
        .into_iter()
        .next()
        .context("no private key found in key file")?;

    Ok((certs, rustls::PrivateKey(key)))
}
