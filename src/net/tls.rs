//! TLS configuration and certificate loading.
//!
//! Builds the `rustls::ServerConfig` for a TLS listener: certificate chain
//! and key from PEM files, and optionally a client-certificate verifier
//! over a CA bundle (mTLS). Handshakes that fail verification never reach
//! the HTTP layer.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};

use crate::config::TlsConfig;
use crate::error::{BalancerError, Result};

/// Build the rustls server config described by `config`.
pub fn build_server_config(config: &TlsConfig) -> Result<ServerConfig> {
    let certs = load_certs(Path::new(&config.cert_path))?;
    let key = load_private_key(Path::new(&config.key_path))?;

    // Pin the provider so the config does not depend on which rustls
    // backends happen to be compiled in.
    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());

    let builder = ServerConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|e| BalancerError::Tls(format!("unsupported protocol versions: {e}")))?;

    let builder = match &config.client_ca_path {
        Some(ca_path) => {
            let verifier = client_verifier(Path::new(ca_path), provider)?;
            builder.with_client_cert_verifier(verifier)
        }
        None => builder.with_no_client_auth(),
    };

    let mut server_config = builder
        .with_single_cert(certs, key)
        .map_err(|e| BalancerError::Tls(format!("failed to build TLS server config: {e}")))?;
    server_config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(server_config)
}

/// Wrap [`build_server_config`] for `axum_server`.
pub fn load_tls_config(config: &TlsConfig) -> Result<RustlsConfig> {
    let server_config = build_server_config(config)?;
    tracing::debug!(
        cert = %config.cert_path,
        mtls = config.client_ca_path.is_some(),
        "TLS config loaded"
    );
    Ok(RustlsConfig::from_config(Arc::new(server_config)))
}

fn client_verifier(
    ca_path: &Path,
    provider: Arc<CryptoProvider>,
) -> Result<Arc<dyn rustls::server::danger::ClientCertVerifier>> {
    let mut roots = RootCertStore::empty();
    for cert in load_certs(ca_path)? {
        roots.add(cert).map_err(|e| {
            BalancerError::Tls(format!("invalid CA certificate in {}: {e}", ca_path.display()))
        })?;
    }

    WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider)
        .build()
        .map_err(|e| BalancerError::Tls(format!("failed to build client verifier: {e}")))
}

/// Loads PEM-encoded X.509 certificates from the file at `path`.
fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path).map_err(|e| {
        BalancerError::Tls(format!("failed to open cert file {}: {e}", path.display()))
    })?;

    let certs = rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| {
            BalancerError::Tls(format!("failed to parse certificates from {}: {e}", path.display()))
        })?;

    if certs.is_empty() {
        return Err(BalancerError::Tls(format!(
            "no certificates found in {}",
            path.display()
        )));
    }
    Ok(certs)
}

/// Loads the first PEM-encoded private key (PKCS#1, PKCS#8 or SEC1).
fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let file = File::open(path).map_err(|e| {
        BalancerError::Tls(format!("failed to open key file {}: {e}", path.display()))
    })?;

    rustls_pemfile::private_key(&mut BufReader::new(file))
        .map_err(|e| {
            BalancerError::Tls(format!("failed to parse private key from {}: {e}", path.display()))
        })?
        .ok_or_else(|| BalancerError::Tls(format!("no private key found in {}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn self_signed() -> (NamedTempFile, NamedTempFile) {
        let certified = rcgen::generate_simple_self_signed(vec!["localhost".into()]).unwrap();
        (
            write_temp_file(&certified.cert.pem()),
            write_temp_file(&certified.key_pair.serialize_pem()),
        )
    }

    fn tls_config(cert: &NamedTempFile, key: &NamedTempFile, ca: Option<&NamedTempFile>) -> TlsConfig {
        TlsConfig {
            cert_path: cert.path().to_string_lossy().into_owned(),
            key_path: key.path().to_string_lossy().into_owned(),
            client_ca_path: ca.map(|f| f.path().to_string_lossy().into_owned()),
        }
    }

    #[test]
    fn builds_plain_tls_config() {
        let (cert, key) = self_signed();
        let config = build_server_config(&tls_config(&cert, &key, None)).unwrap();
        assert_eq!(config.alpn_protocols, vec![b"h2".to_vec(), b"http/1.1".to_vec()]);
    }

    #[test]
    fn builds_mtls_config() {
        let (cert, key) = self_signed();
        assert!(build_server_config(&tls_config(&cert, &key, Some(&cert))).is_ok());
    }

    #[test]
    fn missing_cert_file_is_tls_error() {
        let (_, key) = self_signed();
        let config = TlsConfig {
            cert_path: "/nonexistent/cert.pem".into(),
            key_path: key.path().to_string_lossy().into_owned(),
            client_ca_path: None,
        };
        let err = build_server_config(&config).unwrap_err();
        assert!(matches!(err, BalancerError::Tls(_)));
    }

    #[test]
    fn garbage_pem_is_rejected() {
        let (cert, _) = self_signed();
        let junk = write_temp_file("not a pem file");
        assert!(build_server_config(&tls_config(&cert, &junk, None)).is_err());
        assert!(build_server_config(&tls_config(&junk, &junk, None)).is_err());
    }

    #[test]
    fn empty_ca_bundle_is_rejected() {
        let (cert, key) = self_signed();
        let empty = write_temp_file("");
        assert!(build_server_config(&tls_config(&cert, &key, Some(&empty))).is_err());
    }
}
