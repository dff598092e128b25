//! TLS configuration and certificate loading.

use axum_server::tls_rustls::RustlsConfig;
use std::io;
use std::path::Path;

use crate::config::TlsConfig;

/// Load the listener's certificate chain and private key (PEM).
pub async fn load_tls_config(tls: &TlsConfig) -> io::Result<RustlsConfig> {
    let cert_path = Path::new(&tls.cert_path);
    let key_path = Path::new(&tls.key_path);

    for (what, path) in [("certificate", cert_path), ("private key", key_path)] {
        if !path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("TLS {what} file not found: {}", path.display()),
            ));
        }
    }

    let config = RustlsConfig::from_pem_file(cert_path, key_path).await?;
    tracing::info!(cert = %cert_path.display(), "TLS certificate loaded");
    Ok(config)
}
