#[cfg(feature = "tls")]
use std::path::Path;
#[cfg(feature = "tls")]
use std::sync::Arc;
#[cfg(feature = "tls")]
use std::io::BufReader;
#[cfg(feature = "tls")]
use std::fs::File;
#[cfg(feature = "tls")]
use std::future::Future;
#[cfg(feature = "tls")]
use std::pin::Pin;

#[cfg(feature = "tls")]
use rustls::{ClientConfig, RootCertStore};
#[cfg(feature = "tls")]
use tokio_postgres_rustls::MakeRustlsConnect;

use tokio_postgres::{Client, Connection, Socket};
use tokio_postgres::NoTls;
use tokio_postgres::tls::NoTlsStream;
use tracing::error;

use crate::error::{BackupError, Result};

/// TLS mode for PostgreSQL connections
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TlsMode {
    /// No TLS encryption
    #[default]
    Disable,
    /// Try TLS first, fall back to unencrypted if it fails
    #[cfg(feature = "tls")]
    Prefer,
    /// Require TLS encryption
    #[cfg(feature = "tls")]
    Require,
    /// Require TLS and verify server certificate against CA
    #[cfg(feature = "tls")]
    VerifyCa,
    /// Require TLS, verify CA, and verify server hostname matches certificate
    #[cfg(feature = "tls")]
    VerifyFull,
}

impl TlsMode {
    /// Parse TLS mode from string (matching PostgreSQL's sslmode parameter)
    pub fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s.to_lowercase().as_str() {
            "disable" => Ok(TlsMode::Disable),
            #[cfg(feature = "tls")]
            "prefer" => Ok(TlsMode::Prefer),
            #[cfg(feature = "tls")]
            "require" => Ok(TlsMode::Require),
            #[cfg(feature = "tls")]
            "verify-ca" => Ok(TlsMode::VerifyCa),
            #[cfg(feature = "tls")]
            "verify-full" => Ok(TlsMode::VerifyFull),
            #[cfg(not(feature = "tls"))]
            mode @ ("prefer" | "require" | "verify-ca" | "verify-full") => Err(format!(
                "TLS mode '{}' requires schemadump to be built with TLS support. \
                Rebuild with: cargo install schemadump --features tls",
                mode
            )),
            _ => Err(format!("Invalid sslmode: {}", s)),
        }
    }
}

/// TLS configuration for PostgreSQL connections
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    pub mode: TlsMode,
    pub root_cert: Option<String>,
    pub client_cert: Option<String>,
    pub client_key: Option<String>,
}

/// Connector type that abstracts over TLS and non-TLS connections
pub enum TlsConnector {
    NoTls(NoTls),
    #[cfg(feature = "tls")]
    Rustls(MakeRustlsConnect),
}

#[cfg(feature = "tls")]
fn load_certs(path: &Path) -> Result<Vec<rustls::pki_types::CertificateDer<'static>>> {
    let file = File::open(path).map_err(|e| {
        BackupError::Configuration(format!("Cannot open certificate {}: {}", path.display(), e))
    })?;
    let mut reader = BufReader::new(file);
    rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| BackupError::Configuration(format!("Invalid certificate {}: {}", path.display(), e)))
}

#[cfg(feature = "tls")]
fn load_private_key(path: &Path) -> Result<rustls::pki_types::PrivateKeyDer<'static>> {
    let open = || {
        File::open(path).map(BufReader::new).map_err(|e| {
            BackupError::Configuration(format!("Cannot open key {}: {}", path.display(), e))
        })
    };
    let invalid = |e: std::io::Error| {
        BackupError::Configuration(format!("Invalid key {}: {}", path.display(), e))
    };

    // Try PKCS8 first
    if let Some(key) = rustls_pemfile::pkcs8_private_keys(&mut open()?).next() {
        return key.map(Into::into).map_err(invalid);
    }

    // Try RSA key
    if let Some(key) = rustls_pemfile::rsa_private_keys(&mut open()?).next() {
        return key.map(Into::into).map_err(invalid);
    }

    Err(BackupError::Configuration(format!("No private key found in {}", path.display())))
}

#[cfg(feature = "tls")]
fn build_rustls_config(tls_config: &TlsConfig) -> Result<ClientConfig> {
    let config = match tls_config.mode {
        TlsMode::Prefer | TlsMode::Require => {
            // Accept any certificate, encryption only
            ClientConfig::builder()
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert::new()))
                .with_no_client_auth()
        }
        TlsMode::VerifyCa | TlsMode::VerifyFull => {
            let mut root_store = RootCertStore::empty();

            if let Some(root_cert_path) = &tls_config.root_cert {
                for cert in load_certs(Path::new(root_cert_path))? {
                    root_store
                        .add(cert)
                        .map_err(|e| BackupError::Configuration(format!("Rejected root certificate: {}", e)))?;
                }
            } else {
                root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            }

            let config_builder = ClientConfig::builder().with_root_certificates(root_store);

            if let (Some(cert_path), Some(key_path)) = (&tls_config.client_cert, &tls_config.client_key) {
                let cert_chain = load_certs(Path::new(cert_path))?;
                let key = load_private_key(Path::new(key_path))?;
                config_builder
                    .with_client_auth_cert(cert_chain, key)
                    .map_err(|e| BackupError::Configuration(format!("Invalid client certificate: {}", e)))?
            } else {
                config_builder.with_no_client_auth()
            }
        }
        TlsMode::Disable => {
            return Err(BackupError::Configuration("TLS requested with sslmode=disable".to_string()))
        }
    };

    Ok(config)
}

/// Create a TLS connector based on the configuration
pub fn create_tls_connector(tls_config: &TlsConfig) -> Result<TlsConnector> {
    match tls_config.mode {
        TlsMode::Disable => Ok(TlsConnector::NoTls(NoTls)),
        #[cfg(feature = "tls")]
        TlsMode::Prefer | TlsMode::Require | TlsMode::VerifyCa | TlsMode::VerifyFull => {
            let config = build_rustls_config(tls_config)?;
            Ok(TlsConnector::Rustls(MakeRustlsConnect::new(config)))
        }
    }
}

/// Helper enum to handle different connection types
pub enum PgConnection {
    NoTls(Connection<Socket, NoTlsStream>),
    #[cfg(feature = "tls")]
    Rustls(Pin<Box<dyn Future<Output = std::result::Result<(), tokio_postgres::Error>> + Send>>),
}

impl PgConnection {
    /// Spawn the connection handler
    pub fn spawn(self) {
        tokio::spawn(async move {
            let result = match self {
                PgConnection::NoTls(conn) => conn.await,
                #[cfg(feature = "tls")]
                PgConnection::Rustls(conn) => conn.await,
            };
            if let Err(e) = result {
                error!(error = %e, "Database connection error");
            }
        });
    }
}

fn connect_error(err: tokio_postgres::Error) -> BackupError {
    BackupError::Connection {
        message: err.to_string(),
        source: err,
    }
}

/// Connect to PostgreSQL with the appropriate TLS configuration
pub async fn connect_with_tls(
    connection_string: &str,
    tls_config: &TlsConfig,
) -> Result<(Client, PgConnection)> {
    match create_tls_connector(tls_config)? {
        TlsConnector::NoTls(no_tls) => {
            let (client, connection) = tokio_postgres::connect(connection_string, no_tls)
                .await
                .map_err(connect_error)?;
            Ok((client, PgConnection::NoTls(connection)))
        }
        #[cfg(feature = "tls")]
        TlsConnector::Rustls(rustls) => {
            // For "prefer" mode, try TLS first, then fall back to no TLS
            if tls_config.mode == TlsMode::Prefer {
                match tokio_postgres::connect(connection_string, rustls.clone()).await {
                    Ok((client, connection)) => Ok((client, PgConnection::Rustls(Box::pin(connection)))),
                    Err(_) => {
                        let (client, connection) = tokio_postgres::connect(connection_string, NoTls)
                            .await
                            .map_err(connect_error)?;
                        Ok((client, PgConnection::NoTls(connection)))
                    }
                }
            } else {
                let (client, connection) = tokio_postgres::connect(connection_string, rustls)
                    .await
                    .map_err(connect_error)?;
                Ok((client, PgConnection::Rustls(Box::pin(connection))))
            }
        }
    }
}

#[cfg(feature = "tls")]
#[derive(Debug)]
struct AcceptAnyServerCert {
    crypto_provider: Arc<rustls::crypto::CryptoProvider>,
}

#[cfg(feature = "tls")]
impl AcceptAnyServerCert {
    fn new() -> Self {
        Self {
            crypto_provider: Arc::new(rustls::crypto::ring::default_provider()),
        }
    }
}

#[cfg(feature = "tls")]
impl rustls::client::danger::ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        self.crypto_provider.signature_verification_algorithms.supported_schemes()
    }
}
