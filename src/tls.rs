//! TLS client configuration for the StartTLS upgrade: system root
//! certificates, optional extra CA PEM, and an explicitly insecure
//! skip-verification mode for tests and internal networks.

use crate::error::LdapError;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::ClientConfig;
use rustls::SignatureScheme;
use rustls_pki_types::ServerName;
use std::sync::Arc;
use tokio_rustls::TlsConnector;

/// How to validate the server certificate during the StartTLS handshake.
#[derive(Debug, Clone, Default)]
pub struct TlsOptions {
    /// Skip server certificate verification entirely. Only for tests or
    /// trusted internal networks.
    pub skip_verify: bool,
    /// Extra CA PEM (single certificate or bundle) trusted in addition to the
    /// system roots.
    pub extra_ca_pem: Option<Vec<u8>>,
}

fn tls_err(context: &str, e: impl std::fmt::Display) -> LdapError {
    LdapError::Tls(format!("{}: {}", context, e))
}

/// Build a connector per the given options.
pub fn build_connector(options: &TlsOptions) -> Result<TlsConnector, LdapError> {
    let config = if options.skip_verify {
        client_config_insecure()?
    } else {
        client_config_with_roots(options.extra_ca_pem.as_deref())?
    };
    Ok(TlsConnector::from(config))
}

/// SNI name for the handshake, taken from the validated endpoint hostname.
pub fn server_name(host: &str) -> Result<ServerName<'static>, LdapError> {
    ServerName::try_from(host.to_string())
        .map_err(|_| LdapError::Tls(format!("invalid hostname for TLS SNI: {}", host)))
}

/// TLS client config with system root certificates, plus an optional extra CA
/// bundle (e.g. a private CA for internal directory servers).
fn client_config_with_roots(extra_ca_pem: Option<&[u8]>) -> Result<Arc<ClientConfig>, LdapError> {
    let mut root_store = rustls::RootCertStore::empty();
    for cert in
        rustls_native_certs::load_native_certs().map_err(|e| tls_err("load system CA certs", e))?
    {
        let _ = root_store.add(cert);
    }
    if let Some(pem) = extra_ca_pem {
        for cert in rustls_pemfile::certs(&mut std::io::Cursor::new(pem)) {
            let cert = cert.map_err(|e| tls_err("parse CA PEM", e))?;
            let _ = root_store.add(cert);
        }
    }
    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();
    Ok(Arc::new(config))
}

/// TLS client config that accepts any server certificate.
fn client_config_insecure() -> Result<Arc<ClientConfig>, LdapError> {
    let root_store = rustls::RootCertStore::empty();
    let mut config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();
    config
        .dangerous()
        .set_certificate_verifier(Arc::new(InsecureServerVerifier));
    Ok(Arc::new(config))
}

/// Verifier that accepts any server certificate. Only reachable through
/// `TlsOptions::skip_verify`.
#[derive(Debug)]
struct InsecureServerVerifier;

impl ServerCertVerifier for InsecureServerVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls_pki_types::CertificateDer<'_>,
        _intermediates: &[rustls_pki_types::CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls_pki_types::UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls_pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls_pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::ED25519,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_name_accepts_host_and_ip() {
        assert!(server_name("ldap.example.org").is_ok());
        assert!(server_name("127.0.0.1").is_ok());
    }

    #[test]
    fn server_name_rejects_garbage() {
        assert!(server_name("not a hostname").is_err());
    }

    #[test]
    fn insecure_connector_builds() {
        let options = TlsOptions {
            skip_verify: true,
            extra_ca_pem: None,
        };
        assert!(build_connector(&options).is_ok());
    }
}
