// Channel construction for gNMI targets.
//
// Plaintext targets get a stock tonic endpoint. Secure targets get a rustls
// client config (ring provider, TLS 1.2/1.3) behind a hyper-rustls connector
// negotiating `h2`, so the root store, skip-verify and client identity are
// all under our control rather than tonic's built-in TLS.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::client::legacy::connect::HttpConnector;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::{DigitallySignedStruct, RootCertStore, SignatureScheme};
use rustls_pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, warn};

use crate::error::Error;

/// Connect and per-RPC timeout used when the destination specifies none.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client certificate chain plus its private key.
pub struct Identity {
    pub chain: Vec<CertificateDer<'static>>,
    pub key: PrivateKeyDer<'static>,
}

impl Identity {
    /// Parse a PEM certificate chain and PEM private key.
    pub fn from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self, Error> {
        let chain = certs_from_pem(cert_pem)?;
        if chain.is_empty() {
            return Err(Error::Tls("no certificate found in PEM input".into()));
        }
        let key = rustls_pemfile::private_key(&mut &key_pem[..])
            .map_err(|e| Error::Tls(format!("failed to read private key: {e}")))?
            .ok_or_else(|| Error::Tls("no private key found in PEM input".into()))?;
        Ok(Self { chain, key })
    }
}

impl Clone for Identity {
    fn clone(&self) -> Self {
        Self {
            chain: self.chain.clone(),
            key: self.key.clone_key(),
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("chain_len", &self.chain.len())
            .finish_non_exhaustive()
    }
}

/// Parse every certificate in a PEM bundle.
pub fn certs_from_pem(pem: &[u8]) -> Result<Vec<CertificateDer<'static>>, Error> {
    rustls_pemfile::certs(&mut &pem[..])
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| Error::Tls(format!("failed to read certificates: {e}")))
}

/// TLS settings for a secure channel.
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    /// Accept any server certificate.
    pub skip_verify: bool,
    /// Trust anchors for server verification (ignored with `skip_verify`).
    pub roots: Vec<CertificateDer<'static>>,
    /// Client certificate presented for mutual TLS.
    pub identity: Option<Identity>,
}

/// Everything needed to open a channel to one target.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// `host:port`. A leading `http://` or `https://` is accepted and replaced.
    pub addr: String,
    pub timeout: Duration,
    /// `None` means plaintext HTTP/2.
    pub tls: Option<TlsConfig>,
}

impl TransportConfig {
    pub fn plaintext(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: DEFAULT_TIMEOUT,
            tls: None,
        }
    }

    /// The tonic endpoint for this target, with timeouts applied. Does not dial.
    pub fn endpoint(&self) -> Result<Endpoint, Error> {
        let host = strip_scheme(&self.addr);
        let scheme = if self.tls.is_some() { "https" } else { "http" };
        let uri = format!("{scheme}://{host}");
        let endpoint = Endpoint::from_shared(uri).map_err(|e| Error::InvalidEndpoint {
            addr: self.addr.clone(),
            message: e.to_string(),
        })?;
        Ok(endpoint
            .connect_timeout(self.timeout)
            .timeout(self.timeout)
            .tcp_nodelay(true))
    }

    /// Dial the target and return a ready channel.
    pub async fn connect(&self) -> Result<Channel, Error> {
        let endpoint = self.endpoint()?;
        match &self.tls {
            None => {
                debug!(address = %self.addr, "dialing plaintext gNMI target");
                Ok(endpoint.connect().await?)
            }
            Some(tls) => {
                debug!(
                    address = %self.addr,
                    skip_verify = tls.skip_verify,
                    client_cert = tls.identity.is_some(),
                    "dialing TLS gNMI target"
                );
                let rustls_config = build_rustls_config(tls)?;

                let mut http = HttpConnector::new();
                http.enforce_http(false);
                http.set_nodelay(true);
                http.set_connect_timeout(Some(self.timeout));

                let connector = HttpsConnectorBuilder::new()
                    .with_tls_config(rustls_config)
                    .https_only()
                    .enable_http2()
                    .wrap_connector(http);

                Ok(endpoint.connect_with_connector(connector).await?)
            }
        }
    }
}

fn strip_scheme(addr: &str) -> &str {
    addr.strip_prefix("https://")
        .or_else(|| addr.strip_prefix("http://"))
        .unwrap_or(addr)
}

/// Build the rustls client configuration for a secure channel.
pub fn build_rustls_config(tls: &TlsConfig) -> Result<rustls::ClientConfig, Error> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let builder = rustls::ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::Tls(format!("unsupported protocol versions: {e}")))?;

    let builder = if tls.skip_verify {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(SkipServerVerification(provider)))
    } else {
        let mut roots = RootCertStore::empty();
        let (added, ignored) = roots.add_parsable_certificates(tls.roots.iter().cloned());
        if ignored > 0 {
            warn!(added, ignored, "skipped unparsable root certificates");
        }
        builder.with_root_certificates(roots)
    };

    let config = match &tls.identity {
        Some(id) => builder
            .with_client_auth_cert(id.chain.clone(), id.key.clone_key())
            .map_err(|e| Error::Tls(format!("invalid client certificate: {e}")))?,
        None => builder.with_no_client_auth(),
    };
    Ok(config)
}

/// Accepts any server certificate. Signatures are still checked so the
/// handshake itself stays well-formed.
#[derive(Debug)]
struct SkipServerVerification(Arc<CryptoProvider>);

impl ServerCertVerifier for SkipServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_scheme_follows_tls() {
        let plain = TransportConfig::plaintext("localhost:10161");
        assert_eq!(plain.endpoint().unwrap().uri().scheme_str(), Some("http"));

        let secure = TransportConfig {
            tls: Some(TlsConfig::default()),
            ..TransportConfig::plaintext("https://leaf1:10161")
        };
        let uri = secure.endpoint().unwrap().uri().clone();
        assert_eq!(uri.scheme_str(), Some("https"));
        assert_eq!(uri.authority().unwrap().as_str(), "leaf1:10161");
    }

    #[test]
    fn garbage_address_is_rejected() {
        let err = TransportConfig::plaintext("bad host:1").endpoint().unwrap_err();
        assert!(matches!(err, Error::InvalidEndpoint { .. }));
    }

    #[test]
    fn skip_verify_config_needs_no_roots() {
        let config = build_rustls_config(&TlsConfig {
            skip_verify: true,
            ..TlsConfig::default()
        })
        .unwrap();
        assert!(!config.client_auth_cert_resolver.has_certs());
    }

    #[test]
    fn identity_debug_omits_the_key() {
        let id = Identity {
            chain: vec![CertificateDer::from(vec![1, 2, 3])],
            key: PrivateKeyDer::Pkcs8(vec![9, 9, 9].into()),
        };
        let rendered = format!("{id:?}");
        assert!(rendered.contains("chain_len: 1"));
        assert!(!rendered.contains("9, 9, 9"));
    }

    #[test]
    fn pem_without_key_is_rejected() {
        let err = Identity::from_pem(b"", b"").unwrap_err();
        assert!(matches!(err, Error::Tls(_)));
    }
}
