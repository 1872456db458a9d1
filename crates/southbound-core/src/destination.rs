// ── Resolved destinations ──
//
// Output of the certificate resolver: everything a client factory needs
// to open a transport session. Built once per connect attempt and owned
// by the session it ends up attached to.

use std::path::PathBuf;
use std::time::Duration;

use rustls_pki_types::CertificateDer;
use southbound_gnmi::{DEFAULT_TIMEOUT, Identity, TlsConfig, TransportConfig};

use crate::device::Credentials;

/// Where a client keypair came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeypairSource {
    /// Loaded from the certificate and key paths on the device.
    Files { cert: PathBuf, key: PathBuf },
    /// The default keypair compiled into this crate.
    Embedded,
}

#[derive(Debug, Clone)]
pub struct ClientIdentity {
    pub source: KeypairSource,
    pub identity: Identity,
}

/// Resolved TLS policy for one destination. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct TlsDescriptor {
    pub insecure_skip_verify: bool,
    pub root_certs: Vec<CertificateDer<'static>>,
    pub identity: Option<ClientIdentity>,
    /// Set when the resolver fell back to skip-verify because the
    /// configured material could not be used.
    pub degraded: bool,
}

impl TlsDescriptor {
    pub fn to_tls_config(&self) -> TlsConfig {
        TlsConfig {
            skip_verify: self.insecure_skip_verify,
            roots: self.root_certs.clone(),
            identity: self.identity.as_ref().map(|i| i.identity.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Destination {
    pub addrs: Vec<String>,
    pub target: String,
    pub timeout: Option<Duration>,
    /// `None` for plaintext transport.
    pub tls: Option<TlsDescriptor>,
    pub credentials: Option<Credentials>,
}

impl Destination {
    pub fn is_plaintext(&self) -> bool {
        self.tls.is_none()
    }

    /// Transport settings for dialing one of this destination's addresses.
    pub fn transport_config(&self, addr: &str) -> TransportConfig {
        TransportConfig {
            addr: addr.to_string(),
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            tls: self.tls.as_ref().map(TlsDescriptor::to_tls_config),
        }
    }
}
