// ── Device descriptors ──
//
// What the topology store knows about a device: where it lives, how to
// secure the connection, and who to authenticate as. Read-only input to
// the certificate resolver.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use southbound_gnmi::Credentials;

/// Registry key: device ID plus device version.
///
/// Two devices with the same ID but different versions are distinct
/// sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionedId {
    pub id: String,
    pub version: String,
}

impl VersionedId {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for VersionedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id, self.version)
    }
}

/// Transport-security settings as configured for a device.
///
/// Empty paths are treated the same as absent ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsSettings {
    /// Plaintext HTTP/2, no TLS at all.
    pub plain: bool,
    /// Skip server certificate verification.
    pub insecure: bool,
    pub ca_cert: Option<PathBuf>,
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
}

impl TlsSettings {
    pub fn plaintext() -> Self {
        Self {
            plain: true,
            ..Self::default()
        }
    }

    pub(crate) fn ca_cert(&self) -> Option<&PathBuf> {
        non_empty(self.ca_cert.as_ref())
    }

    pub(crate) fn cert(&self) -> Option<&PathBuf> {
        non_empty(self.cert.as_ref())
    }

    pub(crate) fn key(&self) -> Option<&PathBuf> {
        non_empty(self.key.as_ref())
    }
}

fn non_empty(path: Option<&PathBuf>) -> Option<&PathBuf> {
    path.filter(|p| !p.as_os_str().is_empty())
}

/// A device as described by the topology store.
#[derive(Debug, Clone)]
pub struct DeviceDescriptor {
    pub id: String,
    pub version: String,
    /// `host:port` of the gNMI endpoint.
    pub address: String,
    /// Logical target name sent in request prefixes by proxies.
    pub target: String,
    pub timeout: Option<Duration>,
    pub tls: TlsSettings,
    pub credentials: Option<Credentials>,
}

impl DeviceDescriptor {
    /// A TLS device with default settings and no credentials.
    pub fn new(
        id: impl Into<String>,
        version: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            target: id.clone(),
            id,
            version: version.into(),
            address: address.into(),
            timeout: None,
            tls: TlsSettings::default(),
            credentials: None,
        }
    }

    pub fn key(&self) -> VersionedId {
        VersionedId::new(self.id.clone(), self.version.clone())
    }
}
