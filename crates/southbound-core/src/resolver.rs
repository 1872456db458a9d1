// ── Certificate / credential resolution ──
//
// Turns a device descriptor into a destination. Decision order for secure
// devices: root CAs, insecure flag, then client identity (explicit keypair,
// then username/password, then the embedded default keypair). Anything
// that does not fit falls back to skip-verify, logged, unless the strict
// policy is in force.

use std::path::Path;

use rustls_pki_types::CertificateDer;
use southbound_gnmi::Identity;
use southbound_gnmi::transport::certs_from_pem;
use tracing::{debug, error, info, warn};

use crate::destination::{ClientIdentity, Destination, KeypairSource, TlsDescriptor};
use crate::device::{DeviceDescriptor, TlsSettings, VersionedId};
use crate::error::CoreError;

const DEFAULT_CA: &[u8] = include_bytes!("../certs/default-ca.crt");
const DEFAULT_CLIENT_CERT: &[u8] = include_bytes!("../certs/default-client.crt");
const DEFAULT_CLIENT_KEY: &[u8] = include_bytes!("../certs/default-client.key");

/// How to treat TLS material that cannot be used as configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TlsPolicy {
    /// Log the problem and continue, degrading to skip-verify when no
    /// usable client identity remains. Never fails.
    #[default]
    Lenient,
    /// Fail the resolution with [`CoreError::CertLoad`] instead.
    Strict,
}

#[derive(Debug, Clone, Default)]
pub struct CertificateResolver {
    policy: TlsPolicy,
}

impl CertificateResolver {
    pub fn new(policy: TlsPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> TlsPolicy {
        self.policy
    }

    /// Resolve the destination and registry key for a device.
    ///
    /// The only I/O is reading certificate files. Under
    /// [`TlsPolicy::Lenient`] this never returns an error.
    pub fn resolve(
        &self,
        device: &DeviceDescriptor,
    ) -> Result<(Destination, VersionedId), CoreError> {
        let key = device.key();
        let mut dest = Destination {
            addrs: vec![device.address.clone()],
            target: device.target.clone(),
            timeout: device.timeout,
            tls: None,
            credentials: None,
        };

        if device.tls.plain {
            info!(device = %key, address = %device.address, "plain (non TLS) connection");
            if device.credentials.is_some() {
                warn!(device = %key, "credentials will be sent over a plaintext connection");
                dest.credentials.clone_from(&device.credentials);
            }
            return Ok((dest, key));
        }

        let mut tls = TlsDescriptor {
            root_certs: self.root_certs(&key, &device.tls)?,
            ..TlsDescriptor::default()
        };
        if device.tls.insecure {
            info!(device = %key, address = %device.address, "insecure TLS connection");
            tls.insecure_skip_verify = true;
        } else {
            info!(device = %key, address = %device.address, "secure TLS connection");
        }

        match (device.tls.cert(), device.tls.key()) {
            (Some(cert), Some(key_path)) => match load_keypair(cert, key_path) {
                Ok(identity) => {
                    info!(device = %key, cert = %cert.display(), "loaded client keypair");
                    tls.identity = Some(ClientIdentity {
                        source: KeypairSource::Files {
                            cert: cert.clone(),
                            key: key_path.clone(),
                        },
                        identity,
                    });
                }
                Err(reason) => {
                    self.degrade(
                        &key,
                        &mut tls,
                        format!("could not load client key pair: {reason}"),
                    )?;
                }
            },
            (cert, key_path) if device.credentials.is_some() => {
                if cert.is_some() || key_path.is_some() {
                    self.fallback(
                        &key,
                        "client certificate and key must both be set; using credentials only",
                    )?;
                }
                info!(device = %key, "using username/password credentials");
                dest.credentials.clone_from(&device.credentials);
            }
            (None, None) => {
                info!(device = %key, "loading default client certificates");
                match Identity::from_pem(DEFAULT_CLIENT_CERT, DEFAULT_CLIENT_KEY) {
                    Ok(identity) => {
                        tls.identity = Some(ClientIdentity {
                            source: KeypairSource::Embedded,
                            identity,
                        });
                    }
                    Err(e) => self.fallback(&key, format!("error loading default certs: {e}"))?,
                }
            }
            (cert, key_path) => {
                self.degrade(
                    &key,
                    &mut tls,
                    format!(
                        "can't load ca={:?}, cert={:?}, key={:?} for {}",
                        device.tls.ca_cert(),
                        cert,
                        key_path,
                        device.address
                    ),
                )?;
            }
        }

        dest.tls = Some(tls);
        Ok((dest, key))
    }

    fn root_certs(
        &self,
        key: &VersionedId,
        settings: &TlsSettings,
    ) -> Result<Vec<CertificateDer<'static>>, CoreError> {
        let Some(path) = settings.ca_cert() else {
            debug!(device = %key, "loading default CA");
            return match certs_from_pem(DEFAULT_CA) {
                Ok(certs) => Ok(certs),
                Err(e) => {
                    self.fallback(key, format!("failed to parse default CA: {e}"))?;
                    Ok(Vec::new())
                }
            };
        };

        let pem = match std::fs::read(path) {
            Ok(pem) => pem,
            Err(e) => {
                self.fallback(key, format!("could not read {}: {e}", path.display()))?;
                return Ok(Vec::new());
            }
        };
        match certs_from_pem(&pem) {
            Ok(certs) if !certs.is_empty() => Ok(certs),
            Ok(_) => {
                self.fallback(
                    key,
                    format!("failed to append CA certificates from {}", path.display()),
                )?;
                Ok(Vec::new())
            }
            Err(e) => {
                self.fallback(key, format!("failed to parse {}: {e}", path.display()))?;
                Ok(Vec::new())
            }
        }
    }

    /// Log under the lenient policy, fail under the strict one.
    fn fallback(&self, key: &VersionedId, message: impl Into<String>) -> Result<(), CoreError> {
        let message = message.into();
        match self.policy {
            TlsPolicy::Lenient => {
                error!(device = %key, "{message}");
                Ok(())
            }
            TlsPolicy::Strict => Err(CoreError::CertLoad {
                message: format!("{key}: {message}"),
            }),
        }
    }

    fn degrade(
        &self,
        key: &VersionedId,
        tls: &mut TlsDescriptor,
        message: String,
    ) -> Result<(), CoreError> {
        self.fallback(key, format!("{message}, trying with insecure connection"))?;
        tls.insecure_skip_verify = true;
        tls.identity = None;
        tls.degraded = true;
        Ok(())
    }
}

fn load_keypair(cert: &Path, key: &Path) -> Result<Identity, String> {
    let cert_pem =
        std::fs::read(cert).map_err(|e| format!("could not read {}: {e}", cert.display()))?;
    let key_pem =
        std::fs::read(key).map_err(|e| format!("could not read {}: {e}", key.display()))?;
    Identity::from_pem(&cert_pem, &key_pem).map_err(|e| e.to_string())
}
