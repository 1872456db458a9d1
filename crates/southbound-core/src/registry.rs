// ── Connection registry ──
//
// Keyed store of target sessions. Resolution and dialing happen before
// the map lock is taken; the write lock covers only the insert or swap.
// A replaced client is closed after every lock is released.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::client::{ClientFactory, GrpcClientFactory, ProtocolClient};
use crate::device::{DeviceDescriptor, VersionedId};
use crate::error::CoreError;
use crate::resolver::{CertificateResolver, TlsPolicy};
use crate::session::TargetSession;

pub struct Registry {
    sessions: RwLock<HashMap<VersionedId, Arc<TargetSession>>>,
    factory: Arc<dyn ClientFactory>,
    resolver: CertificateResolver,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("sessions", &self.len())
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(Arc::new(GrpcClientFactory))
    }
}

impl Registry {
    /// An empty registry opening clients through `factory`, with the
    /// lenient TLS policy.
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        Self::with_policy(factory, TlsPolicy::default())
    }

    pub fn with_policy(factory: Arc<dyn ClientFactory>, policy: TlsPolicy) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            factory,
            resolver: CertificateResolver::new(policy),
        }
    }

    /// Connect (or reconnect) a device and return its registry key.
    ///
    /// On failure the registry is untouched: an existing session for the
    /// same key keeps its old client.
    pub async fn connect(&self, device: &DeviceDescriptor) -> Result<VersionedId, CoreError> {
        let (destination, key) = self.resolver.resolve(device)?;
        let client = self.factory.open(&destination).await?;

        let previous = {
            let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
            let live = sessions.get(&key).filter(|s| !s.is_closed()).cloned();
            if let Some(session) = live {
                Some(session.replace(client, destination))
            } else {
                let session =
                    TargetSession::new(key.clone(), destination, client, Arc::clone(&self.factory));
                sessions.insert(key.clone(), Arc::new(session));
                None
            }
        };

        match previous {
            Some(old) => {
                info!(device = %key, address = %device.address, "gNMI client reconnected");
                close_client(&key, old.as_ref()).await;
            }
            None => info!(device = %key, address = %device.address, "gNMI client connected"),
        }
        Ok(key)
    }

    /// Look up the session for `key`.
    pub fn get(&self, key: &VersionedId) -> Result<Arc<TargetSession>, CoreError> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = sessions.get(key) {
            return Ok(Arc::clone(session));
        }
        let mut known: Vec<_> = sessions.keys().map(ToString::to_string).collect();
        known.sort();
        Err(CoreError::NotFound {
            key: key.to_string(),
            known,
        })
    }

    /// Remove a session and close it.
    pub async fn disconnect(&self, key: &VersionedId) -> Result<(), CoreError> {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        let Some(session) = removed else {
            return Err(self.not_found(key));
        };
        if let Err(e) = session.close().await {
            warn!(device = %key, error = %e, "failed to close gNMI session");
        }
        debug!(device = %key, "gNMI session removed");
        Ok(())
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<VersionedId> {
        let mut keys: Vec<_> = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn not_found(&self, key: &VersionedId) -> CoreError {
        CoreError::NotFound {
            key: key.to_string(),
            known: self.keys().iter().map(ToString::to_string).collect(),
        }
    }
}

async fn close_client(key: &VersionedId, client: &dyn ProtocolClient) {
    if let Err(e) = client.close().await {
        warn!(device = %key, error = %e, "failed to close previous gNMI client");
    }
}
