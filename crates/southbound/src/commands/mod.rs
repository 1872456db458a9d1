//! Command dispatch: bridges CLI args -> device sessions -> output formatting.

pub mod capabilities;
pub mod devices;
pub mod get;
pub mod set;
pub mod subscribe;

use std::sync::Arc;
use std::time::Duration;

use southbound_config::Config;
use southbound_core::{
    DeviceDescriptor, GrpcClientFactory, Registry, TargetSession, TlsPolicy, VersionedId,
};
use tracing::{debug, warn};

use crate::cli::{Command, GlobalOpts};
use crate::error::{self, CliError};

/// Dispatch an inventory- or device-bound command to its handler.
pub async fn dispatch(cmd: Command, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Devices => devices::handle(config, global),
        Command::Capabilities(args) => capabilities::handle(&args, config, global).await,
        Command::Get(args) => get::handle(&args, config, global).await,
        Command::Set(args) => set::handle(&args, config, global).await,
        Command::Subscribe(args) => subscribe::handle(&args, config, global).await,
        // Completions are handled before the inventory is loaded
        Command::Completions(_) => Ok(()),
    }
}

// ── Device selection ─────────────────────────────────────────────────

/// The device named by `--device`, or the only configured one.
pub(crate) fn select_device(
    config: &Config,
    global: &GlobalOpts,
) -> Result<DeviceDescriptor, CliError> {
    let name = match (&global.device, config.devices.len()) {
        (Some(name), _) => name.clone(),
        (None, 1) => config.devices.keys().next().cloned().unwrap_or_default(),
        (None, _) => {
            let known: Vec<String> = config.devices.keys().cloned().collect();
            return Err(CliError::NoDevice {
                available: error::available(&known),
            });
        }
    };

    let mut device = config.device(&name)?;
    if let Some(secs) = global.timeout {
        device.timeout = Some(Duration::from_secs(secs));
    }
    Ok(device)
}

fn tls_policy(config: &Config, global: &GlobalOpts) -> TlsPolicy {
    if global.strict_tls {
        TlsPolicy::Strict
    } else {
        config.tls_policy()
    }
}

// ── Connected device ─────────────────────────────────────────────────

/// A registry holding the one session a command works with.
pub(crate) struct Connected {
    registry: Registry,
    key: VersionedId,
    pub session: Arc<TargetSession>,
}

impl Connected {
    /// Release the session, logging instead of failing on close errors.
    pub async fn close(self) {
        if let Err(e) = self.registry.disconnect(&self.key).await {
            warn!(device = %self.key, error = %e, "closing gNMI session failed");
        }
    }
}

pub(crate) async fn connect(
    device: &DeviceDescriptor,
    config: &Config,
    global: &GlobalOpts,
) -> Result<Connected, CliError> {
    let registry = Registry::with_policy(Arc::new(GrpcClientFactory), tls_policy(config, global));
    debug!(device = %device.key(), address = %device.address, "connecting");
    let key = registry.connect(device).await?;
    let session = registry.get(&key)?;
    Ok(Connected {
        registry,
        key,
        session,
    })
}
