//! Device inventory for southbound gNMI tools.
//!
//! TOML device tables, password resolution (env + plaintext), and
//! translation to `southbound_core::DeviceDescriptor`. Core never sees
//! these types; it receives pre-built descriptors.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use southbound_core::{Credentials, DeviceDescriptor, TlsPolicy, TlsSettings};

/// Environment variable consulted for a password when a device names no
/// `password_env` of its own.
pub const PASSWORD_ENV: &str = "SOUTHBOUND_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no password configured for device '{device}'")]
    NoCredentials { device: String },

    #[error("device '{name}' is not configured (known: {})", .known.join(", "))]
    UnknownDevice { name: String, known: Vec<String> },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level device inventory.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    /// Devices keyed by table name.
    #[serde(default)]
    pub devices: BTreeMap<String, DeviceEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    /// Connect and per-RPC timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Fail on unusable TLS material instead of degrading to skip-verify.
    #[serde(default)]
    pub strict_tls: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            strict_tls: false,
        }
    }
}

fn default_timeout() -> u64 {
    10
}

fn default_version() -> String {
    "1.0.0".into()
}

/// One device table.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DeviceEntry {
    /// Device ID (defaults to the table name).
    pub id: Option<String>,

    /// `host:port` of the gNMI endpoint.
    #[serde(default)]
    pub address: String,

    /// Target name for request prefixes (defaults to the device ID).
    pub target: Option<String>,

    #[serde(default = "default_version")]
    pub version: String,

    /// Plaintext HTTP/2, no TLS.
    #[serde(default)]
    pub plain: bool,

    /// Skip server certificate verification.
    #[serde(default)]
    pub insecure: bool,

    pub ca_cert: Option<PathBuf>,
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,

    pub username: Option<String>,

    /// Password (plaintext; prefer `password_env`).
    pub password: Option<String>,

    /// Environment variable holding the password.
    pub password_env: Option<String>,

    /// Override the default timeout, in seconds.
    pub timeout: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the inventory path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "southbound", "southbound").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("devices.toml");
            p
        },
        |dirs| dirs.config_dir().join("devices.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("southbound");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the inventory: defaults, then the TOML file, then
/// `SOUTHBOUND_`-prefixed environment variables (nested keys separated by
/// `__`, e.g. `SOUTHBOUND_DEVICES__LEAF1__ADDRESS`).
///
/// An explicit `path` must exist; the default path may be absent.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(p) if !p.exists() => {
            return Err(ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("config file not found: {}", p.display()),
            )));
        }
        Some(p) => p.to_path_buf(),
        None => config_path(),
    };

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("SOUTHBOUND_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

impl Config {
    pub fn tls_policy(&self) -> TlsPolicy {
        if self.defaults.strict_tls {
            TlsPolicy::Strict
        } else {
            TlsPolicy::Lenient
        }
    }

    /// Descriptor for the device table `name`.
    pub fn device(&self, name: &str) -> Result<DeviceDescriptor, ConfigError> {
        let entry = self
            .devices
            .get(name)
            .ok_or_else(|| ConfigError::UnknownDevice {
                name: name.into(),
                known: self.devices.keys().cloned().collect(),
            })?;
        entry_to_descriptor(name, entry, &self.defaults, &|var: &str| {
            std::env::var(var).ok()
        })
    }
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve device credentials. `env` looks up environment variables.
///
/// Without a username there are no credentials. With one, the password
/// comes from the device's `password_env`, then [`PASSWORD_ENV`], then the
/// plaintext `password`.
pub fn resolve_credentials(
    entry: &DeviceEntry,
    name: &str,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<Option<Credentials>, ConfigError> {
    let Some(username) = entry.username.clone() else {
        if entry.password.is_some() || entry.password_env.is_some() {
            return Err(ConfigError::Validation {
                field: format!("devices.{name}.username"),
                reason: "a password is configured without a username".into(),
            });
        }
        return Ok(None);
    };

    let password = entry
        .password_env
        .as_deref()
        .and_then(env)
        .or_else(|| env(PASSWORD_ENV))
        .or_else(|| entry.password.clone())
        .ok_or_else(|| ConfigError::NoCredentials {
            device: name.into(),
        })?;

    Ok(Some(Credentials {
        username,
        password: SecretString::from(password),
    }))
}

/// Translate a device table into a core descriptor.
///
/// This is the single boundary where config types cross into core types.
pub fn entry_to_descriptor(
    name: &str,
    entry: &DeviceEntry,
    defaults: &Defaults,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<DeviceDescriptor, ConfigError> {
    if entry.address.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: format!("devices.{name}.address"),
            reason: "address is required".into(),
        });
    }
    if entry.plain && (entry.cert.is_some() || entry.key.is_some() || entry.ca_cert.is_some()) {
        return Err(ConfigError::Validation {
            field: format!("devices.{name}.plain"),
            reason: "plaintext devices cannot carry TLS certificates".into(),
        });
    }

    let id = entry.id.clone().unwrap_or_else(|| name.to_string());
    let mut device = DeviceDescriptor::new(id, entry.version.clone(), entry.address.clone());
    if let Some(target) = &entry.target {
        device.target.clone_from(target);
    }
    let (timeout, field) = match entry.timeout {
        Some(secs) => (secs, format!("devices.{name}.timeout")),
        None => (defaults.timeout, "defaults.timeout".to_string()),
    };
    if timeout == 0 {
        return Err(ConfigError::Validation {
            field,
            reason: "timeout must be at least one second".into(),
        });
    }
    device.timeout = Some(Duration::from_secs(timeout));
    device.tls = TlsSettings {
        plain: entry.plain,
        insecure: entry.insecure,
        ca_cert: entry.ca_cert.clone(),
        cert: entry.cert.clone(),
        key: entry.key.clone(),
    };
    device.credentials = resolve_credentials(entry, name, env)?;
    Ok(device)
}
