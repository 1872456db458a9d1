//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use southbound_config::ConfigError;
use southbound_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TRANSPORT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to {address}")]
    #[diagnostic(
        code(southbound::connection_failed),
        help(
            "Check that the device is reachable and serving gNMI.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { address: String, reason: String },

    #[error("TLS material for the device could not be used: {message}")]
    #[diagnostic(
        code(southbound::tls),
        help(
            "Fix the ca_cert/cert/key entries in the inventory, or drop --strict-tls\n\
             to fall back to an unverified connection."
        )
    )]
    Tls { message: String },

    // ── Device RPCs ──────────────────────────────────────────────────

    #[error("{operation} failed: {message}")]
    #[diagnostic(
        code(southbound::rpc),
        help("Request sent: {request}")
    )]
    Rpc {
        operation: String,
        request: String,
        message: String,
    },

    #[error("Subscription failed: {message}")]
    #[diagnostic(code(southbound::subscription))]
    Subscription { message: String },

    #[error("Session for {key} is closed")]
    #[diagnostic(code(southbound::closed))]
    Closed { key: String },

    // ── Input ────────────────────────────────────────────────────────

    #[error("Invalid request: {message}")]
    #[diagnostic(
        code(southbound::invalid_request),
        help("Requests are written in protobuf text format, e.g. 'path: <elem: <name: \"system\">>'")
    )]
    InvalidRequest { message: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(southbound::validation))]
    Validation { field: String, reason: String },

    // ── Inventory ────────────────────────────────────────────────────

    #[error("No device selected")]
    #[diagnostic(
        code(southbound::no_device),
        help("Pick one with --device (-d). Configured devices: {available}")
    )]
    NoDevice { available: String },

    #[error("Device '{name}' not found in the inventory")]
    #[diagnostic(
        code(southbound::device_not_found),
        help(
            "Configured devices: {available}\n\
             Run: southbound devices"
        )
    )]
    DeviceNotFound { name: String, available: String },

    #[error("Session {key} not found")]
    #[diagnostic(code(southbound::session_not_found))]
    SessionNotFound { key: String },

    #[error("No password available for device '{device}'")]
    #[diagnostic(
        code(southbound::no_credentials),
        help("Set password_env in the device table, or export SOUTHBOUND_PASSWORD.")
    )]
    NoCredentials { device: String },

    #[error(transparent)]
    #[diagnostic(code(southbound::config))]
    Config(Box<ConfigError>),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render output: {0}")]
    #[diagnostic(code(southbound::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Tls { .. } => exit_code::CONNECTION,
            Self::Rpc { .. } => exit_code::TRANSPORT,
            Self::DeviceNotFound { .. } | Self::SessionNotFound { .. } => exit_code::NOT_FOUND,
            Self::InvalidRequest { .. } | Self::Validation { .. } | Self::NoDevice { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectFailed { address, reason } => {
                CliError::ConnectionFailed { address, reason }
            }
            CoreError::NotFound { key, .. } => CliError::SessionNotFound { key },
            CoreError::Closed { key } => CliError::Closed { key },
            CoreError::InvalidArgument { message } => CliError::InvalidRequest { message },
            CoreError::Transport {
                operation,
                request,
                source,
            } => CliError::Rpc {
                operation: operation.to_string(),
                request,
                message: source.to_string(),
            },
            CoreError::Subscription { message } => CliError::Subscription { message },
            CoreError::CertLoad { message } => CliError::Tls { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::UnknownDevice { name, known } => CliError::DeviceNotFound {
                name,
                available: available(&known),
            },
            ConfigError::NoCredentials { device } => CliError::NoCredentials { device },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(Box::new(other)),
        }
    }
}

pub(crate) fn available(names: &[String]) -> String {
    if names.is_empty() {
        "(none)".into()
    } else {
        names.join(", ")
    }
}
