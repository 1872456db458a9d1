// ── Core error types ──
//
// Operation-level errors for sessions and the registry. Callers can tell
// "not connected" from "bad request" from "device/transport failure"
// without looking at gRPC status codes.

use southbound_gnmi::{PathError, TextError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    /// The factory could not open a client. The registry is unchanged.
    #[error("could not create a gNMI client for {address}: {reason}")]
    ConnectFailed { address: String, reason: String },

    #[error(
        "gNMI client for {key} does not exist. Known clients: [{}]",
        .known.join(", ")
    )]
    NotFound { key: String, known: Vec<String> },

    /// The session (or the client it held) has been closed.
    #[error("gNMI session for {key} is closed")]
    Closed { key: String },

    // ── Request errors ───────────────────────────────────────────────
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    // ── In-flight failures ───────────────────────────────────────────
    #[error("target returned RPC error for {operation}({request}): {source}")]
    Transport {
        operation: &'static str,
        /// Text-format rendering of the failing request.
        request: String,
        #[source]
        source: southbound_gnmi::Error,
    },

    #[error("subscription failed: {message}")]
    Subscription { message: String },

    // ── TLS material ─────────────────────────────────────────────────
    /// Raised only under the strict TLS policy; the lenient policy logs
    /// and falls back instead.
    #[error("certificate load failed: {message}")]
    CertLoad { message: String },
}

impl CoreError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Returns `true` for lookups of unregistered devices.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` for errors caused by the caller's input rather than
    /// the device or the network.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }
}

// ── Conversion from wire-layer parse errors ──────────────────────────

impl From<PathError> for CoreError {
    fn from(err: PathError) -> Self {
        Self::invalid(err.to_string())
    }
}

impl From<TextError> for CoreError {
    fn from(err: TextError) -> Self {
        Self::invalid(err.to_string())
    }
}
