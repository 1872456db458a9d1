use thiserror::Error;

use crate::path::PathError;
use crate::text::TextError;

/// Top-level error type for the `southbound-gnmi` crate.
///
/// Covers channel construction, TLS setup, RPC status failures and the two
/// local parsers (paths and text-format requests). `southbound-core` maps
/// these into its own operation-level taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// The target address could not be turned into a channel endpoint.
    #[error("Invalid endpoint '{addr}': {message}")]
    InvalidEndpoint { addr: String, message: String },

    /// Channel establishment failed (connection refused, DNS failure, etc.)
    #[error("gRPC transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// TLS configuration error (bad roots, unusable client identity).
    #[error("TLS error: {0}")]
    Tls(String),

    // ── RPC ─────────────────────────────────────────────────────────
    /// Non-OK status returned by the target or the channel.
    #[error("RPC failed: {0}")]
    Status(#[from] tonic::Status),

    /// The client was closed before or during the call.
    #[error("gNMI client is closed")]
    Closed,

    /// Credentials could not be encoded as request metadata.
    #[error("Invalid request metadata '{key}': {message}")]
    Metadata { key: &'static str, message: String },

    // ── Local parsing ───────────────────────────────────────────────
    #[error(transparent)]
    Text(#[from] TextError),

    #[error("Invalid path: {0}")]
    Path(#[from] PathError),
}

impl Error {
    /// Returns `true` when the target could not be reached at all.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status(s) => s.code() == tonic::Code::Unavailable,
            _ => false,
        }
    }

    /// The gRPC status code, when the failure came back as a status.
    pub fn status_code(&self) -> Option<tonic::Code> {
        match self {
            Self::Status(s) => Some(s.code()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_status_is_detected() {
        let err = Error::from(tonic::Status::unavailable("connection refused"));
        assert!(err.is_unavailable());
        assert_eq!(err.status_code(), Some(tonic::Code::Unavailable));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn local_errors_have_no_status() {
        let err = Error::Tls("no roots".into());
        assert!(!err.is_unavailable());
        assert_eq!(err.status_code(), None);
    }
}
