//! gNMI wire layer for southbound sessions.
//!
//! Holds the prost message schema and the tonic service client. Channel and
//! TLS setup live in [`transport`]. [`path`] parses xpath-style strings and
//! [`text`] reads and writes protobuf text format.

pub mod client;
pub mod error;
pub mod path;
pub mod proto;
pub mod text;
pub mod transport;

pub use client::{Credentials, GnmiClient};
pub use error::Error;
pub use path::{PathError, parse_elements, parse_path, split_path};
pub use text::{FromText, TextError, ToText};
pub use transport::{DEFAULT_TIMEOUT, Identity, TlsConfig, TransportConfig};
