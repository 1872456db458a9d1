//! Session management between an orchestration layer and gNMI devices.
//!
//! - **[`Registry`]**: keyed store of [`TargetSession`]s.
//!   [`connect()`](Registry::connect) resolves TLS material, dials through an
//!   injected [`ClientFactory`], and publishes or swaps the session;
//!   [`get()`](Registry::get) looks one up.
//!
//! - **[`TargetSession`]**: Capabilities/Get/Set on the device's current
//!   client (structured and text-format forms), plus
//!   [`subscribe()`](TargetSession::subscribe), which runs each subscription
//!   on a dedicated client.
//!
//! - **[`CertificateResolver`]**: turns a [`DeviceDescriptor`] into a
//!   [`Destination`] (roots, skip-verify, client keypair, credentials) under a
//!   [`TlsPolicy`].
//!
//! - **[`build_subscribe_request()`]**: validates [`SubscribeOptions`] into a
//!   gNMI `SubscribeRequest`.

pub mod client;
pub mod destination;
pub mod device;
pub mod error;
pub mod registry;
pub mod resolver;
pub mod session;
pub mod subscribe;

// ── Primary re-exports ──────────────────────────────────────────────
pub use client::{ClientFactory, GrpcClient, GrpcClientFactory, ProtocolClient, ResponseStream};
pub use destination::{ClientIdentity, Destination, KeypairSource, TlsDescriptor};
pub use device::{Credentials, DeviceDescriptor, TlsSettings, VersionedId};
pub use error::CoreError;
pub use registry::Registry;
pub use resolver::{CertificateResolver, TlsPolicy};
pub use session::{SubscriptionHandler, TargetSession};
pub use subscribe::{StreamMode, SubscribeMode, SubscribeOptions, build_subscribe_request};

pub use southbound_gnmi::proto;
pub use tokio_util::sync::CancellationToken;
