// ── Protocol clients and the factory that opens them ──
//
// Sessions talk to devices only through `ProtocolClient`, and the registry
// obtains clients only through an injected `ClientFactory`. The gRPC pair
// below is what production uses; tests substitute their own.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use southbound_gnmi::proto::{
    CapabilityRequest, CapabilityResponse, GetRequest, GetResponse, SetRequest, SetResponse,
    SubscribeRequest, SubscribeResponse,
};
use southbound_gnmi::{Error, GnmiClient};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use crate::destination::Destination;
use crate::error::CoreError;

/// Responses of one subscription, in arrival order. Dropping the stream
/// tears the subscription down.
pub type ResponseStream = BoxStream<'static, Result<SubscribeResponse, Error>>;

/// One live connection to a gNMI target.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    async fn capabilities(&self, req: CapabilityRequest) -> Result<CapabilityResponse, Error>;

    async fn get(&self, req: GetRequest) -> Result<GetResponse, Error>;

    async fn set(&self, req: SetRequest) -> Result<SetResponse, Error>;

    /// Send `req` as the opening message of a Subscribe stream.
    async fn subscribe(&self, req: SubscribeRequest) -> Result<ResponseStream, Error>;

    /// Release the connection. Calling it again is a no-op.
    async fn close(&self) -> Result<(), Error>;
}

/// Opens protocol clients for resolved destinations.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// Fails with [`CoreError::ConnectFailed`] when no address accepts
    /// a connection.
    async fn open(&self, dest: &Destination) -> Result<Arc<dyn ProtocolClient>, CoreError>;
}

// ── gRPC implementation ──────────────────────────────────────────────

/// Dials each destination address in turn and keeps the first that
/// connects.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrpcClientFactory;

#[async_trait]
impl ClientFactory for GrpcClientFactory {
    async fn open(&self, dest: &Destination) -> Result<Arc<dyn ProtocolClient>, CoreError> {
        let mut last_error = None;
        for addr in &dest.addrs {
            let config = dest.transport_config(addr);
            match GnmiClient::connect(&config, dest.credentials.clone()).await {
                Ok(client) => {
                    debug!(address = %addr, target = %dest.target, "gNMI channel established");
                    return Ok(Arc::new(GrpcClient::new(client)));
                }
                Err(e) => {
                    warn!(address = %addr, error = %e, "gNMI dial failed");
                    last_error = Some((addr.clone(), e.to_string()));
                }
            }
        }

        let (address, reason) = last_error
            .unwrap_or_else(|| (String::new(), "destination has no addresses".to_string()));
        Err(CoreError::ConnectFailed { address, reason })
    }
}

/// [`ProtocolClient`] over a tonic channel.
///
/// Closing drops this handle's channel. Calls already in flight hold their
/// own clone and run to completion.
#[derive(Debug)]
pub struct GrpcClient {
    inner: Mutex<Option<GnmiClient>>,
}

impl GrpcClient {
    pub fn new(client: GnmiClient) -> Self {
        Self {
            inner: Mutex::new(Some(client)),
        }
    }

    fn handle(&self) -> Result<GnmiClient, Error> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(Error::Closed)
    }
}

#[async_trait]
impl ProtocolClient for GrpcClient {
    async fn capabilities(&self, req: CapabilityRequest) -> Result<CapabilityResponse, Error> {
        let mut client = self.handle()?;
        client.capabilities(req).await
    }

    async fn get(&self, req: GetRequest) -> Result<GetResponse, Error> {
        let mut client = self.handle()?;
        client.get(req).await
    }

    async fn set(&self, req: SetRequest) -> Result<SetResponse, Error> {
        let mut client = self.handle()?;
        client.set(req).await
    }

    async fn subscribe(&self, req: SubscribeRequest) -> Result<ResponseStream, Error> {
        let mut client = self.handle()?;
        let (tx, rx) = mpsc::channel(1);
        tx.send(req).await.map_err(|_| Error::Closed)?;
        let responses = client.subscribe(ReceiverStream::new(rx)).await?;

        // The request sender rides along with the response stream: the
        // target sees the outbound half close as soon as it is dropped.
        let stream = stream::unfold(Some((responses, tx)), |state| async move {
            let (mut responses, tx) = state?;
            match responses.message().await {
                Ok(Some(response)) => Some((Ok(response), Some((responses, tx)))),
                Ok(None) => None,
                Err(status) => Some((Err(Error::from(status)), None)),
            }
        });
        Ok(stream.boxed())
    }

    async fn close(&self) -> Result<(), Error> {
        let previous = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            debug!("gNMI channel released");
        }
        Ok(())
    }
}
