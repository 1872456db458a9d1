// ── Target sessions ──
//
// One session per registered device. It holds the current protocol client
// behind a narrow lock (reads clone the handle out, network I/O happens
// after the guard is gone) and exposes the gNMI operations with error
// context attached.

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use futures_util::StreamExt;
use southbound_gnmi::proto::{
    CapabilityRequest, CapabilityResponse, GetRequest, GetResponse, SetRequest, SetResponse,
    SubscribeRequest, SubscribeResponse, subscription_list,
};
use southbound_gnmi::text::{self, FromText, ToText};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{ClientFactory, ProtocolClient};
use crate::destination::Destination;
use crate::device::VersionedId;
use crate::error::CoreError;

/// Receives every response of one subscription, in order.
///
/// Returning an error ends the subscription with that error.
pub trait SubscriptionHandler: Send {
    fn handle(&mut self, response: SubscribeResponse) -> Result<(), CoreError>;
}

impl<F> SubscriptionHandler for F
where
    F: FnMut(SubscribeResponse) -> Result<(), CoreError> + Send,
{
    fn handle(&mut self, response: SubscribeResponse) -> Result<(), CoreError> {
        self(response)
    }
}

struct Connection {
    client: Arc<dyn ProtocolClient>,
    destination: Destination,
}

/// Live connection state for one device.
pub struct TargetSession {
    key: VersionedId,
    conn: RwLock<Connection>,
    factory: Arc<dyn ClientFactory>,
    context: CancellationToken,
}

impl std::fmt::Debug for TargetSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetSession")
            .field("key", &self.key)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl TargetSession {
    pub(crate) fn new(
        key: VersionedId,
        destination: Destination,
        client: Arc<dyn ProtocolClient>,
        factory: Arc<dyn ClientFactory>,
    ) -> Self {
        Self {
            key,
            conn: RwLock::new(Connection {
                client,
                destination,
            }),
            factory,
            context: CancellationToken::new(),
        }
    }

    pub fn key(&self) -> &VersionedId {
        &self.key
    }

    /// The client currently serving unary calls.
    pub fn client(&self) -> Arc<dyn ProtocolClient> {
        Arc::clone(&self.read().client)
    }

    pub fn destination(&self) -> Destination {
        self.read().destination.clone()
    }

    /// Cancelled once the session is closed. Subscriptions started from
    /// this session stop when it fires.
    pub fn context(&self) -> &CancellationToken {
        &self.context
    }

    pub fn is_closed(&self) -> bool {
        self.context.is_cancelled()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Connection> {
        self.conn.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install a freshly opened client, returning the one it replaces.
    /// The caller closes the returned client once no lock is held.
    pub(crate) fn replace(
        &self,
        client: Arc<dyn ProtocolClient>,
        destination: Destination,
    ) -> Arc<dyn ProtocolClient> {
        let mut conn = self.conn.write().unwrap_or_else(PoisonError::into_inner);
        conn.destination = destination;
        std::mem::replace(&mut conn.client, client)
    }

    /// Close the session and its client. Later operations fail with
    /// [`CoreError::Closed`]; closing twice is harmless.
    pub async fn close(&self) -> Result<(), CoreError> {
        if !self.context.is_cancelled() {
            info!(device = %self.key, "closing gNMI session");
        }
        self.context.cancel();
        self.client()
            .close()
            .await
            .map_err(|source| CoreError::Transport {
                operation: "Close",
                request: String::new(),
                source,
            })
    }

    fn closed(&self) -> CoreError {
        CoreError::Closed {
            key: self.key.to_string(),
        }
    }

    fn live_client(&self) -> Result<Arc<dyn ProtocolClient>, CoreError> {
        if self.is_closed() {
            return Err(self.closed());
        }
        Ok(self.client())
    }

    async fn call<M, T, F>(&self, operation: &'static str, req: &M, call: F) -> Result<T, CoreError>
    where
        M: ToText + Sync,
        F: Future<Output = Result<T, southbound_gnmi::Error>> + Send,
    {
        tokio::select! {
            biased;
            () = self.context.cancelled() => Err(self.closed()),
            result = call => result.map_err(|source| {
                debug!(device = %self.key, operation, error = %source, "gNMI call failed");
                CoreError::Transport {
                    operation,
                    request: text::to_text(req),
                    source,
                }
            }),
        }
    }

    // ── Structured operations ────────────────────────────────────────

    pub async fn capabilities(
        &self,
        req: CapabilityRequest,
    ) -> Result<CapabilityResponse, CoreError> {
        let client = self.live_client()?;
        self.call("Capabilities", &req, client.capabilities(req.clone()))
            .await
    }

    pub async fn get(&self, req: GetRequest) -> Result<GetResponse, CoreError> {
        let client = self.live_client()?;
        self.call("Get", &req, client.get(req.clone())).await
    }

    pub async fn set(&self, req: SetRequest) -> Result<SetResponse, CoreError> {
        let client = self.live_client()?;
        self.call("Set", &req, client.set(req.clone())).await
    }

    // ── Text-format adapters ─────────────────────────────────────────

    /// Capabilities from a text-format request. Empty input is the empty
    /// request.
    pub async fn capabilities_with_str(
        &self,
        request: &str,
    ) -> Result<CapabilityResponse, CoreError> {
        let req = parse_request::<CapabilityRequest>(request)?;
        self.capabilities(req).await
    }

    pub async fn get_with_str(&self, request: &str) -> Result<GetResponse, CoreError> {
        if request.trim().is_empty() {
            return Err(CoreError::invalid("cannot get an empty request"));
        }
        let req = parse_request::<GetRequest>(request)?;
        self.get(req).await
    }

    pub async fn set_with_str(&self, request: &str) -> Result<SetResponse, CoreError> {
        if request.trim().is_empty() {
            return Err(CoreError::invalid("cannot set an empty request"));
        }
        let req = parse_request::<SetRequest>(request)?;
        self.set(req).await
    }

    // ── Streaming ────────────────────────────────────────────────────

    /// Run one subscription to completion on a client of its own.
    ///
    /// Returns `Ok(())` when the target ends the stream, when `cancel` or
    /// the session context fires, or (for ONCE subscriptions) after the
    /// initial sync. The dedicated client is closed before returning.
    pub async fn subscribe<H>(
        &self,
        cancel: &CancellationToken,
        request: SubscribeRequest,
        mut handler: H,
    ) -> Result<(), CoreError>
    where
        H: SubscriptionHandler,
    {
        if self.is_closed() {
            return Err(self.closed());
        }
        let destination = self.destination();
        let client = self.factory.open(&destination).await?;
        debug!(device = %self.key, "opened dedicated subscription client");

        let result = self
            .run_subscription(client.as_ref(), cancel, request, &mut handler)
            .await;

        if let Err(e) = client.close().await {
            warn!(device = %self.key, error = %e, "failed to close subscription client");
        }
        result
    }

    async fn run_subscription<H>(
        &self,
        client: &dyn ProtocolClient,
        cancel: &CancellationToken,
        request: SubscribeRequest,
        handler: &mut H,
    ) -> Result<(), CoreError>
    where
        H: SubscriptionHandler,
    {
        let once = request
            .subscription_list()
            .is_some_and(|list| list.mode() == subscription_list::Mode::Once);

        let mut responses = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            () = self.context.cancelled() => return Ok(()),
            result = client.subscribe(request.clone()) => {
                result.map_err(|source| CoreError::Transport {
                    operation: "Subscribe",
                    request: text::to_text(&request),
                    source,
                })?
            }
        };

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!(device = %self.key, "subscription cancelled");
                    return Ok(());
                }
                () = self.context.cancelled() => {
                    debug!(device = %self.key, "session closed, ending subscription");
                    return Ok(());
                }
                next = responses.next() => next,
            };

            let Some(response) = next else {
                debug!(device = %self.key, "target ended the subscription");
                return Ok(());
            };
            let response = response.map_err(|e| CoreError::Subscription {
                message: e.to_string(),
            })?;

            let synced = response.is_sync();
            handler.handle(response)?;
            if once && synced {
                return Ok(());
            }
        }
    }
}

fn parse_request<M: FromText>(input: &str) -> Result<M, CoreError> {
    text::parse::<M>(input).map_err(|e| {
        CoreError::invalid(format!("unable to parse {} from {input:?} : {e}", M::NAME))
    })
}
