// Stub protocol client and factory standing in for gNMI devices.
#![allow(dead_code, clippy::unwrap_used)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;
use southbound_core::proto::{
    CapabilityRequest, CapabilityResponse, GetRequest, GetResponse, SetRequest, SetResponse,
    SubscribeRequest, SubscribeResponse, UpdateResult, subscribe_response, update_result,
};
use southbound_core::{ClientFactory, CoreError, Destination, ProtocolClient, ResponseStream};
use southbound_gnmi::Error;

// ── Client ──────────────────────────────────────────────────────────

/// Scripted behaviour shared by every client a factory opens.
#[derive(Clone, Default)]
pub struct Script {
    /// Responses replayed to each subscription.
    pub updates: Vec<SubscribeResponse>,
    /// Keep subscriptions open after the scripted responses.
    pub hold_open: bool,
    /// Fail every unary call with this status code.
    pub fail_with: Option<tonic::Code>,
}

pub struct StubClient {
    pub id: usize,
    script: Script,
    pub calls: AtomicUsize,
    pub closes: AtomicUsize,
    pub subscriptions: Mutex<Vec<SubscribeRequest>>,
}

impl StubClient {
    fn new(id: usize, script: Script) -> Self {
        Self {
            id,
            script,
            calls: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn record(&self) -> Result<(), Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script.fail_with {
            Some(code) => Err(Error::Status(tonic::Status::new(*code, "stub failure"))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ProtocolClient for StubClient {
    async fn capabilities(&self, _req: CapabilityRequest) -> Result<CapabilityResponse, Error> {
        self.record()?;
        Ok(CapabilityResponse {
            supported_encodings: vec![southbound_core::proto::Encoding::Ascii.into()],
            gnmi_version: "1.0".into(),
            ..CapabilityResponse::default()
        })
    }

    async fn get(&self, _req: GetRequest) -> Result<GetResponse, Error> {
        self.record()?;
        Ok(GetResponse::default())
    }

    async fn set(&self, req: SetRequest) -> Result<SetResponse, Error> {
        self.record()?;
        let response = req
            .delete
            .into_iter()
            .map(|path| UpdateResult {
                path: Some(path),
                op: update_result::Operation::Delete.into(),
                ..UpdateResult::default()
            })
            .collect();
        Ok(SetResponse {
            response,
            ..SetResponse::default()
        })
    }

    async fn subscribe(&self, req: SubscribeRequest) -> Result<ResponseStream, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.subscriptions.lock().unwrap().push(req);
        let replay = stream::iter(self.script.updates.clone().into_iter().map(Ok));
        if self.script.hold_open {
            Ok(replay.chain(stream::pending()).boxed())
        } else {
            Ok(replay.boxed())
        }
    }

    async fn close(&self) -> Result<(), Error> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ── Factory ─────────────────────────────────────────────────────────

#[derive(Default)]
pub struct StubFactory {
    script: Mutex<Script>,
    fail: AtomicBool,
    pub opened: Mutex<Vec<Arc<StubClient>>>,
    pub destinations: Mutex<Vec<Destination>>,
}

impl StubFactory {
    pub fn with_script(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            ..Self::default()
        })
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_script(&self, script: Script) {
        *self.script.lock().unwrap() = script;
    }

    pub fn client(&self, index: usize) -> Arc<StubClient> {
        Arc::clone(&self.opened.lock().unwrap()[index])
    }

    pub fn open_count(&self) -> usize {
        self.opened.lock().unwrap().len()
    }
}

#[async_trait]
impl ClientFactory for StubFactory {
    async fn open(&self, dest: &Destination) -> Result<Arc<dyn ProtocolClient>, CoreError> {
        tokio::task::yield_now().await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(CoreError::ConnectFailed {
                address: dest.addrs.join(","),
                reason: "connection refused".into(),
            });
        }
        self.destinations.lock().unwrap().push(dest.clone());
        let mut opened = self.opened.lock().unwrap();
        let client = Arc::new(StubClient::new(opened.len(), self.script.lock().unwrap().clone()));
        opened.push(Arc::clone(&client));
        Ok(client)
    }
}

// ── Responses ───────────────────────────────────────────────────────

pub fn sync_response() -> SubscribeResponse {
    SubscribeResponse {
        response: Some(subscribe_response::Response::SyncResponse(true)),
    }
}

pub fn update_response(timestamp: i64) -> SubscribeResponse {
    SubscribeResponse {
        response: Some(subscribe_response::Response::Update(
            southbound_core::proto::Notification {
                timestamp,
                ..Default::default()
            },
        )),
    }
}
