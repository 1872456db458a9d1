// gNMI service client.
//
// Shaped like tonic-build output for `gnmi.gNMI`, written out by hand so the
// crate needs no protoc at build time. Each call is a plain tonic unary or
// bidirectional-streaming request with optional credential metadata.

use secrecy::{ExposeSecret, SecretString};
use tokio_stream::Stream;
use tonic::client::Grpc;
use tonic::codec::{ProstCodec, Streaming};
use tonic::codegen::http::uri::PathAndQuery;
use tonic::metadata::MetadataValue;
use tonic::transport::Channel;
use tonic::{Request, Status};

use crate::error::Error;
use crate::proto::{
    CapabilityRequest, CapabilityResponse, GetRequest, GetResponse, SetRequest, SetResponse,
    SubscribeRequest, SubscribeResponse,
};
use crate::transport::TransportConfig;

/// Username/password sent as `username` / `password` request metadata.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

/// Client for the `gnmi.gNMI` service over one channel.
///
/// Cloning is cheap and shares the underlying channel.
#[derive(Debug, Clone)]
pub struct GnmiClient {
    inner: Grpc<Channel>,
    credentials: Option<Credentials>,
}

impl GnmiClient {
    pub fn new(channel: Channel, credentials: Option<Credentials>) -> Self {
        Self {
            inner: Grpc::new(channel),
            credentials,
        }
    }

    /// Dial the target described by `config`.
    pub async fn connect(
        config: &TransportConfig,
        credentials: Option<Credentials>,
    ) -> Result<Self, Error> {
        let channel = config.connect().await?;
        Ok(Self::new(channel, credentials))
    }

    fn request<T>(&self, message: T) -> Result<Request<T>, Error> {
        let mut request = Request::new(message);
        if let Some(creds) = &self.credentials {
            let metadata = request.metadata_mut();
            let username =
                MetadataValue::try_from(creds.username.as_str()).map_err(|e| Error::Metadata {
                    key: "username",
                    message: e.to_string(),
                })?;
            let password = MetadataValue::try_from(creds.password.expose_secret()).map_err(|e| {
                Error::Metadata {
                    key: "password",
                    message: e.to_string(),
                }
            })?;
            metadata.insert("username", username);
            metadata.insert("password", password);
        }
        Ok(request)
    }

    async fn ready(&mut self) -> Result<(), Error> {
        self.inner
            .ready()
            .await
            .map_err(|e| Status::unknown(format!("Service was not ready: {e}")))?;
        Ok(())
    }

    pub async fn capabilities(
        &mut self,
        req: CapabilityRequest,
    ) -> Result<CapabilityResponse, Error> {
        let request = self.request(req)?;
        self.ready().await?;
        let codec = ProstCodec::default();
        let path = PathAndQuery::from_static("/gnmi.gNMI/Capabilities");
        let response = self.inner.unary(request, path, codec).await?;
        Ok(response.into_inner())
    }

    pub async fn get(&mut self, req: GetRequest) -> Result<GetResponse, Error> {
        let request = self.request(req)?;
        self.ready().await?;
        let codec = ProstCodec::default();
        let path = PathAndQuery::from_static("/gnmi.gNMI/Get");
        let response = self.inner.unary(request, path, codec).await?;
        Ok(response.into_inner())
    }

    pub async fn set(&mut self, req: SetRequest) -> Result<SetResponse, Error> {
        let request = self.request(req)?;
        self.ready().await?;
        let codec = ProstCodec::default();
        let path = PathAndQuery::from_static("/gnmi.gNMI/Set");
        let response = self.inner.unary(request, path, codec).await?;
        Ok(response.into_inner())
    }

    /// Open the bidirectional Subscribe stream. `requests` supplies the
    /// initial subscription list followed by any poll triggers; the stream
    /// stays open for as long as `requests` does.
    pub async fn subscribe<S>(&mut self, requests: S) -> Result<Streaming<SubscribeResponse>, Error>
    where
        S: Stream<Item = SubscribeRequest> + Send + 'static,
    {
        let request = self.request(requests)?;
        self.ready().await?;
        let codec = ProstCodec::default();
        let path = PathAndQuery::from_static("/gnmi.gNMI/Subscribe");
        let response = self.inner.streaming(request, path, codec).await?;
        Ok(response.into_inner())
    }
}
