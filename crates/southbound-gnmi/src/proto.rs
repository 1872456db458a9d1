// gNMI message schema
//
// Hand-maintained prost definitions for the subset of `gnmi.proto` the
// southbound sessions speak. Field numbers match the upstream schema
// (openconfig/gnmi, proto/gnmi/gnmi.proto); deprecated fields and
// extensions are omitted and skipped on decode.

use std::collections::BTreeMap;

use serde::Serialize;

// ── Paths ───────────────────────────────────────────────────────────

/// A structured data-tree path, optionally scoped to an origin and target.
#[derive(Clone, PartialEq, Eq, Serialize, ::prost::Message)]
pub struct Path {
    /// Origin of the path (e.g. `openconfig`), empty for the default tree.
    #[prost(string, tag = "2")]
    pub origin: String,
    #[prost(message, repeated, tag = "3")]
    pub elem: Vec<PathElem>,
    /// Target device name, used by gNMI proxies to route the request.
    #[prost(string, tag = "4")]
    pub target: String,
}

/// One element of a [`Path`], with optional list-key predicates.
#[derive(Clone, PartialEq, Eq, Serialize, ::prost::Message)]
pub struct PathElem {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(btree_map = "string, string", tag = "2")]
    pub key: BTreeMap<String, String>,
}

impl PathElem {
    /// Element without key predicates.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: BTreeMap::new(),
        }
    }
}

// ── Values ──────────────────────────────────────────────────────────

#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
pub struct TypedValue {
    #[prost(
        oneof = "typed_value::Value",
        tags = "1, 2, 3, 4, 5, 6, 7, 8, 10, 11, 12, 13, 14"
    )]
    pub value: Option<typed_value::Value>,
}

pub mod typed_value {
    use serde::Serialize;

    #[derive(Clone, PartialEq, Serialize, ::prost::Oneof)]
    pub enum Value {
        #[prost(string, tag = "1")]
        StringVal(String),
        #[prost(int64, tag = "2")]
        IntVal(i64),
        #[prost(uint64, tag = "3")]
        UintVal(u64),
        #[prost(bool, tag = "4")]
        BoolVal(bool),
        #[prost(bytes = "vec", tag = "5")]
        BytesVal(Vec<u8>),
        #[prost(float, tag = "6")]
        FloatVal(f32),
        #[prost(message, tag = "7")]
        DecimalVal(super::Decimal64),
        #[prost(message, tag = "8")]
        LeaflistVal(super::ScalarArray),
        #[prost(bytes = "vec", tag = "10")]
        JsonVal(Vec<u8>),
        #[prost(bytes = "vec", tag = "11")]
        JsonIetfVal(Vec<u8>),
        #[prost(string, tag = "12")]
        AsciiVal(String),
        #[prost(bytes = "vec", tag = "13")]
        ProtoBytes(Vec<u8>),
        #[prost(double, tag = "14")]
        DoubleVal(f64),
    }
}

impl TypedValue {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            value: Some(typed_value::Value::StringVal(value.into())),
        }
    }

    /// The string payload, if this is a `string_val`.
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            Some(typed_value::Value::StringVal(s)) => Some(s),
            _ => None,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, ::prost::Message)]
pub struct Decimal64 {
    #[prost(int64, tag = "1")]
    pub digits: i64,
    #[prost(uint32, tag = "2")]
    pub precision: u32,
}

#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
pub struct ScalarArray {
    #[prost(message, repeated, tag = "1")]
    pub element: Vec<TypedValue>,
}

// ── Notifications ───────────────────────────────────────────────────

#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
pub struct Update {
    #[prost(message, optional, tag = "1")]
    pub path: Option<Path>,
    #[prost(message, optional, tag = "3")]
    pub val: Option<TypedValue>,
    #[prost(uint32, tag = "4")]
    pub duplicates: u32,
}

#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
pub struct Notification {
    /// Nanoseconds since the Unix epoch.
    #[prost(int64, tag = "1")]
    pub timestamp: i64,
    #[prost(message, optional, tag = "2")]
    pub prefix: Option<Path>,
    #[prost(message, repeated, tag = "4")]
    pub update: Vec<Update>,
    #[prost(message, repeated, tag = "5")]
    pub delete: Vec<Path>,
    #[prost(bool, tag = "6")]
    pub atomic: bool,
}

#[derive(Clone, PartialEq, Eq, Serialize, ::prost::Message)]
pub struct Error {
    #[prost(uint32, tag = "1")]
    pub code: u32,
    #[prost(string, tag = "2")]
    pub message: String,
}

// ── Capabilities ────────────────────────────────────────────────────

#[derive(Clone, PartialEq, Eq, Serialize, ::prost::Message)]
pub struct CapabilityRequest {}

#[derive(Clone, PartialEq, Eq, Serialize, ::prost::Message)]
pub struct CapabilityResponse {
    #[prost(message, repeated, tag = "1")]
    pub supported_models: Vec<ModelData>,
    #[prost(enumeration = "Encoding", repeated, tag = "2")]
    pub supported_encodings: Vec<i32>,
    #[prost(string, tag = "3")]
    pub gnmi_version: String,
}

#[derive(Clone, PartialEq, Eq, Serialize, ::prost::Message)]
pub struct ModelData {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub organization: String,
    #[prost(string, tag = "3")]
    pub version: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Encoding {
    Json = 0,
    Bytes = 1,
    Proto = 2,
    Ascii = 3,
    JsonIetf = 4,
}

impl Encoding {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Bytes => "BYTES",
            Self::Proto => "PROTO",
            Self::Ascii => "ASCII",
            Self::JsonIetf => "JSON_IETF",
        }
    }

    pub fn from_str_name(value: &str) -> Option<Self> {
        match value {
            "JSON" => Some(Self::Json),
            "BYTES" => Some(Self::Bytes),
            "PROTO" => Some(Self::Proto),
            "ASCII" => Some(Self::Ascii),
            "JSON_IETF" => Some(Self::JsonIetf),
            _ => None,
        }
    }
}

// ── Get ─────────────────────────────────────────────────────────────

#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
pub struct GetRequest {
    #[prost(message, optional, tag = "1")]
    pub prefix: Option<Path>,
    #[prost(message, repeated, tag = "2")]
    pub path: Vec<Path>,
    #[prost(enumeration = "get_request::DataType", tag = "3")]
    pub r#type: i32,
    #[prost(enumeration = "Encoding", tag = "5")]
    pub encoding: i32,
    #[prost(message, repeated, tag = "6")]
    pub use_models: Vec<ModelData>,
}

pub mod get_request {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum DataType {
        All = 0,
        Config = 1,
        State = 2,
        Operational = 3,
    }

    impl DataType {
        pub fn as_str_name(&self) -> &'static str {
            match self {
                Self::All => "ALL",
                Self::Config => "CONFIG",
                Self::State => "STATE",
                Self::Operational => "OPERATIONAL",
            }
        }

        pub fn from_str_name(value: &str) -> Option<Self> {
            match value {
                "ALL" => Some(Self::All),
                "CONFIG" => Some(Self::Config),
                "STATE" => Some(Self::State),
                "OPERATIONAL" => Some(Self::Operational),
                _ => None,
            }
        }
    }
}

#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
pub struct GetResponse {
    #[prost(message, repeated, tag = "1")]
    pub notification: Vec<Notification>,
}

// ── Set ─────────────────────────────────────────────────────────────

#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
pub struct SetRequest {
    #[prost(message, optional, tag = "1")]
    pub prefix: Option<Path>,
    #[prost(message, repeated, tag = "2")]
    pub delete: Vec<Path>,
    #[prost(message, repeated, tag = "3")]
    pub replace: Vec<Update>,
    #[prost(message, repeated, tag = "4")]
    pub update: Vec<Update>,
}

#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
pub struct SetResponse {
    #[prost(message, optional, tag = "1")]
    pub prefix: Option<Path>,
    #[prost(message, repeated, tag = "2")]
    pub response: Vec<UpdateResult>,
    #[prost(int64, tag = "4")]
    pub timestamp: i64,
}

#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
pub struct UpdateResult {
    #[prost(message, optional, tag = "2")]
    pub path: Option<Path>,
    #[prost(message, optional, tag = "3")]
    pub message: Option<Error>,
    #[prost(enumeration = "update_result::Operation", tag = "4")]
    pub op: i32,
}

pub mod update_result {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Operation {
        Invalid = 0,
        Delete = 1,
        Replace = 2,
        Update = 3,
    }

    impl Operation {
        pub fn as_str_name(&self) -> &'static str {
            match self {
                Self::Invalid => "INVALID",
                Self::Delete => "DELETE",
                Self::Replace => "REPLACE",
                Self::Update => "UPDATE",
            }
        }

        pub fn from_str_name(value: &str) -> Option<Self> {
            match value {
                "INVALID" => Some(Self::Invalid),
                "DELETE" => Some(Self::Delete),
                "REPLACE" => Some(Self::Replace),
                "UPDATE" => Some(Self::Update),
                _ => None,
            }
        }
    }
}

// ── Subscribe ───────────────────────────────────────────────────────

#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
pub struct SubscribeRequest {
    #[prost(oneof = "subscribe_request::Request", tags = "1, 3")]
    pub request: Option<subscribe_request::Request>,
}

pub mod subscribe_request {
    use serde::Serialize;

    #[derive(Clone, PartialEq, Serialize, ::prost::Oneof)]
    pub enum Request {
        #[prost(message, tag = "1")]
        Subscribe(super::SubscriptionList),
        #[prost(message, tag = "3")]
        Poll(super::Poll),
    }
}

impl SubscribeRequest {
    /// The subscription list, when this is an initial subscribe request.
    pub fn subscription_list(&self) -> Option<&SubscriptionList> {
        match &self.request {
            Some(subscribe_request::Request::Subscribe(list)) => Some(list),
            _ => None,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, ::prost::Message)]
pub struct Poll {}

#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
pub struct SubscribeResponse {
    #[prost(oneof = "subscribe_response::Response", tags = "1, 3")]
    pub response: Option<subscribe_response::Response>,
}

pub mod subscribe_response {
    use serde::Serialize;

    #[derive(Clone, PartialEq, Serialize, ::prost::Oneof)]
    pub enum Response {
        #[prost(message, tag = "1")]
        Update(super::Notification),
        /// Marks the end of the initial snapshot.
        #[prost(bool, tag = "3")]
        SyncResponse(bool),
    }
}

impl SubscribeResponse {
    pub fn is_sync(&self) -> bool {
        matches!(
            self.response,
            Some(subscribe_response::Response::SyncResponse(true))
        )
    }
}

#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
pub struct SubscriptionList {
    #[prost(message, optional, tag = "1")]
    pub prefix: Option<Path>,
    #[prost(message, repeated, tag = "2")]
    pub subscription: Vec<Subscription>,
    #[prost(message, optional, tag = "4")]
    pub qos: Option<QosMarking>,
    #[prost(enumeration = "subscription_list::Mode", tag = "5")]
    pub mode: i32,
    #[prost(bool, tag = "6")]
    pub allow_aggregation: bool,
    #[prost(message, repeated, tag = "7")]
    pub use_models: Vec<ModelData>,
    #[prost(enumeration = "Encoding", tag = "8")]
    pub encoding: i32,
    #[prost(bool, tag = "9")]
    pub updates_only: bool,
}

pub mod subscription_list {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Mode {
        Stream = 0,
        Once = 1,
        Poll = 2,
    }

    impl Mode {
        pub fn as_str_name(&self) -> &'static str {
            match self {
                Self::Stream => "STREAM",
                Self::Once => "ONCE",
                Self::Poll => "POLL",
            }
        }

        pub fn from_str_name(value: &str) -> Option<Self> {
            match value {
                "STREAM" => Some(Self::Stream),
                "ONCE" => Some(Self::Once),
                "POLL" => Some(Self::Poll),
                _ => None,
            }
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, ::prost::Message)]
pub struct Subscription {
    #[prost(message, optional, tag = "1")]
    pub path: Option<Path>,
    #[prost(enumeration = "SubscriptionMode", tag = "2")]
    pub mode: i32,
    /// Nanoseconds between samples in SAMPLE mode.
    #[prost(uint64, tag = "3")]
    pub sample_interval: u64,
    #[prost(bool, tag = "4")]
    pub suppress_redundant: bool,
    /// Nanoseconds between forced updates.
    #[prost(uint64, tag = "5")]
    pub heartbeat_interval: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum SubscriptionMode {
    TargetDefined = 0,
    OnChange = 1,
    Sample = 2,
}

impl SubscriptionMode {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::TargetDefined => "TARGET_DEFINED",
            Self::OnChange => "ON_CHANGE",
            Self::Sample => "SAMPLE",
        }
    }

    pub fn from_str_name(value: &str) -> Option<Self> {
        match value {
            "TARGET_DEFINED" => Some(Self::TargetDefined),
            "ON_CHANGE" => Some(Self::OnChange),
            "SAMPLE" => Some(Self::Sample),
            _ => None,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, ::prost::Message)]
pub struct QosMarking {
    #[prost(uint32, tag = "1")]
    pub marking: u32,
}
