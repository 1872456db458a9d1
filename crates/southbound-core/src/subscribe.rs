// ── Subscribe request building ──
//
// Turns loosely-typed subscription options (mode names as strings, paths
// as segment lists) into a structured SubscribeRequest. Validation is all
// up front: either the whole request is built or an error comes back.

use std::str::FromStr;

use serde::Deserialize;
use southbound_gnmi::proto::{
    SubscribeRequest, Subscription, SubscriptionList, SubscriptionMode, subscribe_request,
    subscription_list,
};
use southbound_gnmi::{parse_elements, parse_path};
use strum::{Display, EnumString};

use crate::error::CoreError;

/// Overall delivery semantics of a subscription.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum SubscribeMode {
    Once,
    Poll,
    #[default]
    Stream,
}

impl SubscribeMode {
    /// Parse a mode name, ignoring case. Empty input means the default.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        if value.is_empty() {
            return Ok(Self::default());
        }
        Self::from_str(value)
            .map_err(|_| CoreError::invalid(format!("subscribe mode ({value}) invalid")))
    }
}

impl From<SubscribeMode> for subscription_list::Mode {
    fn from(mode: SubscribeMode) -> Self {
        match mode {
            SubscribeMode::Once => Self::Once,
            SubscribeMode::Poll => Self::Poll,
            SubscribeMode::Stream => Self::Stream,
        }
    }
}

/// Per-path delivery semantics within a STREAM subscription.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum StreamMode {
    OnChange,
    Sample,
    #[default]
    TargetDefined,
}

impl StreamMode {
    /// Parse a stream mode name, ignoring case. Empty input means the
    /// default.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        if value.is_empty() {
            return Ok(Self::default());
        }
        Self::from_str(value)
            .map_err(|_| CoreError::invalid(format!("subscribe stream mode ({value}) invalid")))
    }
}

impl From<StreamMode> for SubscriptionMode {
    fn from(mode: StreamMode) -> Self {
        match mode {
            StreamMode::OnChange => Self::OnChange,
            StreamMode::Sample => Self::Sample,
            StreamMode::TargetDefined => Self::TargetDefined,
        }
    }
}

/// Caller-facing description of a subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SubscribeOptions {
    /// One entry per subscription; each entry is a list of path segments,
    /// optionally with `[key=value]` predicates.
    pub paths: Vec<Vec<String>>,
    /// Slash-separated prefix path. Empty means no prefix.
    pub prefix: String,
    pub mode: String,
    pub stream_mode: String,
    /// Nanoseconds, passed through unvalidated.
    pub sample_interval: u64,
    /// Nanoseconds, passed through unvalidated.
    pub heartbeat_interval: u64,
    pub updates_only: bool,
    /// Attached to every subscription path.
    pub origin: String,
}

/// Build a subscribe request, preserving the order of `options.paths`.
pub fn build_subscribe_request(options: &SubscribeOptions) -> Result<SubscribeRequest, CoreError> {
    let mode = SubscribeMode::parse(&options.mode)?;
    let stream_mode = SubscriptionMode::from(StreamMode::parse(&options.stream_mode)?);

    let prefix = if options.prefix.is_empty() {
        None
    } else {
        Some(parse_path(&options.prefix)?)
    };

    let subscription = options
        .paths
        .iter()
        .map(|segments| -> Result<Subscription, CoreError> {
            let mut path = parse_elements(segments.as_slice())?;
            path.origin.clone_from(&options.origin);
            Ok(Subscription {
                path: Some(path),
                mode: stream_mode.into(),
                sample_interval: options.sample_interval,
                heartbeat_interval: options.heartbeat_interval,
                ..Subscription::default()
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SubscribeRequest {
        request: Some(subscribe_request::Request::Subscribe(SubscriptionList {
            prefix,
            subscription,
            mode: subscription_list::Mode::from(mode).into(),
            updates_only: options.updates_only,
            ..SubscriptionList::default()
        })),
    })
}
