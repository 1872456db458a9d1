//! Subscribe command handler.
//!
//! The request is built before any connection is made, so bad modes and
//! malformed paths fail without touching the network. Ctrl-C cancels the
//! subscription and still closes the session cleanly.

use southbound_config::Config;
use southbound_core::proto::SubscribeResponse;
use southbound_core::{CancellationToken, CoreError, SubscribeOptions, build_subscribe_request};
use southbound_gnmi::split_path;
use tracing::info;

use crate::cli::{GlobalOpts, SubscribeArgs};
use crate::error::CliError;
use crate::output;

impl From<&SubscribeArgs> for SubscribeOptions {
    fn from(args: &SubscribeArgs) -> Self {
        Self {
            paths: args.paths.iter().map(|p| split_path(p)).collect(),
            prefix: args.prefix.clone(),
            mode: args.mode.clone(),
            stream_mode: args.stream_mode.clone(),
            sample_interval: args.sample_interval,
            heartbeat_interval: args.heartbeat_interval,
            updates_only: args.updates_only,
            origin: args.origin.clone(),
        }
    }
}

pub async fn handle(
    args: &SubscribeArgs,
    config: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let request = build_subscribe_request(&SubscribeOptions::from(args))?;
    let device = super::select_device(config, global)?;
    let connected = super::connect(&device, config, global).await?;

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupted, cancelling subscription");
                cancel.cancel();
            }
        })
    };

    let format = global.output;
    let result = connected
        .session
        .subscribe(&cancel, request, move |response: SubscribeResponse| {
            let rendered = output::render_streamed(format, &response).map_err(|e| {
                CoreError::Subscription {
                    message: e.to_string(),
                }
            })?;
            output::print_output(&rendered);
            Ok(())
        })
        .await;

    interrupt.abort();
    connected.close().await;
    result.map_err(CliError::from)
}
