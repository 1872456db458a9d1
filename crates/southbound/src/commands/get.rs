//! Get command handler.

use southbound_config::Config;

use crate::cli::{GlobalOpts, RequestArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(
    args: &RequestArgs,
    config: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let device = super::select_device(config, global)?;
    let connected = super::connect(&device, config, global).await?;
    let result = connected.session.get_with_str(&args.request).await;
    connected.close().await;

    let response = result?;
    output::print_output(&output::render_message(global.output, &response)?);
    Ok(())
}
