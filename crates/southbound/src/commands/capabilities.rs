//! Capabilities command handler.

use southbound_config::Config;

use crate::cli::{CapabilitiesArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub async fn handle(
    args: &CapabilitiesArgs,
    config: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let device = super::select_device(config, global)?;
    let connected = super::connect(&device, config, global).await?;
    let result = connected.session.capabilities_with_str(&args.request).await;
    connected.close().await;

    let response = result?;
    output::print_output(&output::render_message(global.output, &response)?);
    Ok(())
}
