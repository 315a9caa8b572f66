//! `cddp reconcile` — push metadata and style updates for every
//! published layer with a styled source dataset.

use cddp_config::Config;
use cddp_core::SystemRunner;
use cddp_core::reconcile::run_metadata_reconcile;

use crate::cli::ReconcileArgs;
use crate::error::CliError;

pub async fn handle(args: ReconcileArgs) -> Result<(), CliError> {
    let config = Config::load()?;
    let root = config.cddp_path(args.path)?;
    let geoserver = config.geoserver()?;
    let tools = config.tool_paths();
    let runner = SystemRunner;

    let client = super::rest_client(&config, &geoserver)?;
    run_metadata_reconcile(&client, &runner, &tools, &geoserver.workspace, &root).await?;

    Ok(())
}
