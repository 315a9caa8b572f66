//! `cddp ingest` — copy every discovered layer into the store, then
//! publish any resulting tables not yet exposed on the map-server.

use cddp_config::Config;
use cddp_core::discover::discover;
use cddp_core::ingest::run_ingest;
use cddp_core::reconcile::publish_new_featuretypes;
use cddp_core::SystemRunner;

use crate::cli::IngestArgs;
use crate::error::CliError;

pub async fn handle(args: IngestArgs) -> Result<(), CliError> {
    let config = Config::load()?;
    let root = config.cddp_path(args.path)?;
    let database = config.database()?;
    let geoserver = config.geoserver()?;
    let tools = config.tool_paths();
    let runner = SystemRunner;

    let datasets = discover(&runner, &tools, &root).await?;
    run_ingest(&runner, &tools, &database.connection_string(), datasets).await;

    let client = super::rest_client(&config, &geoserver)?;
    publish_new_featuretypes(
        &client,
        &geoserver.workspace,
        &geoserver.datastore,
        &args.skip,
    )
    .await?;

    Ok(())
}
