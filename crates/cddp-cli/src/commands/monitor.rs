//! `cddp monitor` — health-check published layers with sample map
//! requests. The default WMTS check queries one most-zoomed-in tile per
//! layer; `--wms` renders each layer's full extent instead.

use cddp_config::Config;
use cddp_core::monitor::{run_wms_check, run_wmts_check};

use crate::cli::MonitorArgs;
use crate::error::CliError;

pub async fn handle(args: MonitorArgs) -> Result<(), CliError> {
    let config = Config::load()?;
    let geoserver = config.geoserver()?;

    let ogc = super::ogc_client(&config, &geoserver)?;
    if args.wms {
        let workspace = args.workspace.unwrap_or_else(|| geoserver.workspace.clone());
        let rest = super::rest_client(&config, &geoserver)?;
        run_wms_check(&rest, &ogc, &workspace).await?;
    } else {
        run_wmts_check(&ogc).await?;
    }

    Ok(())
}
