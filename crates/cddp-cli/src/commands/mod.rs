//! Job handlers: bridge CLI args -> config -> core runs.

pub mod ingest;
pub mod monitor;
pub mod reconcile;

use cddp_api::{GeoserverClient, OgcClient, TransportConfig};
use cddp_config::{Config, GeoserverConfig};

use crate::error::CliError;

fn transport(config: &Config) -> TransportConfig {
    TransportConfig {
        timeout: config.http_timeout(),
        ..TransportConfig::default()
    }
}

pub(crate) fn rest_client(
    config: &Config,
    geoserver: &GeoserverConfig,
) -> Result<GeoserverClient, CliError> {
    Ok(GeoserverClient::new(
        geoserver.url.clone(),
        geoserver.username.clone(),
        geoserver.password.clone(),
        &transport(config),
    )?)
}

pub(crate) fn ogc_client(
    config: &Config,
    geoserver: &GeoserverConfig,
) -> Result<OgcClient, CliError> {
    Ok(OgcClient::new(geoserver.url.clone(), &transport(config))?)
}
