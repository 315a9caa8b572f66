//! Health checks over published layers.
//!
//! Issues sample map requests to catch silently broken styles or
//! projections: a layer that renders returns an image content type, a
//! broken one returns a ServiceException document. The WMTS check hits
//! one tile at the most zoomed-in level per layer, which is much cheaper
//! than rendering the whole extent; the WMS check renders the full
//! extent and is kept for the handful of layers without a tile cache.

use std::time::Duration;

use tracing::{info, warn};

use cddp_api::{GeoserverClient, OgcClient};

use crate::error::CoreError;

/// Pause between WMS requests, to avoid hammering the render pipeline.
const WMS_QUERY_PAUSE: Duration = Duration::from_secs(2);

/// Aggregate result of one health-check run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSummary {
    pub succeeded: usize,
    pub total: usize,
    pub failures: Vec<String>,
}

impl MonitorSummary {
    fn log(&self) {
        info!(
            "{}/{} published layers successfully queried",
            self.succeeded, self.total
        );
        if !self.failures.is_empty() {
            info!("Failed layers: {}", self.failures.join(", "));
        }
    }
}

/// Query the full extent of every published layer via WMS GetMap.
pub async fn run_wms_check(
    rest: &GeoserverClient,
    ogc: &OgcClient,
    workspace: &str,
) -> Result<MonitorSummary, CoreError> {
    info!("Querying for published layers");
    let index = rest.published_layers(workspace).await?;

    let mut names: Vec<String> = index.into_keys().collect();
    names.sort();

    let total = names.len();
    let mut succeeded = 0;
    let mut failures = Vec::new();

    for name in names {
        let ok = match rest.layer_extent(workspace, &name).await {
            Ok(extent) => match ogc.wms_extent_ok(workspace, &name, &extent).await {
                Ok(ok) => ok,
                Err(err) => {
                    warn!("GetMap request failed for {name}: {err}");
                    false
                }
            },
            Err(err) => {
                warn!("could not read extent for {name}: {err}");
                false
            }
        };
        if ok {
            info!("Queried {name}");
            succeeded += 1;
        } else {
            warn!("Failed to query {name}");
            failures.push(name);
        }

        tokio::time::sleep(WMS_QUERY_PAUSE).await;
    }

    let summary = MonitorSummary {
        succeeded,
        total,
        failures,
    };
    summary.log();
    Ok(summary)
}

/// Query one most-zoomed-in tile per published WMTS layer.
pub async fn run_wmts_check(ogc: &OgcClient) -> Result<MonitorSummary, CoreError> {
    info!("Querying WMTS GetCapabilities document");
    let layers = ogc.wmts_layers().await?;
    info!("{} published layers queued to query", layers.len());

    let total = layers.len();
    let mut succeeded = 0;
    let mut failures = Vec::new();

    for tile in &layers {
        let name = tile.short_name().to_owned();
        let ok = match ogc.wmts_tile_ok(tile).await {
            Ok(ok) => ok,
            Err(err) => {
                warn!("GetTile request failed for {name}: {err}");
                false
            }
        };
        if ok {
            info!("Queried {name}");
            succeeded += 1;
        } else {
            warn!("Failed to query {name}");
            failures.push(name);
        }
    }

    let summary = MonitorSummary {
        succeeded,
        total,
        failures,
    };
    summary.log();
    Ok(summary)
}
