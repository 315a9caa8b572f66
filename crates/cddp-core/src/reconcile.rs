//! Publication, metadata, and style reconciliation.
//!
//! Two passes over the map-server: publishing the delta of store tables
//! not yet exposed as layers, and pushing metadata/style updates for
//! every published layer that has a styled source dataset. Every
//! per-layer branch is independently reachable and independently logged;
//! none is fatal to the others.

use std::collections::HashMap;
use std::path::Path;

use futures_util::StreamExt;
use futures_util::stream;
use tracing::{error, info, warn};
use url::Url;

use cddp_api::{GeoserverClient, ResourcePatch, StyleOutcome};

use crate::dataset::StyledDatasetRef;
use crate::discover::discover_styled;
use crate::error::CoreError;
use crate::ogr::{OgrRunner, ToolPaths};
use crate::{metadata, style};

/// Snapshot of published layers: lower-cased name -> REST href.
///
/// Fetched once per run and read-only thereafter; a layer published by a
/// concurrent actor after the snapshot is invisible to this run.
pub type PublishedLayerIndex = HashMap<String, Url>;

/// Tables with this prefix are never published.
pub const SYSTEM_TABLE_PREFIX: &str = "pg_";

/// Fixed worker pool size for the reconciliation run.
pub const RECONCILE_CONCURRENCY: usize = 4;

/// Publish every available store table not excluded by prefix or
/// blacklist. Per-candidate failures are logged and skipped; there is no
/// rollback of partially published sets.
pub async fn publish_new_featuretypes(
    client: &GeoserverClient,
    workspace: &str,
    datastore: &str,
    blacklist: &[String],
) -> Result<usize, CoreError> {
    info!("Checking for any new feature types to publish");
    let available = client.available_featuretypes(workspace, datastore).await?;

    let mut count = 0;
    for name in available {
        if name.starts_with(SYSTEM_TABLE_PREFIX) || blacklist.contains(&name) {
            continue;
        }
        match client.publish_featuretype(workspace, datastore, &name).await {
            Ok(()) => {
                info!("Published featuretype {name}");
                count += 1;
            }
            Err(err) => warn!("failed to publish featuretype {name}: {err}"),
        }
    }

    info!("{count} new featuretypes were published");
    Ok(count)
}

/// Run the metadata & style reconciliation pass over the CDDP volume.
///
/// The published-layer snapshot and the discovery walk are load-bearing
/// and abort the run on failure; everything per dataset is soft.
pub async fn run_metadata_reconcile<R: OgrRunner>(
    client: &GeoserverClient,
    runner: &R,
    tools: &ToolPaths,
    workspace: &str,
    root: &Path,
) -> Result<(), CoreError> {
    let datasets = discover_styled(runner, tools, root).await?;
    let index = client.published_layers(workspace).await?;
    info!(
        "{} datasets scheduled for metadata & style updates",
        datasets.len()
    );

    stream::iter(&datasets)
        .for_each_concurrent(RECONCILE_CONCURRENCY, |styled| {
            reconcile_dataset(client, runner, tools, workspace, styled, &index)
        })
        .await;

    Ok(())
}

/// Reconcile one styled dataset against its published layer.
pub async fn reconcile_dataset<R: OgrRunner>(
    client: &GeoserverClient,
    runner: &R,
    tools: &ToolPaths,
    workspace: &str,
    styled: &StyledDatasetRef,
    index: &PublishedLayerIndex,
) {
    let layer = &styled.dataset.layer;
    let published_name = layer.to_lowercase();
    let Some(layer_href) = index.get(&published_name) else {
        warn!("{published_name} is not published, skipping");
        return;
    };

    update_layer_metadata(client, runner, tools, styled, &published_name, layer_href).await;
    update_layer_style(client, runner, tools, workspace, styled, &published_name).await;
}

async fn update_layer_metadata<R: OgrRunner>(
    client: &GeoserverClient,
    runner: &R,
    tools: &ToolPaths,
    styled: &StyledDatasetRef,
    published_name: &str,
    layer_href: &Url,
) {
    let metadata_xml = match metadata::layer_metadata_xml(runner, tools, &styled.dataset).await {
        Ok(Some(xml)) => xml,
        Ok(None) => {
            warn!("No metadata available for {published_name}");
            return;
        }
        Err(err) => {
            warn!("No metadata available for {published_name}: {err}");
            return;
        }
    };

    match metadata::extract_abstract(&metadata_xml) {
        Some(abstract_text) => {
            match client
                .update_resource(layer_href, &ResourcePatch::r#abstract(abstract_text))
                .await
            {
                Ok(()) => info!("Updated abstract: {published_name}"),
                Err(err) => error!("error during update of abstract for {published_name}: {err}"),
            }
        }
        None => warn!("No abstract available for {published_name}"),
    }

    match metadata::extract_title(&metadata_xml) {
        Some(title) => {
            match client
                .update_resource(layer_href, &ResourcePatch::title(title))
                .await
            {
                Ok(()) => info!("Updated title: {published_name}"),
                Err(err) => error!("error during update of title for {published_name}: {err}"),
            }
        }
        None => warn!("No title available for {published_name}"),
    }
}

async fn update_layer_style<R: OgrRunner>(
    client: &GeoserverClient,
    runner: &R,
    tools: &ToolPaths,
    workspace: &str,
    styled: &StyledDatasetRef,
    published_name: &str,
) {
    let sld = match style::convert_style(runner, tools, styled).await {
        Ok(sld) => sld,
        Err(err) => {
            error!("{err}");
            return;
        }
    };

    let outcome = match client.upsert_style(workspace, published_name, &sld).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!("style upsert failed for {published_name}: {err}");
            return;
        }
    };
    match outcome {
        StyleOutcome::Created => info!("Style created: {published_name}"),
        StyleOutcome::Updated => info!("Style updated: {published_name}"),
        StyleOutcome::Unchanged => {
            warn!("Style not changed: {published_name}");
            return;
        }
    }

    match client.set_default_style(workspace, published_name).await {
        Ok(()) => info!("Layer default style updated: {published_name}"),
        Err(err) => error!("failed to set default style for {published_name}: {err}"),
    }
}
