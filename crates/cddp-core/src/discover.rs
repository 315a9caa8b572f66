//! Dataset discovery: walk the CDDP volume and probe containers.
//!
//! A directory whose name ends in `.gdb` is a geodatabase container; the
//! walk never descends into one. Any subtree under a directory named
//! `old` is excluded entirely — that is where superseded data is parked
//! on the volume. Each container is probed with `ogrinfo` in JSON output
//! mode for its layer list; a probe failure skips that container and the
//! run continues.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{error, warn};
use walkdir::WalkDir;

use crate::dataset::{DatasetRef, StyledDatasetRef};
use crate::error::CoreError;
use crate::ogr::{OgrRunner, ToolPaths};

/// Directory suffix marking a geodatabase container.
const CONTAINER_SUFFIX: &str = ".gdb";

/// Directory name whose subtree is excluded from discovery.
const EXCLUDED_SEGMENT: &str = "old";

/// Style sidecar extension, expected beside the container's parent.
const STYLE_SUFFIX: &str = "qml";

/// Locate all geodatabase containers under `root`.
pub fn find_containers(root: &Path) -> Result<Vec<PathBuf>, CoreError> {
    if !root.is_dir() {
        return Err(CoreError::RootNotFound {
            path: root.to_path_buf(),
        });
    }

    let mut containers = Vec::new();
    let mut walker = WalkDir::new(root).into_iter();
    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("walk error under {}: {err}", root.display());
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name == EXCLUDED_SEGMENT {
            walker.skip_current_dir();
        } else if name.ends_with(CONTAINER_SUFFIX) {
            containers.push(entry.path().to_path_buf());
            walker.skip_current_dir();
        }
    }
    Ok(containers)
}

/// Walk `root` and return every (container, layer) pair.
///
/// Containers whose probe fails are logged and skipped.
pub async fn discover<R: OgrRunner>(
    runner: &R,
    tools: &ToolPaths,
    root: &Path,
) -> Result<Vec<DatasetRef>, CoreError> {
    let mut datasets = Vec::new();
    for container in find_containers(root)? {
        match probe_layers(runner, tools, &container).await {
            Ok(layers) => {
                datasets.extend(layers.into_iter().map(|layer| DatasetRef {
                    container: container.clone(),
                    layer,
                }));
            }
            Err(err) => error!("{err}"),
        }
    }
    Ok(datasets)
}

/// Style-aware discovery: only datasets with a QML sidecar.
pub async fn discover_styled<R: OgrRunner>(
    runner: &R,
    tools: &ToolPaths,
    root: &Path,
) -> Result<Vec<StyledDatasetRef>, CoreError> {
    let mut styled = Vec::new();
    for dataset in discover(runner, tools, root).await? {
        let Some(parent) = dataset.container.parent() else {
            continue;
        };
        let style_path = parent.join(format!("{}.{STYLE_SUFFIX}", dataset.layer));
        if style_path.is_file() {
            styled.push(StyledDatasetRef {
                dataset,
                style_path,
            });
        }
    }
    Ok(styled)
}

/// List a container's layer names via the probe tool.
pub async fn probe_layers<R: OgrRunner>(
    runner: &R,
    tools: &ToolPaths,
    container: &Path,
) -> Result<Vec<String>, CoreError> {
    let args = vec![
        "-ro".to_owned(),
        "-json".to_owned(),
        container.display().to_string(),
    ];
    let output = runner
        .run(&tools.ogrinfo, &args)
        .await
        .map_err(|err| CoreError::Probe {
            container: container.display().to_string(),
            message: err.to_string(),
        })?;
    if !output.success {
        return Err(CoreError::Probe {
            container: container.display().to_string(),
            message: output.stderr_text(),
        });
    }
    parse_probe_output(&output.stdout).map_err(|err| CoreError::Probe {
        container: container.display().to_string(),
        message: err.to_string(),
    })
}

/// Parse the probe tool's JSON report into a list of layer names.
pub fn parse_probe_output(stdout: &[u8]) -> Result<Vec<String>, serde_json::Error> {
    #[derive(Deserialize)]
    struct Report {
        #[serde(default)]
        layers: Vec<Layer>,
    }

    #[derive(Deserialize)]
    struct Layer {
        name: String,
    }

    let report: Report = serde_json::from_slice(stdout)?;
    Ok(report.layers.into_iter().map(|layer| layer.name).collect())
}

// ── Tests ───────────────────────────────────────────────────────────
