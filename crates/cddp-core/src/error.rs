use std::path::PathBuf;

use thiserror::Error;

/// Run-level error type for the core crate.
///
/// Per-item soft failures (a single probe, copy, or update) are logged
/// and absorbed at the item granularity and never surface here; these
/// variants cover the failures that abort a job.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("CDDP root directory not found: {}", path.display())]
    RootNotFound { path: PathBuf },

    #[error("layer probe failed for {container}: {message}")]
    Probe { container: String, message: String },

    #[error("metadata query failed for {layer}: {message}")]
    Metadata { layer: String, message: String },

    #[error("style conversion failed for {layer}: {message}")]
    Convert { layer: String, message: String },

    #[error("style document rewrite failed: {message}")]
    Style { message: String },

    #[error("map-server request failed: {0}")]
    Api(#[from] cddp_api::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
