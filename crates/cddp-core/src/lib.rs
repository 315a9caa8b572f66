//! Core logic for the CDDP sync jobs.
//!
//! Three batch passes over the same volume and map-server:
//!
//! - **Ingest**: [`discover::discover`] walks the CDDP volume, then
//!   [`ingest::run_ingest`] copies every layer into the store through a
//!   fixed-size worker pool, and [`reconcile::publish_new_featuretypes`]
//!   publishes the resulting tables.
//! - **Reconcile**: [`reconcile::run_metadata_reconcile`] pushes
//!   metadata and converted styles for published layers with a styled
//!   source dataset.
//! - **Monitor**: [`monitor::run_wms_check`] / [`monitor::run_wmts_check`]
//!   issue sample map requests against published layers.
//!
//! External tooling is reached only through [`ogr::OgrRunner`]; the
//! map-server only through `cddp_api` clients.

pub mod dataset;
pub mod discover;
mod error;
pub mod import;
pub mod ingest;
pub mod metadata;
pub mod monitor;
pub mod ogr;
pub mod reconcile;
pub mod style;

pub use dataset::{DatasetRef, StyledDatasetRef};
pub use error::CoreError;
pub use import::{CopyOutcome, GeometryOverride, ImportOutcome, ImportStatus};
pub use ingest::IngestSummary;
pub use monitor::MonitorSummary;
pub use ogr::{OgrRunner, SystemRunner, ToolPaths};
pub use reconcile::PublishedLayerIndex;
