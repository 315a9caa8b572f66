//! Clap derive structures for the `cddp` CLI.
//!
//! One subcommand per batch job; each runs exactly one pass and exits.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// cddp -- sync the CDDP volume into PostGIS and GeoServer
#[derive(Debug, Parser)]
#[command(
    name = "cddp",
    version,
    about = "Batch sync jobs for the corporate geospatial data volume",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Increase verbosity (-v, -vv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Import every discovered layer into the store, then publish new tables
    Ingest(IngestArgs),

    /// Push metadata and style updates for published layers
    Reconcile(ReconcileArgs),

    /// Issue sample map requests against every published layer
    Monitor(MonitorArgs),
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// CDDP volume root (overrides CDDP_PATH)
    pub path: Option<PathBuf>,

    /// Table name to exclude from publication (repeatable)
    #[arg(long = "skip", value_name = "TABLE")]
    pub skip: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ReconcileArgs {
    /// CDDP volume root (overrides CDDP_PATH)
    pub path: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct MonitorArgs {
    /// Render each layer's full extent via WMS instead of one WMTS tile
    #[arg(long)]
    pub wms: bool,

    /// Workspace to check (overrides GEOSERVER_WORKSPACE)
    #[arg(long)]
    pub workspace: Option<String>,
}
