//! Async clients for the map-server consumed by the CDDP sync jobs.
//!
//! Two surfaces: the GeoServer REST configuration API (feature type
//! publication, layer resources, styles) and the read-only OGC service
//! endpoints (WMS/WMTS) used for health checks. All JSON irregularities
//! and href-scheme handling live here so `cddp-core` deals in typed
//! values only.

mod error;
pub mod ogc;
pub mod rest;
pub mod transport;
pub mod types;

pub use error::Error;
pub use ogc::{IMAGE_FORMAT, OgcClient, WmtsTileRef};
pub use rest::GeoserverClient;
pub use transport::TransportConfig;
pub use types::{BoundingBox, LayerExtent, ResourcePatch, StyleOutcome};
