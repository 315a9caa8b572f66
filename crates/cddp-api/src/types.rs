//! Response and request models for the GeoServer REST API.
//!
//! GeoServer's JSON is irregular: single-element lists collapse to a bare
//! value and empty collections collapse to an empty string, so the list
//! wrappers here are untagged enums normalised through `into_vec`.

use serde::Deserialize;

// ── List irregularities ─────────────────────────────────────────────

/// A value GeoServer serialises as either a list or a single item.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(items) => items,
            Self::One(item) => vec![item],
        }
    }
}

/// `GET .../featuretypes?list=available` response.
#[derive(Debug, Deserialize)]
pub struct AvailableFeatureTypes {
    pub list: AvailableList,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AvailableList {
    Entries { string: OneOrMany<String> },
    /// An empty collection serialises as `""`.
    Empty(String),
}

impl AvailableFeatureTypes {
    pub fn into_names(self) -> Vec<String> {
        match self.list {
            AvailableList::Entries { string } => string.into_vec(),
            AvailableList::Empty(_) => Vec::new(),
        }
    }
}

/// `GET .../workspaces/{ws}/layers` response.
#[derive(Debug, Deserialize)]
pub struct LayersResponse {
    pub layers: LayersBody,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum LayersBody {
    List { layer: OneOrMany<LayerRef> },
    Empty(String),
}

impl LayersResponse {
    pub fn into_refs(self) -> Vec<LayerRef> {
        match self.layers {
            LayersBody::List { layer } => layer.into_vec(),
            LayersBody::Empty(_) => Vec::new(),
        }
    }
}

/// One published layer entry: its name and REST href.
#[derive(Debug, Clone, Deserialize)]
pub struct LayerRef {
    pub name: String,
    pub href: String,
}

// ── Resource updates ────────────────────────────────────────────────

/// Partial update for a layer's resource record.
///
/// Present fields are merged into the fetched resource document before it
/// is PUT back whole; the server contract has no true PATCH.
#[derive(Debug, Clone, Default)]
pub struct ResourcePatch {
    pub title: Option<String>,
    pub r#abstract: Option<String>,
}

impl ResourcePatch {
    pub fn title(value: impl Into<String>) -> Self {
        Self {
            title: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn r#abstract(value: impl Into<String>) -> Self {
        Self {
            r#abstract: Some(value.into()),
            ..Self::default()
        }
    }
}

// ── Styles ──────────────────────────────────────────────────────────

/// Result of a style upsert against the map-server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleOutcome {
    /// Style did not exist and was created (POST, 201).
    Created,
    /// Style existed and was replaced (PUT, 200).
    Updated,
    /// Neither create nor update reported success.
    Unchanged,
}

// ── Extents ─────────────────────────────────────────────────────────

/// Native bounding box of a published layer's resource.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BoundingBox {
    pub minx: f64,
    pub miny: f64,
    pub maxx: f64,
    pub maxy: f64,
}

/// Extent and projection of a published layer, for WMS checks.
#[derive(Debug, Clone)]
pub struct LayerExtent {
    pub bbox: BoundingBox,
    pub srs: String,
}
