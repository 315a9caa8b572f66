//! Discovered dataset identities.

use std::path::PathBuf;

/// One importable/reconcilable unit: a layer inside a file geodatabase.
///
/// Produced only by a live discovery walk at run start and compared by
/// both fields. The layer name keeps its source casing; published
/// identifiers on the map-server are lower-cased, so matching against
/// the published index case-folds at the comparison site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatasetRef {
    /// Path of the `.gdb` container directory.
    pub container: PathBuf,
    /// Layer name as reported by the container probe.
    pub layer: String,
}

/// A dataset paired with its style sidecar.
///
/// Only produced for layers with a `<layer>.qml` file beside the
/// container's parent directory; layers without one are excluded from
/// style reconciliation but not from ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledDatasetRef {
    pub dataset: DatasetRef,
    pub style_path: PathBuf,
}
