//! Single-layer import via the bulk vector copy tool.
//!
//! The copy tool exits 0 even when a per-layer COPY statement fails; the
//! only signal is two literal marker phrases in its captured output. The
//! marker coupling lives entirely in [`classify_copy_output`] so the
//! contract is testable against canned tool output. Recognised
//! non-standard geometry types get exactly one retry with an explicit
//! geometry override; everything else is terminal for that layer.

use tracing::{error, info, warn};

use crate::dataset::DatasetRef;
use crate::ogr::{OgrRunner, ToolPaths};

/// Marker the copy tool prints when a per-layer COPY statement fails.
const COPY_FAILED_MARKER: &[u8] = b"COPY statement failed";
const MULTI_SURFACE_MARKER: &[u8] = b"type Multi Surface";
const MULTI_CURVE_MARKER: &[u8] = b"type Multi Curve";

/// Geometry override for the one-shot retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryOverride {
    /// Reported as "Multi Surface" by the tool.
    MultiPolygon,
    /// Reported as "Multi Curve" by the tool.
    MultiLineString,
}

impl GeometryOverride {
    /// Value for the tool's geometry-type flag.
    pub fn flag(self) -> &'static str {
        match self {
            Self::MultiPolygon => "MULTIPOLYGON",
            Self::MultiLineString => "MULTILINESTRING",
        }
    }

    /// Geometry type name as the tool reports it.
    pub fn reported_type(self) -> &'static str {
        match self {
            Self::MultiPolygon => "Multi Surface",
            Self::MultiLineString => "Multi Curve",
        }
    }
}

/// Classification of one copy attempt's captured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    Success,
    GeometryOverrideNeeded(GeometryOverride),
    /// COPY failed with an unrecognised geometry type; no retry.
    Failed,
}

/// Scan combined tool output for the failure markers.
///
/// The allowlist is deliberately narrow: only the two geometry types
/// observed in production get a retry.
pub fn classify_copy_output(output: &[u8]) -> CopyOutcome {
    if !contains(output, COPY_FAILED_MARKER) {
        return CopyOutcome::Success;
    }
    if contains(output, MULTI_SURFACE_MARKER) {
        return CopyOutcome::GeometryOverrideNeeded(GeometryOverride::MultiPolygon);
    }
    if contains(output, MULTI_CURVE_MARKER) {
        return CopyOutcome::GeometryOverrideNeeded(GeometryOverride::MultiLineString);
    }
    CopyOutcome::Failed
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// Final status of one layer import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStatus {
    /// Clean copy, or a successful geometry-override retry.
    Succeeded,
    /// Tool failure or an unrecoverable copy failure on the first attempt.
    FailedTool,
    /// The geometry-override retry itself failed.
    FailedGeometryFallback,
}

/// Result of one import attempt, consumed for counting and logging only.
#[derive(Debug)]
pub struct ImportOutcome {
    pub dataset: DatasetRef,
    pub status: ImportStatus,
    pub raw_output: Vec<u8>,
}

fn copy_args(
    pg_connection: &str,
    dataset: &DatasetRef,
    geometry: Option<GeometryOverride>,
) -> Vec<String> {
    let mut args = vec!["-overwrite".to_owned()];
    if let Some(kind) = geometry {
        args.push("-nlt".to_owned());
        args.push(kind.flag().to_owned());
    }
    args.extend([
        "-f".to_owned(),
        "PostgreSQL".to_owned(),
        format!("PG:{pg_connection}"),
        dataset.container.display().to_string(),
        dataset.layer.clone(),
    ]);
    args
}

/// Copy one layer into the store, overwriting any same-named table.
pub async fn import_layer<R: OgrRunner>(
    runner: &R,
    tools: &ToolPaths,
    pg_connection: &str,
    dataset: DatasetRef,
) -> ImportOutcome {
    info!("Copying layer {}", dataset.layer);

    let args = copy_args(pg_connection, &dataset, None);
    let output = match runner.run(&tools.ogr2ogr, &args).await {
        Ok(output) if output.success => output,
        Ok(output) => {
            error!(
                "bulk copy failed for layer {} in {}: {}",
                dataset.layer,
                dataset.container.display(),
                output.stderr_text(),
            );
            return ImportOutcome {
                raw_output: output.combined(),
                dataset,
                status: ImportStatus::FailedTool,
            };
        }
        Err(err) => {
            error!(
                "bulk copy could not run for layer {} in {}: {err}",
                dataset.layer,
                dataset.container.display(),
            );
            return ImportOutcome {
                dataset,
                status: ImportStatus::FailedTool,
                raw_output: Vec::new(),
            };
        }
    };

    let combined = output.combined();
    let kind = match classify_copy_output(&combined) {
        CopyOutcome::Success => {
            return ImportOutcome {
                dataset,
                status: ImportStatus::Succeeded,
                raw_output: combined,
            };
        }
        CopyOutcome::Failed => {
            warn!(
                "copy statement failed with unrecognised geometry type for layer {}",
                dataset.layer,
            );
            return ImportOutcome {
                dataset,
                status: ImportStatus::FailedTool,
                raw_output: combined,
            };
        }
        CopyOutcome::GeometryOverrideNeeded(kind) => kind,
    };

    warn!(
        "Copy statement failed, geometry type {}, trying explicit geom type {}",
        kind.reported_type(),
        kind.flag(),
    );
    let args = copy_args(pg_connection, &dataset, Some(kind));
    match runner.run(&tools.ogr2ogr, &args).await {
        Ok(output) if output.success => ImportOutcome {
            raw_output: output.combined(),
            dataset,
            status: ImportStatus::Succeeded,
        },
        Ok(output) => {
            error!(
                "geometry fallback failed for layer {} in {}: {}",
                dataset.layer,
                dataset.container.display(),
                output.stderr_text(),
            );
            ImportOutcome {
                raw_output: output.combined(),
                dataset,
                status: ImportStatus::FailedGeometryFallback,
            }
        }
        Err(err) => {
            error!(
                "geometry fallback could not run for layer {} in {}: {err}",
                dataset.layer,
                dataset.container.display(),
            );
            ImportOutcome {
                dataset,
                status: ImportStatus::FailedGeometryFallback,
                raw_output: Vec::new(),
            }
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use super::*;
    use crate::ogr::RunOutput;

    fn ok_output(text: &str) -> RunOutput {
        RunOutput {
            success: true,
            stdout: text.as_bytes().to_vec(),
            stderr: Vec::new(),
        }
    }

    fn failed_output(text: &str) -> RunOutput {
        RunOutput {
            success: false,
            stdout: Vec::new(),
            stderr: text.as_bytes().to_vec(),
        }
    }

    /// Runner that replays scripted outputs and records every invocation.
    struct ScriptedRunner {
        responses: Mutex<VecDeque<RunOutput>>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedRunner {
        fn new(responses: Vec<RunOutput>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().expect("lock").clone()
        }
    }

    impl OgrRunner for ScriptedRunner {
        async fn run(&self, _program: &str, args: &[String]) -> io::Result<RunOutput> {
            self.calls.lock().expect("lock").push(args.to_vec());
            Ok(self
                .responses
                .lock()
                .expect("lock")
                .pop_front()
                .unwrap_or_else(|| ok_output("")))
        }
    }

    fn dataset() -> DatasetRef {
        DatasetRef {
            container: PathBuf::from("/mnt/cddp/transport/Transport.gdb"),
            layer: "Roads".into(),
        }
    }

    const SURFACE_FAILURE: &str =
        "ERROR 1: COPY statement failed.\nERROR: Geometry type (MultiSurface) \
         does not match column type (MultiPolygon) for type Multi Surface";
    const CURVE_FAILURE: &str =
        "ERROR 1: COPY statement failed.\nmismatch for type Multi Curve";

    #[test]
    fn clean_output_is_a_success() {
        assert_eq!(classify_copy_output(b"0...10...done"), CopyOutcome::Success);
    }

    #[test]
    fn multi_surface_failure_requests_the_polygon_override() {
        assert_eq!(
            classify_copy_output(SURFACE_FAILURE.as_bytes()),
            CopyOutcome::GeometryOverrideNeeded(GeometryOverride::MultiPolygon)
        );
    }

    #[test]
    fn multi_curve_failure_requests_the_line_override() {
        assert_eq!(
            classify_copy_output(CURVE_FAILURE.as_bytes()),
            CopyOutcome::GeometryOverrideNeeded(GeometryOverride::MultiLineString)
        );
    }

    #[test]
    fn unrecognised_geometry_failure_is_permanent() {
        assert_eq!(
            classify_copy_output(b"ERROR 1: COPY statement failed.\ntype Tin mismatch"),
            CopyOutcome::Failed
        );
    }

    #[test]
    fn geometry_markers_without_a_copy_failure_are_ignored() {
        assert_eq!(
            classify_copy_output(b"INFO: source geometry is of type Multi Surface"),
            CopyOutcome::Success
        );
    }

    #[tokio::test]
    async fn clean_copy_invokes_the_tool_once_with_the_exact_layer_name() {
        let runner = ScriptedRunner::new(vec![ok_output("done")]);
        let outcome = import_layer(&runner, &ToolPaths::default(), "host=db", dataset()).await;

        assert_eq!(outcome.status, ImportStatus::Succeeded);
        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].last().map(String::as_str), Some("Roads"));
        assert!(calls[0].contains(&"PG:host=db".to_owned()));
        assert!(!calls[0].contains(&"-nlt".to_owned()));
    }

    #[tokio::test]
    async fn multi_surface_retry_forces_multipolygon() {
        let runner = ScriptedRunner::new(vec![ok_output(SURFACE_FAILURE), ok_output("done")]);
        let outcome = import_layer(&runner, &ToolPaths::default(), "host=db", dataset()).await;

        assert_eq!(outcome.status, ImportStatus::Succeeded);
        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        let retry = &calls[1];
        let nlt = retry
            .iter()
            .position(|a| a == "-nlt")
            .expect("retry has -nlt");
        assert_eq!(retry[nlt + 1], "MULTIPOLYGON");
    }

    #[tokio::test]
    async fn multi_curve_retry_forces_multilinestring() {
        let runner = ScriptedRunner::new(vec![ok_output(CURVE_FAILURE), ok_output("done")]);
        let outcome = import_layer(&runner, &ToolPaths::default(), "host=db", dataset()).await;

        assert_eq!(outcome.status, ImportStatus::Succeeded);
        let retry = &runner.calls()[1];
        assert!(retry.contains(&"MULTILINESTRING".to_owned()));
    }

    #[tokio::test]
    async fn unrecognised_copy_failure_gets_no_second_invocation() {
        let runner = ScriptedRunner::new(vec![ok_output(
            "ERROR 1: COPY statement failed.\ntype Tin mismatch",
        )]);
        let outcome = import_layer(&runner, &ToolPaths::default(), "host=db", dataset()).await;

        assert_eq!(outcome.status, ImportStatus::FailedTool);
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn tool_failure_aborts_without_retry() {
        let runner = ScriptedRunner::new(vec![failed_output("FAILURE: Unable to open datasource")]);
        let outcome = import_layer(&runner, &ToolPaths::default(), "host=db", dataset()).await;

        assert_eq!(outcome.status, ImportStatus::FailedTool);
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn failed_retry_is_terminal() {
        let runner = ScriptedRunner::new(vec![
            ok_output(SURFACE_FAILURE),
            failed_output("ERROR: out of memory"),
        ]);
        let outcome = import_layer(&runner, &ToolPaths::default(), "host=db", dataset()).await;

        assert_eq!(outcome.status, ImportStatus::FailedGeometryFallback);
        assert_eq!(runner.calls().len(), 2);
    }
}
