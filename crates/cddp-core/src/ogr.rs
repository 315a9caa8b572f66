//! Subprocess seam for the external GDAL/QGIS tooling.
//!
//! Every external invocation (layer probe, bulk copy, metadata query,
//! style conversion) goes through the [`OgrRunner`] trait so call sites
//! can be exercised in tests with canned outputs instead of real
//! binaries.

use std::io;
use std::process::Stdio;

/// Binaries for the external tools, resolved from configuration.
#[derive(Debug, Clone)]
pub struct ToolPaths {
    pub ogrinfo: String,
    pub ogr2ogr: String,
    /// Converter producing SLD on stdout from a QML sidecar.
    pub qml2sld: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ogrinfo: "ogrinfo".into(),
            ogr2ogr: "ogr2ogr".into(),
            qml2sld: "qml2sld".into(),
        }
    }
}

/// Captured result of one tool invocation.
///
/// Stdout and stderr are kept separate: structured (JSON) output is
/// parsed from stdout alone, while failure-marker scanning runs over the
/// combined streams because the copy tool reports per-layer failures on
/// either.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub success: bool,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl RunOutput {
    /// Stdout and stderr concatenated, for marker scanning.
    pub fn combined(&self) -> Vec<u8> {
        let mut all = self.stdout.clone();
        all.extend_from_slice(&self.stderr);
        all
    }

    /// Stderr as lossy text, trimmed, for log messages.
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_owned()
    }
}

/// Runs an external tool to completion, capturing its output.
pub trait OgrRunner: Send + Sync {
    fn run(
        &self,
        program: &str,
        args: &[String],
    ) -> impl Future<Output = io::Result<RunOutput>> + Send;
}

/// Production runner: spawns the tool as a child process.
///
/// No timeout is applied; a hung tool stalls its worker for the rest of
/// the run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl OgrRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[String]) -> io::Result<RunOutput> {
        let output = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await?;
        Ok(RunOutput {
            success: output.status.success(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
