//! CLI error types with miette diagnostics.
//!
//! Maps config/core/API failures into user-facing errors with actionable
//! help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

/// Exit codes for the batch jobs.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const CONFIG: i32 = 2;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(
        code(cddp::config),
        help(
            "Set the required environment variables (DATABASE_*, GEOSERVER_*, CDDP_PATH)\n\
             or provide them in cddp.toml in the working directory."
        )
    )]
    Config(#[from] cddp_config::ConfigError),

    #[error("Map-server request failed")]
    #[diagnostic(
        code(cddp::map_server),
        help("Check GEOSERVER_URL and credentials, and that the server is reachable.")
    )]
    Api(#[source] cddp_api::Error),

    #[error(transparent)]
    #[diagnostic(code(cddp::run))]
    Core(cddp_core::CoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<cddp_core::CoreError> for CliError {
    fn from(err: cddp_core::CoreError) -> Self {
        match err {
            cddp_core::CoreError::Api(api) => Self::Api(api),
            other => Self::Core(other),
        }
    }
}

impl From<cddp_api::Error> for CliError {
    fn from(err: cddp_api::Error) -> Self {
        Self::Api(err)
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => exit_code::CONFIG,
            Self::Api(_) => exit_code::CONNECTION,
            Self::Core(_) | Self::Io(_) => exit_code::GENERAL,
        }
    }
}
