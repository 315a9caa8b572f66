use thiserror::Error;

/// Top-level error type for the `cddp-api` crate.
///
/// Covers transport failures, non-success REST responses, and malformed
/// response documents. `cddp-core` maps these into per-item or run-level
/// outcomes depending on whether the call is load-bearing.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── REST API ────────────────────────────────────────────────────
    /// Non-success status from the map-server.
    #[error("Map-server error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// A response document was missing an expected field or element.
    #[error("Unexpected response document: {message}")]
    Document { message: String },

    /// The WMTS capabilities document could not be parsed.
    #[error("Capabilities parse error: {0}")]
    Capabilities(String),
}

impl Error {
    /// Returns `true` for a 404 response (used by the style probe).
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Api { status: 404, .. } => true,
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            _ => false,
        }
    }
}
