// Shared transport configuration for building reqwest::Client instances.
//
// The REST and OGC clients share timeout and TLS settings through this
// module, avoiding duplicated builder logic.

use std::time::Duration;

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    /// Accept self-signed certificates (internal map-servers).
    pub danger_accept_invalid_certs: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            danger_accept_invalid_certs: false,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("cddp-sync/", env!("CARGO_PKG_VERSION")));

        if self.danger_accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(builder.build()?)
    }
}
