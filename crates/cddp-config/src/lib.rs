//! Shared configuration for the CDDP sync jobs.
//!
//! All three batch jobs read the same flat settings: database connection
//! parameters for the bulk copy, GeoServer connection/auth, the CDDP
//! volume root, and the external tool binaries. Values come from an
//! optional `cddp.toml` in the working directory merged with raw
//! environment variables (`DATABASE_HOST`, `GEOSERVER_URL`, `CDDP_PATH`,
//! ...), matching the deployment's container environment.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use cddp_core::ogr::ToolPaths;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting: {field}")]
    Missing { field: &'static str },

    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Raw settings ────────────────────────────────────────────────────

/// Flat settings as read from the environment / `cddp.toml`.
///
/// Connection values are optional here so that a job only fails for
/// settings it actually needs (`monitor` runs without any database
/// parameters). The typed accessors below enforce presence per group.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub database_host: Option<String>,
    pub database_username: Option<String>,
    pub database_password: Option<String>,
    pub database_name: Option<String>,

    pub geoserver_url: Option<String>,
    pub geoserver_username: Option<String>,
    pub geoserver_password: Option<String>,
    pub geoserver_workspace: Option<String>,
    pub geoserver_datastore: Option<String>,

    /// Root of the mounted CDDP volume.
    pub cddp_path: Option<PathBuf>,

    #[serde(default = "default_ogrinfo")]
    pub ogrinfo_bin: String,

    #[serde(default = "default_ogr2ogr")]
    pub ogr2ogr_bin: String,

    /// Command that converts a QML style sidecar to SLD on stdout.
    #[serde(default = "default_qml2sld")]
    pub qml2sld_bin: String,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_host: None,
            database_username: None,
            database_password: None,
            database_name: None,
            geoserver_url: None,
            geoserver_username: None,
            geoserver_password: None,
            geoserver_workspace: None,
            geoserver_datastore: None,
            cddp_path: None,
            ogrinfo_bin: default_ogrinfo(),
            ogr2ogr_bin: default_ogr2ogr(),
            qml2sld_bin: default_qml2sld(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

fn default_ogrinfo() -> String {
    "ogrinfo".into()
}
fn default_ogr2ogr() -> String {
    "ogr2ogr".into()
}
fn default_qml2sld() -> String {
    "qml2sld".into()
}
fn default_http_timeout() -> u64 {
    30
}

// ── Loading ─────────────────────────────────────────────────────────

impl Config {
    /// Load settings from defaults, `cddp.toml`, and the environment.
    ///
    /// Environment variables win over the file; keys are matched
    /// case-insensitively (`DATABASE_HOST` -> `database_host`).
    pub fn load() -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file("cddp.toml"))
            .merge(Env::raw());

        let config: Self = figment.extract()?;
        Ok(config)
    }

    // ── Typed accessors ─────────────────────────────────────────────

    /// Database connection parameters for the bulk copy tool.
    pub fn database(&self) -> Result<DatabaseConfig, ConfigError> {
        Ok(DatabaseConfig {
            host: require(&self.database_host, "DATABASE_HOST")?,
            username: require(&self.database_username, "DATABASE_USERNAME")?,
            password: SecretString::from(require(&self.database_password, "DATABASE_PASSWORD")?),
            name: require(&self.database_name, "DATABASE_NAME")?,
        })
    }

    /// GeoServer connection and publication target.
    pub fn geoserver(&self) -> Result<GeoserverConfig, ConfigError> {
        let raw_url = require(&self.geoserver_url, "GEOSERVER_URL")?;
        let url: Url = raw_url.parse().map_err(|_| ConfigError::Validation {
            field: "GEOSERVER_URL".into(),
            reason: format!("invalid URL: {raw_url}"),
        })?;

        Ok(GeoserverConfig {
            url,
            username: require(&self.geoserver_username, "GEOSERVER_USERNAME")?,
            password: SecretString::from(require(&self.geoserver_password, "GEOSERVER_PASSWORD")?),
            workspace: require(&self.geoserver_workspace, "GEOSERVER_WORKSPACE")?,
            datastore: require(&self.geoserver_datastore, "GEOSERVER_DATASTORE")?,
        })
    }

    /// Resolve the CDDP volume root, preferring an explicit override.
    pub fn cddp_path(&self, override_path: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
        override_path
            .or_else(|| self.cddp_path.clone())
            .ok_or(ConfigError::Missing { field: "CDDP_PATH" })
    }

    /// External tool binaries for the core crate.
    pub fn tool_paths(&self) -> ToolPaths {
        ToolPaths {
            ogrinfo: self.ogrinfo_bin.clone(),
            ogr2ogr: self.ogr2ogr_bin.clone(),
            qml2sld: self.qml2sld_bin.clone(),
        }
    }

    /// HTTP transport timeout for map-server requests.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn require(value: &Option<String>, field: &'static str) -> Result<String, ConfigError> {
    value.clone().ok_or(ConfigError::Missing { field })
}

// ── Typed views ─────────────────────────────────────────────────────

/// Database connection parameters.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub username: String,
    pub password: SecretString,
    pub name: String,
}

impl DatabaseConfig {
    /// Render the PG connection string consumed by the bulk copy tool.
    pub fn connection_string(&self) -> String {
        use secrecy::ExposeSecret;
        format!(
            "host={} user={} password={} dbname={}",
            self.host,
            self.username,
            self.password.expose_secret(),
            self.name,
        )
    }
}

/// GeoServer connection and publication target.
#[derive(Debug, Clone)]
pub struct GeoserverConfig {
    pub url: Url,
    pub username: String,
    pub password: SecretString,
    pub workspace: String,
    pub datastore: String,
}

// ── Tests ───────────────────────────────────────────────────────────
