//! Loader configuration and per-cluster connection settings.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{LoaderError, Result};

/// Catalog assigned to connections derived from a bare cluster name.
pub const DEFAULT_CATALOG: &str = "NetDefaultDB";

/// Connection settings for one physical cluster.
///
/// Derived connections copy the default connection's authentication fields
/// and are never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConnection {
    /// Cluster endpoint URI, e.g. `https://telemetry.metrics.example.com`.
    pub data_source: String,

    /// Catalog used when a command does not name a database.
    #[serde(default = "default_catalog")]
    pub default_catalog: String,

    /// Authority (tenant) identifier for application authentication.
    #[serde(default)]
    pub authority_id: Option<String>,

    /// Application (client) id.
    #[serde(default)]
    pub application_client_id: Option<String>,

    /// Application key. Never serialized back out.
    #[serde(default, skip_serializing)]
    pub application_key: Option<String>,

    /// Client certificate thumbprint.
    #[serde(default)]
    pub application_certificate_thumbprint: Option<String>,
}

impl ClusterConnection {
    /// Create a connection with the default catalog and no credentials.
    pub fn new(data_source: impl Into<String>) -> Self {
        Self {
            data_source: data_source.into(),
            default_catalog: default_catalog(),
            authority_id: None,
            application_client_id: None,
            application_key: None,
            application_certificate_thumbprint: None,
        }
    }

    /// Host portion of the data source, without scheme, port or path.
    pub fn host(&self) -> &str {
        let source = self.data_source.as_str();
        let source = source
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(source);
        let end = source.find(['/', ':', ';']).unwrap_or(source.len());
        &source[..end]
    }

    /// Scheme of the data source, defaulting to `https`.
    pub fn scheme(&self) -> &str {
        self.data_source
            .split_once("://")
            .map(|(scheme, _)| scheme)
            .unwrap_or("https")
    }
}

fn default_catalog() -> String {
    DEFAULT_CATALOG.to_string()
}

/// Top-level loader configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Default cluster connection used when a call names no cluster.
    pub connection: ClusterConnection,

    /// Domain suffix appended to unqualified cluster names.
    /// Must start with `.`.
    pub default_domain: String,
}

impl LoaderConfig {
    /// Create a configuration from a default connection and the domain
    /// suffix for short cluster names.
    pub fn new(connection: ClusterConnection, default_domain: impl Into<String>) -> Self {
        Self {
            connection,
            default_domain: default_domain.into(),
        }
    }

    /// Load configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    pub fn validate(&self) -> Result<()> {
        if self.connection.data_source.is_empty() {
            return Err(LoaderError::Config(
                "connection.data_source cannot be empty".to_string(),
            ));
        }
        if !self.default_domain.starts_with('.') {
            return Err(LoaderError::Config(format!(
                "default_domain must start with '.', got {:?}",
                self.default_domain
            )));
        }
        Ok(())
    }
}
