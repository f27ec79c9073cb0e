//! Cluster name and URI resolution.

use crate::config::{ClusterConnection, DEFAULT_CATALOG};
use crate::error::{LoaderError, Result};

/// Derives per-cluster connection settings from the default connection.
///
/// Resolution is a pure function of the input, the default connection and
/// the default domain: equal inputs yield equal data-source strings.
pub struct ConnectionResolver {
    default_connection: ClusterConnection,
    default_cluster: String,
    default_domain: String,
}

impl ConnectionResolver {
    /// Create a resolver around the default connection.
    pub fn new(default_connection: ClusterConnection, default_domain: String) -> Result<Self> {
        if !default_domain.starts_with('.') {
            return Err(LoaderError::Config(format!(
                "default domain must start with '.', got {:?}",
                default_domain
            )));
        }
        let default_cluster = default_connection.host().to_string();
        Ok(Self {
            default_connection,
            default_cluster,
            default_domain,
        })
    }

    /// The connection returned for empty or matching cluster names.
    pub fn default_connection(&self) -> &ClusterConnection {
        &self.default_connection
    }

    /// Host name of the default connection.
    pub fn default_cluster(&self) -> &str {
        &self.default_cluster
    }

    /// Resolve a cluster name or URI into connection settings.
    ///
    /// An empty name, or one naming the default cluster, yields the default
    /// connection unchanged. Anything else yields a connection that keeps
    /// the default connection's credentials but targets the resolved URI
    /// with the system default catalog.
    pub fn resolve(&self, cluster: &str) -> ClusterConnection {
        if cluster.is_empty() || cluster.eq_ignore_ascii_case(&self.default_cluster) {
            return self.default_connection.clone();
        }

        let mut connection = self.default_connection.clone();
        connection.data_source = self.qualified_uri(cluster);
        connection.default_catalog = DEFAULT_CATALOG.to_string();
        connection
    }

    /// Expand a short cluster name into a fully-qualified URI.
    fn qualified_uri(&self, cluster: &str) -> String {
        let (scheme, host) = match cluster.split_once("://") {
            Some((scheme, host)) => (scheme, host),
            None => (self.default_connection.scheme(), cluster),
        };

        // "eu1:443" splits into the bare name and everything after it
        let split = host.find(['/', ':']).unwrap_or(host.len());
        let (name, rest) = host.split_at(split);

        if name.contains('.') {
            format!("{}://{}", scheme, host)
        } else {
            format!("{}://{}{}{}", scheme, name, self.default_domain, rest)
        }
    }
}
