//! Transport boundary traits and the per-data-source provider cache.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::command::DataTable;
use crate::config::ClusterConnection;
use crate::error::Result;

/// Live administrative session against one cluster.
///
/// Implementations own the wire transport and authentication; this crate
/// only issues control commands through them.
#[async_trait]
pub trait AdminProvider: Send + Sync {
    /// Execute a control command against a database.
    ///
    /// Returns `Ok(None)` when the response carries no primary result table.
    async fn execute_command(&self, database: &str, command: &str) -> Result<Option<DataTable>>;

    /// Release the underlying connection.
    async fn close(&self);
}

/// Creates provider handles for resolved connections.
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    async fn create(&self, connection: &ClusterConnection) -> Result<Arc<dyn AdminProvider>>;
}

/// Cache of one provider handle per physical data source.
///
/// Keyed by the connection's data-source string only; two connections that
/// differ only in catalog or credentials share one handle. The map lock
/// spans factory construction, so at most one handle ever exists per data
/// source.
pub struct ProviderCache {
    factory: Arc<dyn ProviderFactory>,
    providers: Mutex<HashMap<String, Arc<dyn AdminProvider>>>,
}

impl ProviderCache {
    /// Create an empty cache around a provider factory.
    pub fn new(factory: Arc<dyn ProviderFactory>) -> Self {
        Self {
            factory,
            providers: Mutex::new(HashMap::new()),
        }
    }

    /// Get the handle for the connection's data source, creating it on miss.
    pub async fn get_or_create(
        &self,
        connection: &ClusterConnection,
    ) -> Result<Arc<dyn AdminProvider>> {
        let mut providers = self.providers.lock().await;

        if let Some(provider) = providers.get(&connection.data_source) {
            return Ok(provider.clone());
        }

        debug!("Creating admin provider for {}", connection.data_source);
        let provider = self.factory.create(connection).await?;
        providers.insert(connection.data_source.clone(), provider.clone());
        Ok(provider)
    }

    /// Close every cached handle exactly once and clear the cache.
    pub async fn dispose(&self) {
        let mut providers = self.providers.lock().await;
        for (data_source, provider) in providers.drain() {
            debug!("Closing admin provider for {}", data_source);
            provider.close().await;
        }
    }
}
