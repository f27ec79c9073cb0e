//! Top-level schema loader: cluster resolution, caching and assembly.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info};

use crate::command::{self, quote_ident, CancelSignal, FromDataRow, RowView};
use crate::config::LoaderConfig;
use crate::connection::ConnectionResolver;
use crate::error::{LoaderError, Result};
use crate::fetch;
use crate::provider::{AdminProvider, ProviderCache, ProviderFactory};
use crate::symbols::{DatabaseName, DatabaseSymbol};

/// Row of `show databases` and `show database [name] identity`.
struct DatabaseNameRow {
    database_name: String,
    pretty_name: String,
}

impl FromDataRow for DatabaseNameRow {
    fn from_row(row: &RowView<'_>) -> Result<Self> {
        Ok(Self {
            database_name: row.string("DatabaseName")?,
            pretty_name: row.string("PrettyName")?,
        })
    }
}

impl From<DatabaseNameRow> for DatabaseName {
    fn from(row: DatabaseNameRow) -> Self {
        let pretty_name = if row.pretty_name.is_empty() {
            row.database_name.clone()
        } else {
            row.pretty_name
        };
        DatabaseName {
            name: row.database_name,
            pretty_name,
        }
    }
}

/// Confirmed-absent (cluster, database) pairs.
///
/// Entries never expire; the cache is cleared only by dropping the loader.
#[derive(Default)]
struct NegativeDatabaseCache {
    absent: Mutex<HashMap<String, HashSet<String>>>,
}

impl NegativeDatabaseCache {
    fn is_known_absent(&self, cluster: &str, database: &str) -> bool {
        self.absent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(cluster)
            .map(|names| names.contains(database))
            .unwrap_or(false)
    }

    fn mark_absent(&self, cluster: &str, database: &str) {
        let mut absent = self.absent.lock().unwrap_or_else(PoisonError::into_inner);
        absent
            .entry(cluster.to_string())
            .or_default()
            .insert(database.to_string());
    }
}

/// Schema loader for remote tabular-data clusters.
///
/// Shared across call sites; both internal caches tolerate concurrent use.
/// Call [`SchemaLoader::dispose`] to release cached provider handles.
pub struct SchemaLoader {
    resolver: ConnectionResolver,
    providers: ProviderCache,
    missing: NegativeDatabaseCache,
}

impl SchemaLoader {
    /// Create a loader from configuration and a transport factory.
    pub fn new(config: LoaderConfig, factory: Arc<dyn ProviderFactory>) -> Result<Self> {
        config.validate()?;
        let resolver = ConnectionResolver::new(config.connection, config.default_domain)?;
        Ok(Self {
            resolver,
            providers: ProviderCache::new(factory),
            missing: NegativeDatabaseCache::default(),
        })
    }

    /// Host name of the cluster targeted when a call names none.
    pub fn default_cluster(&self) -> &str {
        self.resolver.default_cluster()
    }

    /// List the database names on a cluster.
    ///
    /// Returns `Ok(None)` when the cluster reports no databases (or, in
    /// lenient mode, when the listing command fails).
    pub async fn load_database_names(
        &self,
        cluster: Option<&str>,
        strict: bool,
        cancel: &CancelSignal,
    ) -> Result<Option<Vec<DatabaseName>>> {
        let connection = self.resolver.resolve(cluster.unwrap_or(""));
        let provider = self.providers.get_or_create(&connection).await?;

        let rows: Vec<DatabaseNameRow> = command::execute(
            provider.as_ref(),
            &connection.default_catalog,
            "show databases",
            strict,
            cancel,
        )
        .await?;

        if rows.is_empty() {
            return Ok(None);
        }

        let names = rows.into_iter().map(DatabaseName::from).collect();
        Ok(Some(names))
    }

    /// Load the full symbol for one database.
    ///
    /// Lenient calls (`strict == false`) return `Ok(None)` for unknown
    /// databases and tolerate per-category fetch failures; strict calls
    /// report them as errors. Every successful call re-queries the cluster;
    /// only confirmed-absent names are cached.
    pub async fn load_database(
        &self,
        database: &str,
        cluster: Option<&str>,
        strict: bool,
        cancel: &CancelSignal,
    ) -> Result<Option<DatabaseSymbol>> {
        let connection = self.resolver.resolve(cluster.unwrap_or(""));
        let cluster_name = connection.host().to_string();

        if self.missing.is_known_absent(&cluster_name, database) {
            debug!("Database {}/{} is known absent", cluster_name, database);
            return self.absent(&cluster_name, database, strict);
        }

        let provider = self.providers.get_or_create(&connection).await?;

        let identity = match self
            .resolve_identity(provider.as_ref(), database, strict, cancel)
            .await?
        {
            Some(identity) => identity,
            None => {
                self.missing.mark_absent(&cluster_name, database);
                return self.absent(&cluster_name, database, strict);
            }
        };

        let (tables, external_tables, views, functions, entity_groups) = tokio::join!(
            fetch::fetch_tables(provider.as_ref(), &identity.name, strict, cancel),
            fetch::fetch_external_tables(provider.as_ref(), &identity.name, strict, cancel),
            fetch::fetch_materialized_views(provider.as_ref(), &identity.name, strict, cancel),
            fetch::fetch_functions(provider.as_ref(), &identity.name, strict, cancel),
            fetch::fetch_entity_groups(provider.as_ref(), &identity.name, strict, cancel),
        );

        let mut members = Vec::new();
        members.extend(tables?);
        members.extend(external_tables?);
        members.extend(views?);
        members.extend(functions?);
        members.extend(entity_groups?);

        info!(
            "Loaded database {}/{} with {} members",
            cluster_name,
            identity.name,
            members.len()
        );

        Ok(Some(DatabaseSymbol {
            name: identity.name,
            pretty_name: identity.pretty_name,
            members,
        }))
    }

    /// Resolve the canonical (name, pretty name) pair for a database.
    async fn resolve_identity(
        &self,
        provider: &dyn AdminProvider,
        database: &str,
        strict: bool,
        cancel: &CancelSignal,
    ) -> Result<Option<DatabaseName>> {
        let command_text = format!("show database {} identity", quote_ident(database)?);
        let rows: Vec<DatabaseNameRow> =
            command::execute(provider, database, &command_text, strict, cancel).await?;
        Ok(rows.into_iter().next().map(DatabaseName::from))
    }

    fn absent(
        &self,
        cluster: &str,
        database: &str,
        strict: bool,
    ) -> Result<Option<DatabaseSymbol>> {
        if strict {
            Err(LoaderError::DatabaseNotFound {
                cluster: cluster.to_string(),
                database: database.to_string(),
            })
        } else {
            Ok(None)
        }
    }

    /// Close every cached provider handle.
    pub async fn dispose(&self) {
        self.providers.dispose().await;
    }
}
