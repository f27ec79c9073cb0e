//! # cluster-schema-loader
//!
//! Schema discovery client for remote tabular-data clusters.
//!
//! The loader issues administrative ("control") commands against a cluster,
//! decodes the tabular responses, and assembles the results into a
//! strongly-typed symbol model for a query-language analysis engine
//! (autocompletion, type checking). It provides:
//!
//! - **Cluster resolution** from short names or URIs, reusing the default
//!   connection's credentials
//! - **Provider caching** with one live handle per physical data source
//! - **Negative caching** of database names confirmed absent
//! - **Category fetchers** for tables, external tables, materialized views,
//!   functions and entity groups
//! - **Strict or lenient** error handling per call, with cooperative
//!   cancellation threaded through every remote command
//!
//! Successful loads are never cached: every call re-queries the cluster.
//!
//! The wire transport and authentication live behind the [`AdminProvider`]
//! and [`ProviderFactory`] traits and are supplied by the caller.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use cluster_schema_loader::{CancelSignal, LoaderConfig, SchemaLoader};
//!
//! #[tokio::main]
//! async fn main() -> cluster_schema_loader::Result<()> {
//!     let config = LoaderConfig::load("loader.yaml")?;
//!     let loader = SchemaLoader::new(config, Arc::new(MyTransportFactory))?;
//!
//!     if let Some(db) = loader
//!         .load_database("Sales", None, false, &CancelSignal::none())
//!         .await?
//!     {
//!         println!("{} has {} members", db.name, db.members.len());
//!     }
//!
//!     loader.dispose().await;
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod config;
pub mod connection;
pub mod error;
pub mod fetch;
pub mod loader;
pub mod provider;
pub mod symbols;
pub mod typemap;

// Re-exports for convenient access
pub use command::{quote_ident, CancelSignal, DataTable, FromDataRow, RowView, TableColumn};
pub use config::{ClusterConnection, LoaderConfig, DEFAULT_CATALOG};
pub use connection::ConnectionResolver;
pub use error::{LoaderError, Result};
pub use loader::SchemaLoader;
pub use provider::{AdminProvider, ProviderCache, ProviderFactory};
pub use symbols::{
    DatabaseName, DatabaseSymbol, EntityGroupSymbol, ExternalTableSymbol, FunctionSymbol,
    MaterializedViewSymbol, Symbol, TableSymbol,
};
