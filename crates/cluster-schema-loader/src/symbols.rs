//! Symbol model handed to the query-language analysis engine.
//!
//! These types are a database-agnostic, in-memory description of a remote
//! database's schema: tables, external tables, materialized views,
//! functions and entity groups.

use serde::{Deserialize, Serialize};

/// Canonical name and human-readable display name of a database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseName {
    /// Canonical database name.
    pub name: String,
    /// Display name; falls back to the canonical name when the cluster
    /// reports none.
    pub pretty_name: String,
}

/// A named schema entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Symbol {
    Table(TableSymbol),
    ExternalTable(ExternalTableSymbol),
    MaterializedView(MaterializedViewSymbol),
    Function(FunctionSymbol),
    EntityGroup(EntityGroupSymbol),
}

impl Symbol {
    /// Entity name regardless of variant.
    pub fn name(&self) -> &str {
        match self {
            Symbol::Table(s) => &s.name,
            Symbol::ExternalTable(s) => &s.name,
            Symbol::MaterializedView(s) => &s.name,
            Symbol::Function(s) => &s.name,
            Symbol::EntityGroup(s) => &s.name,
        }
    }
}

/// Base table with its column schema descriptor, e.g. `(Id:int, Name:string)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSymbol {
    pub name: String,
    pub schema: String,
    pub doc: Option<String>,
}

/// Externally-sourced table. Same shape as a base table; the variant itself
/// is the marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalTableSymbol {
    pub name: String,
    pub schema: String,
    pub doc: Option<String>,
}

/// Materialized view with its backing query text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializedViewSymbol {
    pub name: String,
    pub schema: String,
    pub query: String,
    pub doc: Option<String>,
}

/// Stored function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSymbol {
    pub name: String,
    /// Parameter-list descriptor, e.g. `(limit:long)`.
    pub parameters: String,
    pub body: String,
    pub doc: Option<String>,
}

/// Named group of entities, kept as the raw entity-list descriptor text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityGroupSymbol {
    pub name: String,
    pub entities: String,
}

/// One database and its member entities.
///
/// Members keep fetch order: tables, external tables, materialized views,
/// functions, entity groups, each in remote result order. Duplicate names
/// are kept as-is; uniqueness is the consumer's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSymbol {
    pub name: String,
    pub pretty_name: String,
    pub members: Vec<Symbol>,
}
