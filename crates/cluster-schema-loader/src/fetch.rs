//! Per-category metadata fetchers.
//!
//! Each fetcher issues control commands through [`crate::command::execute`]
//! and turns the decoded rows into symbols. A fetcher that suppresses its
//! own failure in lenient mode contributes an empty list for its category
//! without aborting the others.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::debug;

use crate::command::{self, quote_ident, CancelSignal, FromDataRow, RowView};
use crate::error::Result;
use crate::provider::AdminProvider;
use crate::symbols::{
    EntityGroupSymbol, ExternalTableSymbol, FunctionSymbol, MaterializedViewSymbol, Symbol,
    TableSymbol,
};
use crate::typemap::scalar_type_of;

/// Row of `show database [db] schema`: one row per column, plus one row
/// with an empty column name for tables without columns.
struct DatabaseSchemaRow {
    table_name: String,
    column_name: String,
    column_type: String,
    doc_string: String,
}

impl FromDataRow for DatabaseSchemaRow {
    fn from_row(row: &RowView<'_>) -> Result<Self> {
        Ok(Self {
            table_name: row.string("TableName")?,
            column_name: row.string("ColumnName")?,
            column_type: row.string("ColumnType")?,
            doc_string: row.string("DocString")?,
        })
    }
}

/// Row of `show external tables`.
struct ExternalTableRow {
    table_name: String,
    doc_string: String,
}

impl FromDataRow for ExternalTableRow {
    fn from_row(row: &RowView<'_>) -> Result<Self> {
        Ok(Self {
            table_name: row.string("TableName")?,
            doc_string: row.string("DocString")?,
        })
    }
}

/// Row of the per-entity `… cslschema` detail commands.
struct SchemaDetailRow {
    schema: String,
}

impl FromDataRow for SchemaDetailRow {
    fn from_row(row: &RowView<'_>) -> Result<Self> {
        Ok(Self {
            schema: row.string("Schema")?,
        })
    }
}

/// Row of `show materialized-views`.
struct MaterializedViewRow {
    name: String,
    query: String,
    doc_string: String,
}

impl FromDataRow for MaterializedViewRow {
    fn from_row(row: &RowView<'_>) -> Result<Self> {
        Ok(Self {
            name: row.string("Name")?,
            query: row.string("Query")?,
            doc_string: row.string("DocString")?,
        })
    }
}

/// Row of `show functions`.
struct FunctionRow {
    name: String,
    parameters: String,
    body: String,
    doc_string: String,
}

impl FromDataRow for FunctionRow {
    fn from_row(row: &RowView<'_>) -> Result<Self> {
        Ok(Self {
            name: row.string("Name")?,
            parameters: row.string("Parameters")?,
            body: row.string("Body")?,
            doc_string: row.string("DocString")?,
        })
    }
}

/// Row of `show entity_groups`.
struct EntityGroupRow {
    name: String,
    entities: String,
}

impl FromDataRow for EntityGroupRow {
    fn from_row(row: &RowView<'_>) -> Result<Self> {
        Ok(Self {
            name: row.string("Name")?,
            entities: row.string("Entities")?,
        })
    }
}

fn none_if_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Fetch all base tables via one whole-database schema command.
///
/// Rows are grouped by table name in first-appearance order; column order
/// within a table follows row order. Type mapping failures propagate even
/// in lenient mode.
pub async fn fetch_tables(
    provider: &dyn AdminProvider,
    database: &str,
    strict: bool,
    cancel: &CancelSignal,
) -> Result<Vec<Symbol>> {
    let command_text = format!("show database {} schema", quote_ident(database)?);
    let rows: Vec<DatabaseSchemaRow> =
        command::execute(provider, database, &command_text, strict, cancel).await?;

    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, (Vec<String>, Option<String>)> = HashMap::new();

    for row in rows {
        if row.table_name.is_empty() {
            continue;
        }
        let group = match groups.entry(row.table_name.clone()) {
            Entry::Vacant(vacant) => {
                order.push(row.table_name.clone());
                vacant.insert((Vec::new(), None))
            }
            Entry::Occupied(occupied) => occupied.into_mut(),
        };
        if !row.column_name.is_empty() {
            let scalar_type = scalar_type_of(&row.column_type)?;
            group.0.push(format!("{}:{}", row.column_name, scalar_type));
        }
        if group.1.is_none() && !row.doc_string.is_empty() {
            group.1 = Some(row.doc_string);
        }
    }

    let mut symbols = Vec::with_capacity(order.len());
    for name in order {
        let (columns, doc) = groups.remove(&name).unwrap_or_default();
        symbols.push(Symbol::Table(TableSymbol {
            schema: format!("({})", columns.join(", ")),
            name,
            doc,
        }));
    }

    debug!("Fetched {} tables from {}", symbols.len(), database);
    Ok(symbols)
}

/// Fetch external tables: list, then one schema command per listed name.
///
/// A listed table whose schema command returns no rows is omitted.
pub async fn fetch_external_tables(
    provider: &dyn AdminProvider,
    database: &str,
    strict: bool,
    cancel: &CancelSignal,
) -> Result<Vec<Symbol>> {
    let listed: Vec<ExternalTableRow> =
        command::execute(provider, database, "show external tables", strict, cancel).await?;

    let mut symbols = Vec::with_capacity(listed.len());
    for entry in listed {
        let command_text = format!(
            "show external table {} cslschema",
            quote_ident(&entry.table_name)?
        );
        let detail: Vec<SchemaDetailRow> =
            command::execute(provider, database, &command_text, strict, cancel).await?;

        let Some(detail_row) = detail.into_iter().next() else {
            debug!("External table {} has no schema, skipping", entry.table_name);
            continue;
        };

        symbols.push(Symbol::ExternalTable(ExternalTableSymbol {
            name: entry.table_name,
            schema: format!("({})", detail_row.schema),
            doc: none_if_empty(entry.doc_string),
        }));
    }

    debug!("Fetched {} external tables from {}", symbols.len(), database);
    Ok(symbols)
}

/// Fetch materialized views: list, then one schema command per listed name.
///
/// Same inclusion rule as external tables.
pub async fn fetch_materialized_views(
    provider: &dyn AdminProvider,
    database: &str,
    strict: bool,
    cancel: &CancelSignal,
) -> Result<Vec<Symbol>> {
    let listed: Vec<MaterializedViewRow> =
        command::execute(provider, database, "show materialized-views", strict, cancel).await?;

    let mut symbols = Vec::with_capacity(listed.len());
    for entry in listed {
        let command_text = format!(
            "show materialized-view {} cslschema",
            quote_ident(&entry.name)?
        );
        let detail: Vec<SchemaDetailRow> =
            command::execute(provider, database, &command_text, strict, cancel).await?;

        let Some(detail_row) = detail.into_iter().next() else {
            debug!("Materialized view {} has no schema, skipping", entry.name);
            continue;
        };

        symbols.push(Symbol::MaterializedView(MaterializedViewSymbol {
            name: entry.name,
            schema: format!("({})", detail_row.schema),
            query: entry.query,
            doc: none_if_empty(entry.doc_string),
        }));
    }

    debug!(
        "Fetched {} materialized views from {}",
        symbols.len(),
        database
    );
    Ok(symbols)
}

/// Fetch stored functions; every row becomes a symbol.
pub async fn fetch_functions(
    provider: &dyn AdminProvider,
    database: &str,
    strict: bool,
    cancel: &CancelSignal,
) -> Result<Vec<Symbol>> {
    let rows: Vec<FunctionRow> =
        command::execute(provider, database, "show functions", strict, cancel).await?;

    let symbols = rows
        .into_iter()
        .map(|row| {
            Symbol::Function(FunctionSymbol {
                name: row.name,
                parameters: row.parameters,
                body: row.body,
                doc: none_if_empty(row.doc_string),
            })
        })
        .collect::<Vec<_>>();

    debug!("Fetched {} functions from {}", symbols.len(), database);
    Ok(symbols)
}

/// Fetch entity groups; every row becomes a symbol.
pub async fn fetch_entity_groups(
    provider: &dyn AdminProvider,
    database: &str,
    strict: bool,
    cancel: &CancelSignal,
) -> Result<Vec<Symbol>> {
    let rows: Vec<EntityGroupRow> =
        command::execute(provider, database, "show entity_groups", strict, cancel).await?;

    let symbols = rows
        .into_iter()
        .map(|row| {
            Symbol::EntityGroup(EntityGroupSymbol {
                name: row.name,
                entities: row.entities,
            })
        })
        .collect::<Vec<_>>();

    debug!("Fetched {} entity groups from {}", symbols.len(), database);
    Ok(symbols)
}
