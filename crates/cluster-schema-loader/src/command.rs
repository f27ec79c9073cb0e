//! Control-command execution and tabular result decoding.
//!
//! [`execute`] is the single primitive every fetcher goes through: it sends
//! one command, decodes the primary result table into typed records, and
//! applies the strict/lenient error policy. No retries, no backoff.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tracing::debug;

use crate::error::{LoaderError, Result};
use crate::provider::AdminProvider;

/// Maximum identifier length accepted in command text.
const MAX_IDENTIFIER_LENGTH: usize = 1024;

/// Quote an identifier for embedding in a control command.
///
/// Escapes closing brackets by doubling them and wraps in brackets.
/// Validates the identifier before quoting.
///
/// # Examples
///
/// ```
/// # use cluster_schema_loader::quote_ident;
/// assert_eq!(quote_ident("Sales").unwrap(), "[Sales]");
/// assert_eq!(quote_ident("odd]name").unwrap(), "[odd]]name]");
/// ```
pub fn quote_ident(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("[{}]", name.replace(']', "]]")))
}

/// Validate an identifier before it is embedded in command text.
///
/// Rejects empty identifiers, identifiers containing null bytes, and
/// identifiers exceeding the maximum length.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(LoaderError::Config(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(LoaderError::Config(format!(
            "Identifier contains null byte: {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(LoaderError::Config(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes)",
            MAX_IDENTIFIER_LENGTH,
            name.len()
        )));
    }

    Ok(())
}

/// Cooperative cancellation handle threaded through every remote command.
///
/// Wraps an optional `watch` receiver; [`CancelSignal::none`] never fires.
#[derive(Clone, Default)]
pub struct CancelSignal(Option<watch::Receiver<bool>>);

impl CancelSignal {
    /// A signal that never fires.
    pub fn none() -> Self {
        Self(None)
    }

    /// Wrap a `watch` receiver; the load is cancelled once it observes `true`.
    pub fn new(receiver: watch::Receiver<bool>) -> Self {
        Self(Some(receiver))
    }

    /// Whether cancellation has already been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    /// Resolve once cancellation is requested; pending forever when the
    /// signal is unset or the sender goes away without cancelling.
    pub(crate) async fn cancelled(&self) {
        match &self.0 {
            Some(receiver) => {
                let mut receiver = receiver.clone();
                if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
            None => std::future::pending().await,
        }
    }
}

/// One column of a tabular command response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableColumn {
    /// Column name.
    pub name: String,
    /// Wire type name, e.g. `System.String`.
    pub column_type: String,
}

/// Primary tabular result of a control command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataTable {
    pub columns: Vec<TableColumn>,
    pub rows: Vec<Vec<Value>>,
}

/// One result row with column-name access into the parent table.
pub struct RowView<'a> {
    table: &'a DataTable,
    row: &'a [Value],
}

impl<'a> RowView<'a> {
    /// Required string cell; a JSON null decodes as the empty string.
    pub fn string(&self, column: &str) -> Result<String> {
        let index = self
            .table
            .columns
            .iter()
            .position(|c| c.name == column)
            .ok_or_else(|| LoaderError::decode(format!("missing column '{}'", column)))?;

        match self.row.get(index) {
            None => Err(LoaderError::decode(format!(
                "row has {} cells but column '{}' is at index {}",
                self.row.len(),
                column,
                index
            ))),
            Some(Value::Null) => Ok(String::new()),
            Some(Value::String(text)) => Ok(text.clone()),
            Some(other) => Err(LoaderError::decode(format!(
                "column '{}' holds a non-string value: {}",
                column, other
            ))),
        }
    }
}

/// Decode one typed record from a result row.
pub trait FromDataRow: Sized {
    fn from_row(row: &RowView<'_>) -> Result<Self>;
}

/// Execute `command` against `database`, decoding the primary result table
/// into records.
///
/// An absent primary result table yields an empty record list. In lenient
/// mode (`strict == false`) transport and decode failures also yield an
/// empty list; in strict mode they propagate unmodified. Cancellation
/// propagates in either mode.
pub async fn execute<T: FromDataRow>(
    provider: &dyn AdminProvider,
    database: &str,
    command: &str,
    strict: bool,
    cancel: &CancelSignal,
) -> Result<Vec<T>> {
    or_empty(try_execute(provider, database, command, cancel).await, strict)
}

async fn try_execute<T: FromDataRow>(
    provider: &dyn AdminProvider,
    database: &str,
    command: &str,
    cancel: &CancelSignal,
) -> Result<Vec<T>> {
    if cancel.is_cancelled() {
        return Err(LoaderError::Cancelled);
    }

    let table = tokio::select! {
        result = provider.execute_command(database, command) => result?,
        _ = cancel.cancelled() => return Err(LoaderError::Cancelled),
    };

    let Some(table) = table else {
        return Ok(Vec::new());
    };

    let mut records = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        records.push(T::from_row(&RowView { table: &table, row })?);
    }
    Ok(records)
}

/// Convert a suppressible failure into an empty record list in lenient mode.
fn or_empty<T>(result: Result<Vec<T>>, strict: bool) -> Result<Vec<T>> {
    match result {
        Ok(records) => Ok(records),
        Err(LoaderError::Cancelled) => Err(LoaderError::Cancelled),
        Err(err) if strict => Err(err),
        Err(err) => {
            debug!("Suppressing command failure: {}", err);
            Ok(Vec::new())
        }
    }
}
