//! End-to-end loader tests against an in-memory fake transport.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::watch;

use cluster_schema_loader::{
    AdminProvider, CancelSignal, ClusterConnection, DataTable, LoaderConfig, LoaderError,
    ProviderFactory, Result, SchemaLoader, Symbol, TableColumn,
};

/// Fake admin provider with canned responses keyed by command text.
///
/// Commands without a canned response return no primary result table.
#[derive(Default)]
struct FakeProvider {
    responses: HashMap<String, DataTable>,
    failing: Vec<String>,
    issued: Mutex<Vec<String>>,
    closed: AtomicUsize,
}

impl FakeProvider {
    fn respond(mut self, command: &str, table: DataTable) -> Self {
        self.responses.insert(command.to_string(), table);
        self
    }

    fn fail_on(mut self, command: &str) -> Self {
        self.failing.push(command.to_string());
        self
    }

    fn issued_count(&self, command: &str) -> usize {
        self.issued
            .lock()
            .unwrap()
            .iter()
            .filter(|issued| issued.as_str() == command)
            .count()
    }
}

#[async_trait]
impl AdminProvider for FakeProvider {
    async fn execute_command(&self, _database: &str, command: &str) -> Result<Option<DataTable>> {
        self.issued.lock().unwrap().push(command.to_string());
        if self.failing.iter().any(|failing| failing == command) {
            return Err(LoaderError::transport(format!(
                "injected failure for {}",
                command
            )));
        }
        Ok(self.responses.get(command).cloned())
    }

    async fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Factory handing out one shared fake provider, counting creations.
struct FakeFactory {
    provider: Arc<FakeProvider>,
    created: AtomicUsize,
}

impl FakeFactory {
    fn new(provider: FakeProvider) -> Self {
        Self {
            provider: Arc::new(provider),
            created: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ProviderFactory for FakeFactory {
    async fn create(&self, _connection: &ClusterConnection) -> Result<Arc<dyn AdminProvider>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(self.provider.clone())
    }
}

/// Provider whose commands never complete, for cancellation tests.
struct HangingProvider;

#[async_trait]
impl AdminProvider for HangingProvider {
    async fn execute_command(&self, _database: &str, _command: &str) -> Result<Option<DataTable>> {
        std::future::pending().await
    }

    async fn close(&self) {}
}

struct HangingFactory;

#[async_trait]
impl ProviderFactory for HangingFactory {
    async fn create(&self, _connection: &ClusterConnection) -> Result<Arc<dyn AdminProvider>> {
        Ok(Arc::new(HangingProvider))
    }
}

fn table(columns: &[&str], rows: &[&[&str]]) -> DataTable {
    DataTable {
        columns: columns
            .iter()
            .map(|name| TableColumn {
                name: name.to_string(),
                column_type: "System.String".to_string(),
            })
            .collect(),
        rows: rows
            .iter()
            .map(|row| row.iter().map(|cell| json!(cell)).collect())
            .collect(),
    }
}

fn config() -> LoaderConfig {
    LoaderConfig::new(
        ClusterConnection::new("https://eu1.metrics.example.com"),
        ".metrics.example.com",
    )
}

fn loader_with(provider: FakeProvider) -> (SchemaLoader, Arc<FakeProvider>, Arc<FakeFactory>) {
    let factory = Arc::new(FakeFactory::new(provider));
    let provider = factory.provider.clone();
    let loader = SchemaLoader::new(config(), factory.clone()).unwrap();
    (loader, provider, factory)
}

fn sales_identity() -> DataTable {
    table(&["DatabaseName", "PrettyName"], &[&["Sales", "Sales DB"]])
}

const SCHEMA_COLUMNS: &[&str] = &[
    "DatabaseName",
    "TableName",
    "ColumnName",
    "ColumnType",
    "DocString",
];

// =============================================================================
// load_database
// =============================================================================

#[tokio::test]
async fn loads_database_with_base_tables() {
    let provider = FakeProvider::default()
        .respond("show database [Sales] identity", sales_identity())
        .respond(
            "show database [Sales] schema",
            table(
                SCHEMA_COLUMNS,
                &[
                    &["Sales", "Orders", "Id", "System.Int32", ""],
                    &["Sales", "Orders", "Amount", "System.Double", ""],
                ],
            ),
        );
    let (loader, _, _) = loader_with(provider);

    let db = loader
        .load_database("Sales", None, false, &CancelSignal::none())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(db.name, "Sales");
    assert_eq!(db.pretty_name, "Sales DB");
    assert_eq!(db.members.len(), 1);

    let Symbol::Table(orders) = &db.members[0] else {
        panic!("expected a table symbol, got {:?}", db.members[0]);
    };
    assert_eq!(orders.name, "Orders");
    assert_eq!(orders.schema, "(Id:int, Amount:real)");
    assert_eq!(orders.doc, None);
}

#[tokio::test]
async fn groups_schema_rows_in_first_appearance_order() {
    let provider = FakeProvider::default()
        .respond("show database [Sales] identity", sales_identity())
        .respond(
            "show database [Sales] schema",
            table(
                SCHEMA_COLUMNS,
                &[
                    &["Sales", "Orders", "Id", "System.Int32", ""],
                    &["Sales", "Refunds", "Id", "System.Int64", "refund log"],
                    &["Sales", "Orders", "When", "System.DateTime", "order feed"],
                    &["Sales", "Empty", "", "", ""],
                ],
            ),
        );
    let (loader, _, _) = loader_with(provider);

    let db = loader
        .load_database("Sales", None, false, &CancelSignal::none())
        .await
        .unwrap()
        .unwrap();

    let tables: Vec<_> = db
        .members
        .iter()
        .map(|member| match member {
            Symbol::Table(t) => (t.name.as_str(), t.schema.as_str(), t.doc.as_deref()),
            other => panic!("expected table symbols only, got {:?}", other),
        })
        .collect();

    assert_eq!(
        tables,
        vec![
            ("Orders", "(Id:int, When:datetime)", Some("order feed")),
            ("Refunds", "(Id:long)", Some("refund log")),
            ("Empty", "()", None),
        ]
    );
}

#[tokio::test]
async fn external_table_without_schema_rows_is_omitted() {
    let provider = FakeProvider::default()
        .respond("show database [Sales] identity", sales_identity())
        .respond(
            "show external tables",
            table(
                &["TableName", "DocString"],
                &[&["Ext1", ""], &["Ext2", "blob feed"]],
            ),
        )
        .respond(
            "show external table [Ext2] cslschema",
            table(&["TableName", "Schema"], &[&["Ext2", "a:string, b:long"]]),
        );
    let (loader, provider, _) = loader_with(provider);

    let db = loader
        .load_database("Sales", None, false, &CancelSignal::none())
        .await
        .unwrap()
        .unwrap();

    // both detail commands were attempted, only Ext2 materialized
    assert_eq!(provider.issued_count("show external table [Ext1] cslschema"), 1);
    assert_eq!(db.members.len(), 1);
    let Symbol::ExternalTable(ext) = &db.members[0] else {
        panic!("expected an external table symbol");
    };
    assert_eq!(ext.name, "Ext2");
    assert_eq!(ext.schema, "(a:string, b:long)");
    assert_eq!(ext.doc.as_deref(), Some("blob feed"));
}

#[tokio::test]
async fn members_follow_fixed_category_order() {
    let provider = FakeProvider::default()
        .respond("show database [Sales] identity", sales_identity())
        .respond(
            "show database [Sales] schema",
            table(SCHEMA_COLUMNS, &[&["Sales", "Orders", "Id", "System.Int32", ""]]),
        )
        .respond(
            "show external tables",
            table(&["TableName", "DocString"], &[&["Ext", ""]]),
        )
        .respond(
            "show external table [Ext] cslschema",
            table(&["TableName", "Schema"], &[&["Ext", "x:string"]]),
        )
        .respond(
            "show materialized-views",
            table(
                &["Name", "Query", "DocString"],
                &[&["Daily", "Orders | summarize count() by bin(When, 1d)", ""]],
            ),
        )
        .respond(
            "show materialized-view [Daily] cslschema",
            table(&["TableName", "Schema"], &[&["Daily", "When:datetime, count_:long"]]),
        )
        .respond(
            "show functions",
            table(
                &["Name", "Parameters", "Body", "Folder", "DocString"],
                &[&["TopOrders", "(limit:long)", "{ Orders | take limit }", "", "top n"]],
            ),
        )
        .respond(
            "show entity_groups",
            table(&["Name", "Entities"], &[&["Critical", "[\"database('Sales')\"]"]]),
        );
    let (loader, _, _) = loader_with(provider);

    let db = loader
        .load_database("Sales", None, false, &CancelSignal::none())
        .await
        .unwrap()
        .unwrap();

    let kinds: Vec<&str> = db
        .members
        .iter()
        .map(|member| match member {
            Symbol::Table(_) => "table",
            Symbol::ExternalTable(_) => "external",
            Symbol::MaterializedView(_) => "view",
            Symbol::Function(_) => "function",
            Symbol::EntityGroup(_) => "group",
        })
        .collect();
    assert_eq!(kinds, vec!["table", "external", "view", "function", "group"]);

    let Symbol::MaterializedView(view) = &db.members[2] else {
        panic!("expected a materialized view symbol");
    };
    assert_eq!(view.schema, "(When:datetime, count_:long)");
    assert_eq!(view.query, "Orders | summarize count() by bin(When, 1d)");

    let Symbol::Function(function) = &db.members[3] else {
        panic!("expected a function symbol");
    };
    assert_eq!(function.parameters, "(limit:long)");
    assert_eq!(function.body, "{ Orders | take limit }");
    assert_eq!(function.doc.as_deref(), Some("top n"));
}

#[tokio::test]
async fn category_failure_is_suppressed_in_lenient_mode() {
    let provider = FakeProvider::default()
        .respond("show database [Sales] identity", sales_identity())
        .respond(
            "show database [Sales] schema",
            table(SCHEMA_COLUMNS, &[&["Sales", "Orders", "Id", "System.Int32", ""]]),
        )
        .fail_on("show functions");
    let (loader, _, _) = loader_with(provider);

    let db = loader
        .load_database("Sales", None, false, &CancelSignal::none())
        .await
        .unwrap()
        .unwrap();

    // the failing category contributes nothing; the rest still loads
    assert_eq!(db.members.len(), 1);
    assert!(matches!(db.members[0], Symbol::Table(_)));
}

#[tokio::test]
async fn category_failure_propagates_in_strict_mode() {
    let provider = FakeProvider::default()
        .respond("show database [Sales] identity", sales_identity())
        .respond(
            "show database [Sales] schema",
            table(SCHEMA_COLUMNS, &[&["Sales", "Orders", "Id", "System.Int32", ""]]),
        )
        .fail_on("show functions");
    let (loader, _, _) = loader_with(provider);

    let result = loader
        .load_database("Sales", None, true, &CancelSignal::none())
        .await;
    assert!(matches!(result, Err(LoaderError::Transport(_))));
}

#[tokio::test]
async fn unmapped_column_type_fails_even_in_lenient_mode() {
    let provider = FakeProvider::default()
        .respond("show database [Sales] identity", sales_identity())
        .respond(
            "show database [Sales] schema",
            table(SCHEMA_COLUMNS, &[&["Sales", "Orders", "Id", "System.Byte", ""]]),
        );
    let (loader, _, _) = loader_with(provider);

    let result = loader
        .load_database("Sales", None, false, &CancelSignal::none())
        .await;
    assert!(matches!(
        result,
        Err(LoaderError::UnmappedColumnType(name)) if name == "System.Byte"
    ));
}

// =============================================================================
// Negative cache
// =============================================================================

#[tokio::test]
async fn unresolved_identity_marks_database_absent() {
    let (loader, provider, _) = loader_with(FakeProvider::default());
    let cancel = CancelSignal::none();

    let first = loader.load_database("Ghost", None, false, &cancel).await;
    assert!(matches!(first, Ok(None)));
    assert_eq!(provider.issued_count("show database [Ghost] identity"), 1);

    // second lenient call short-circuits without another identity lookup
    let second = loader.load_database("Ghost", None, false, &cancel).await;
    assert!(matches!(second, Ok(None)));
    assert_eq!(provider.issued_count("show database [Ghost] identity"), 1);

    // strict call reports not-found, still without a remote round-trip
    let strict = loader.load_database("Ghost", None, true, &cancel).await;
    assert!(matches!(
        strict,
        Err(LoaderError::DatabaseNotFound { cluster, database })
            if cluster == "eu1.metrics.example.com" && database == "Ghost"
    ));
    assert_eq!(provider.issued_count("show database [Ghost] identity"), 1);
}

#[tokio::test]
async fn strict_identity_miss_is_not_found_error() {
    let (loader, _, _) = loader_with(FakeProvider::default());

    let result = loader
        .load_database("Ghost", None, true, &CancelSignal::none())
        .await;
    assert!(matches!(result, Err(LoaderError::DatabaseNotFound { .. })));
}

// =============================================================================
// Provider cache
// =============================================================================

#[tokio::test]
async fn provider_handles_are_shared_per_data_source() {
    let provider = FakeProvider::default().respond(
        "show databases",
        table(&["DatabaseName", "PrettyName"], &[&["Sales", ""]]),
    );
    let (loader, _, factory) = loader_with(provider);
    let cancel = CancelSignal::none();

    // default cluster, short name and full URI all resolve to one data source
    loader.load_database_names(None, false, &cancel).await.unwrap();
    loader
        .load_database_names(Some("eu1"), false, &cancel)
        .await
        .unwrap();
    loader
        .load_database_names(Some("https://eu1.metrics.example.com"), false, &cancel)
        .await
        .unwrap();
    assert_eq!(factory.created.load(Ordering::SeqCst), 1);

    // a different cluster gets its own handle
    loader
        .load_database_names(Some("us2"), false, &cancel)
        .await
        .unwrap();
    assert_eq!(factory.created.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn dispose_closes_each_handle_exactly_once() {
    let provider = FakeProvider::default().respond(
        "show databases",
        table(&["DatabaseName", "PrettyName"], &[&["Sales", ""]]),
    );
    let (loader, provider, _) = loader_with(provider);

    loader
        .load_database_names(None, false, &CancelSignal::none())
        .await
        .unwrap();

    loader.dispose().await;
    loader.dispose().await;
    assert_eq!(provider.closed.load(Ordering::SeqCst), 1);
}

// =============================================================================
// load_database_names
// =============================================================================

#[tokio::test]
async fn lists_database_names_with_pretty_fallback() {
    let provider = FakeProvider::default().respond(
        "show databases",
        table(
            &["DatabaseName", "PrettyName"],
            &[&["Sales", "Sales DB"], &["Billing", ""]],
        ),
    );
    let (loader, _, _) = loader_with(provider);

    let names = loader
        .load_database_names(None, false, &CancelSignal::none())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(names.len(), 2);
    assert_eq!(names[0].name, "Sales");
    assert_eq!(names[0].pretty_name, "Sales DB");
    assert_eq!(names[1].name, "Billing");
    assert_eq!(names[1].pretty_name, "Billing");
}

#[tokio::test]
async fn empty_database_listing_is_absent() {
    let (loader, _, _) = loader_with(FakeProvider::default());

    let names = loader
        .load_database_names(None, false, &CancelSignal::none())
        .await
        .unwrap();
    assert!(names.is_none());
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test]
async fn pre_cancelled_signal_aborts_the_load() {
    let provider = FakeProvider::default()
        .respond("show database [Sales] identity", sales_identity());
    let (loader, provider, _) = loader_with(provider);

    let (_tx, rx) = watch::channel(true);
    let result = loader
        .load_database("Sales", None, false, &CancelSignal::new(rx))
        .await;

    assert!(matches!(result, Err(LoaderError::Cancelled)));
    assert_eq!(provider.issued_count("show database [Sales] identity"), 0);
}

#[tokio::test]
async fn mid_flight_cancellation_reports_cancelled() {
    let loader = Arc::new(SchemaLoader::new(config(), Arc::new(HangingFactory)).unwrap());
    let (tx, rx) = watch::channel(false);

    let task = tokio::spawn({
        let loader = loader.clone();
        async move {
            loader
                .load_database("Sales", None, false, &CancelSignal::new(rx))
                .await
        }
    });

    tx.send(true).unwrap();
    let result = task.await.unwrap();
    assert!(matches!(result, Err(LoaderError::Cancelled)));
}
