pub mod connection;
pub mod errors;
pub mod factory;
pub mod postgres;
pub mod query_executor;
pub mod sql;
pub mod sqlite;
mod state;

use async_trait::async_trait;
use serde::Serialize;

pub use connection::{ConnectionDescriptor, DatabaseKind, ServerDescriptor};
pub use errors::DbError;
pub use factory::create;

/// Maximum number of data rows `execute_query` renders
pub const ROW_DISPLAY_LIMIT: usize = 1000;

/// Text substituted for SQL NULL in every string result
pub const NULL_TEXT: &str = "NULL";

/// Rows that can be shown as a grid with a fixed header
pub trait TableData {
    fn title() -> &'static str;
    fn ref_array(&self) -> Vec<String>;
    fn cols() -> Vec<&'static str>;

    fn num_columns(&self) -> usize {
        Self::cols().len()
    }
}

/// One attribute of a relation, as reported by the engine's catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub data_type: String,
    pub is_primary_key: bool,
    pub is_not_null: bool,
}

impl TableData for Column {
    fn title() -> &'static str {
        "Columns"
    }

    fn ref_array(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.data_type.clone(),
            yes_no(self.is_primary_key),
            yes_no(self.is_not_null),
        ]
    }

    fn cols() -> Vec<&'static str> {
        vec!["Name", "Type", "Primary Key", "Not Null"]
    }
}

/// A table or view known to a data source.
///
/// `columns` stays empty until the owning source introspects it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub expanded: bool,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Names of the primary key columns, in declaration order
    #[must_use]
    pub fn primary_key_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|column| column.is_primary_key)
            .map(|column| column.name.as_str())
            .collect()
    }
}

impl TableData for Table {
    fn title() -> &'static str {
        "Tables"
    }

    fn ref_array(&self) -> Vec<String> {
        vec![self.name.clone(), self.columns.len().to_string()]
    }

    fn cols() -> Vec<&'static str> {
        vec!["Name", "Columns"]
    }
}

fn yes_no(flag: bool) -> String {
    if flag { "yes" } else { "no" }.to_string()
}

/// Capability set shared by every backend.
///
/// Nothing here returns an error: connection failures come back as `false`,
/// row and column lookups degrade to empty results, and statement failures
/// are reported inline as `Error: <message>` text. Row and column operations
/// reconnect on their own when the handle has gone away.
#[async_trait]
pub trait DataSource: Send {
    /// Open the underlying handle; a no-op returning `true` when already
    /// connected.
    async fn connect(&mut self) -> bool;

    /// Release the handle. Cached tables are kept.
    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    fn name(&self) -> &str;

    /// File path for embedded sources, connection string for servers.
    /// Tabs use this to find their source again after a reconnect.
    fn connection_identity(&self) -> &str;

    fn path(&self) -> &str {
        self.connection_identity()
    }

    fn kind(&self) -> DatabaseKind;

    /// Reload the table list and each table's columns.
    ///
    /// Always leaves `tables_loaded() == true`, even when connecting fails,
    /// so automatic refresh happens at most once.
    async fn refresh_tables(&mut self);

    fn tables(&self) -> &[Table];

    fn tables_mut(&mut self) -> &mut Vec<Table>;

    fn tables_loaded(&self) -> bool;

    fn set_tables_loaded(&mut self, loaded: bool);

    /// Run arbitrary SQL and format the result as a text grid
    async fn execute_query(&mut self, sql: &str) -> String;

    async fn table_data(
        &mut self,
        table: &str,
        limit: usize,
        offset: usize,
    ) -> Vec<Vec<String>>;

    async fn column_names(&mut self, table: &str) -> Vec<String>;

    async fn row_count(&mut self, table: &str) -> usize;

    fn is_expanded(&self) -> bool;

    fn set_expanded(&mut self, expanded: bool);
}
