use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use dearsql_db::{Column, DataSource, DatabaseKind, Table};

/// In-memory data source with a single `users(id, name)` table
pub struct MockSource {
    name: String,
    identity: String,
    connected: bool,
    reachable: bool,
    tables: Vec<Table>,
    tables_loaded: bool,
    expanded: bool,
    rows: Vec<Vec<String>>,
    refreshes: Arc<AtomicUsize>,
}

impl MockSource {
    pub fn new(name: &str, row_count: usize) -> Self {
        Self {
            name: name.to_string(),
            identity: format!("mock://{name}"),
            connected: false,
            reachable: true,
            tables: Vec::new(),
            tables_loaded: false,
            expanded: false,
            rows: (1..=row_count)
                .map(|id| vec![id.to_string(), format!("user {id}")])
                .collect(),
            refreshes: Arc::default(),
        }
    }

    pub fn unreachable(name: &str) -> Self {
        Self {
            reachable: false,
            ..Self::new(name, 0)
        }
    }

    /// Counts `refresh_tables` calls, readable after the source is boxed
    pub fn refresh_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.refreshes)
    }

    fn users_table() -> Table {
        Table {
            name: "users".to_string(),
            columns: vec![
                Column {
                    name: "id".to_string(),
                    data_type: "INTEGER".to_string(),
                    is_primary_key: true,
                    is_not_null: true,
                },
                Column {
                    name: "name".to_string(),
                    data_type: "TEXT".to_string(),
                    is_primary_key: false,
                    is_not_null: true,
                },
            ],
            expanded: false,
        }
    }
}

#[async_trait]
impl DataSource for MockSource {
    async fn connect(&mut self) -> bool {
        self.connected = self.connected || self.reachable;
        self.connected
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn connection_identity(&self) -> &str {
        &self.identity
    }

    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Sqlite
    }

    async fn refresh_tables(&mut self) {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        if self.connect().await {
            self.tables = vec![Self::users_table()];
        }
        self.tables_loaded = true;
    }

    fn tables(&self) -> &[Table] {
        &self.tables
    }

    fn tables_mut(&mut self) -> &mut Vec<Table> {
        &mut self.tables
    }

    fn tables_loaded(&self) -> bool {
        self.tables_loaded
    }

    fn set_tables_loaded(&mut self, loaded: bool) {
        self.tables_loaded = loaded;
    }

    async fn execute_query(&mut self, sql: &str) -> String {
        if !self.connect().await {
            return "Error: Failed to connect to database".to_string();
        }
        format!("ran: {sql}")
    }

    async fn table_data(
        &mut self,
        table: &str,
        limit: usize,
        offset: usize,
    ) -> Vec<Vec<String>> {
        if !self.connect().await || table != "users" {
            return Vec::new();
        }
        self.rows.iter().skip(offset).take(limit).cloned().collect()
    }

    async fn column_names(&mut self, table: &str) -> Vec<String> {
        if !self.connect().await || table != "users" {
            return Vec::new();
        }
        vec!["id".to_string(), "name".to_string()]
    }

    async fn row_count(&mut self, table: &str) -> usize {
        if !self.connect().await || table != "users" {
            return 0;
        }
        self.rows.len()
    }

    fn is_expanded(&self) -> bool {
        self.expanded
    }

    fn set_expanded(&mut self, expanded: bool) {
        self.expanded = expanded;
    }
}
