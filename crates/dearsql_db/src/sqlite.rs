use async_trait::async_trait;
use rusqlite::Connection as SqliteConnection;
use tracing::{debug, info, warn};

use crate::{
    Column, DataSource, DatabaseKind, DbError, Table,
    connection::expand_path,
    query_executor::{self, error_text},
    sql::quote_identifier,
    state::SourceState,
};

/// A file-backed database opened in-process
pub struct SqliteDatabase {
    path: String,
    connection: Option<SqliteConnection>,
    state: SourceState,
}

impl SqliteDatabase {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            connection: None,
            state: SourceState::new(name.into()),
        }
    }

    /// Borrow the live handle, reconnecting first if needed
    async fn handle(&mut self) -> Result<&SqliteConnection, DbError> {
        if !self.connect().await {
            return Err(DbError::Disconnected);
        }
        self.connection.as_ref().ok_or(DbError::Disconnected)
    }

    fn load_tables(conn: &SqliteConnection) -> Result<Vec<Table>, DbError> {
        Self::table_names(conn)?
            .into_iter()
            .map(|name| {
                debug!(table = %name, "adding table");
                let columns = Self::table_columns(conn, &name)?;
                Ok(Table {
                    name,
                    columns,
                    expanded: false,
                })
            })
            .collect()
    }

    fn table_names(conn: &SqliteConnection) -> Result<Vec<String>, DbError> {
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type IN ('table', 'view') ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(names)
    }

    fn table_columns(
        conn: &SqliteConnection,
        table: &str,
    ) -> Result<Vec<Column>, DbError> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({})", quote_identifier(table)))?;
        let columns = stmt
            .query_map([], |row| {
                let not_null: i64 = row.get(3)?;
                // Position within the primary key, 0 when not part of it
                let pk_position: i64 = row.get(5)?;
                Ok(Column {
                    name: row.get(1)?,
                    data_type: row.get(2)?,
                    is_primary_key: pk_position > 0,
                    is_not_null: not_null != 0 || pk_position > 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(columns)
    }
}

#[async_trait]
impl DataSource for SqliteDatabase {
    async fn connect(&mut self) -> bool {
        if self.connection.is_some() {
            return true;
        }

        match SqliteConnection::open(expand_path(&self.path)) {
            Ok(conn) => {
                info!(path = %self.path, "connected to database");
                self.connection = Some(conn);
                true
            }
            Err(e) => {
                warn!(path = %self.path, "can't open database: {e}");
                false
            }
        }
    }

    fn disconnect(&mut self) {
        if let Some(conn) = self.connection.take()
            && let Err((_, e)) = conn.close()
        {
            warn!(path = %self.path, "error while closing database: {e}");
        }
    }

    fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    fn name(&self) -> &str {
        &self.state.name
    }

    fn connection_identity(&self) -> &str {
        &self.path
    }

    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Sqlite
    }

    async fn refresh_tables(&mut self) {
        info!(database = %self.state.name, "refreshing tables");
        if !self.connect().await {
            self.state.refresh_skipped();
            return;
        }
        let result = match self.connection.as_ref() {
            Some(conn) => Self::load_tables(conn),
            None => Err(DbError::Disconnected),
        };
        self.state.refresh_finished(result);
    }

    fn tables(&self) -> &[Table] {
        &self.state.tables
    }

    fn tables_mut(&mut self) -> &mut Vec<Table> {
        &mut self.state.tables
    }

    fn tables_loaded(&self) -> bool {
        self.state.tables_loaded
    }

    fn set_tables_loaded(&mut self, loaded: bool) {
        self.state.tables_loaded = loaded;
    }

    async fn execute_query(&mut self, sql: &str) -> String {
        debug!(database = %self.state.name, %sql, "executing query");
        let result = match self.handle().await {
            Ok(conn) => query_executor::execute_query(conn, sql),
            Err(e) => Err(e),
        };
        result.unwrap_or_else(|e| error_text(&e))
    }

    async fn table_data(
        &mut self,
        table: &str,
        limit: usize,
        offset: usize,
    ) -> Vec<Vec<String>> {
        let result = match self.handle().await {
            Ok(conn) => query_executor::table_data(conn, table, limit, offset),
            Err(e) => Err(e),
        };
        result.unwrap_or_else(|e| {
            warn!(%table, "error getting table data: {e}");
            Vec::new()
        })
    }

    async fn column_names(&mut self, table: &str) -> Vec<String> {
        let result = match self.handle().await {
            Ok(conn) => query_executor::column_names(conn, table),
            Err(e) => Err(e),
        };
        result.unwrap_or_else(|e| {
            warn!(%table, "error getting column names: {e}");
            Vec::new()
        })
    }

    async fn row_count(&mut self, table: &str) -> usize {
        let result = match self.handle().await {
            Ok(conn) => query_executor::row_count(conn, table),
            Err(e) => Err(e),
        };
        result.unwrap_or_else(|e| {
            warn!(%table, "error getting row count: {e}");
            0
        })
    }

    fn is_expanded(&self) -> bool {
        self.state.expanded
    }

    fn set_expanded(&mut self, expanded: bool) {
        self.state.expanded = expanded;
    }
}

impl Drop for SqliteDatabase {
    fn drop(&mut self) {
        self.disconnect();
    }
}
