use std::time::Duration;

use async_trait::async_trait;
use tokio_postgres::{Client, Config, NoTls, SimpleQueryMessage, SimpleQueryRow};
use tracing::{debug, error, info, warn};

use crate::{
    Column, DataSource, DatabaseKind, DbError, NULL_TEXT, Table,
    connection::ServerDescriptor,
    query_executor::{ResultFormatter, error_text},
    sql::quote_identifier,
    state::SourceState,
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const TABLES_QUERY: &str = "
    SELECT tablename::text
    FROM pg_catalog.pg_tables
    WHERE schemaname = 'public'
    ORDER BY tablename
";

const COLUMNS_QUERY: &str = "
    SELECT
        c.column_name::text,
        c.data_type::text,
        c.is_nullable::text = 'NO' AS not_null,
        COALESCE(bool_or(tc.constraint_type::text = 'PRIMARY KEY'), false) AS primary_key
    FROM information_schema.columns c
    LEFT JOIN information_schema.key_column_usage k
        ON (k.table_schema = c.table_schema
            AND k.table_name = c.table_name
            AND k.column_name = c.column_name)
    LEFT JOIN information_schema.table_constraints tc
        ON (tc.constraint_schema = k.constraint_schema
            AND tc.constraint_name = k.constraint_name)
    WHERE c.table_schema = 'public'
    AND c.table_name::text = $1
    GROUP BY c.column_name, c.data_type, c.is_nullable, c.ordinal_position
    ORDER BY c.ordinal_position
";

const COLUMN_NAMES_QUERY: &str = "
    SELECT column_name::text
    FROM information_schema.columns
    WHERE table_schema = 'public'
    AND table_name::text = $1
    ORDER BY ordinal_position
";

/// A PostgreSQL server reached over the network.
///
/// Every call runs inside its own short transaction on a single client.
pub struct PostgresDatabase {
    server: ServerDescriptor,
    identity: String,
    client: Option<Client>,
    state: SourceState,
}

impl PostgresDatabase {
    #[must_use]
    pub fn new(server: ServerDescriptor) -> Self {
        let identity = format!(
            "host={} port={} dbname={} user={}",
            server.host, server.port, server.database, server.username
        );

        Self {
            state: SourceState::new(server.name.clone()),
            server,
            identity,
            client: None,
        }
    }

    fn config(&self) -> Config {
        let mut config = Config::new();
        config
            .host(&self.server.host)
            .port(self.server.port)
            .dbname(&self.server.database)
            .user(&self.server.username)
            .application_name("dearsql")
            .connect_timeout(CONNECT_TIMEOUT);
        if !self.server.password.is_empty() {
            config.password(&self.server.password);
        }
        config
    }

    /// Get the live client, reconnecting first if needed
    async fn client(&mut self) -> Result<&mut Client, DbError> {
        if !self.connect().await {
            return Err(DbError::Disconnected);
        }
        self.client.as_mut().ok_or(DbError::Disconnected)
    }

    async fn load_tables(client: &mut Client) -> Result<Vec<Table>, DbError> {
        let tx = client.transaction().await?;

        let names: Vec<String> = tx
            .query(TABLES_QUERY, &[])
            .await?
            .iter()
            .map(|row| row.get(0))
            .collect();

        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            debug!(table = %name, "adding table");
            let columns = tx
                .query(COLUMNS_QUERY, &[&name])
                .await?
                .iter()
                .map(|row| {
                    let not_null: bool = row.get(2);
                    let primary_key: bool = row.get(3);
                    Column {
                        name: row.get(0),
                        data_type: row.get(1),
                        is_primary_key: primary_key,
                        is_not_null: not_null || primary_key,
                    }
                })
                .collect();
            tables.push(Table {
                name,
                columns,
                expanded: false,
            });
        }

        tx.commit().await?;
        Ok(tables)
    }

    async fn run_query(client: &mut Client, sql: &str) -> Result<String, DbError> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Err(DbError::Query("No SQL statement to execute".to_string()));
        }

        let tx = client.transaction().await?;
        let messages = tx.simple_query(sql).await?;
        tx.commit().await?;

        Ok(format_messages(&messages))
    }

    /// One page as the server's own text form of every value.
    ///
    /// LIMIT and OFFSET are formatted from `usize`, so splicing them is
    /// safe; the simple-query protocol keeps NULL apart from the text
    /// `'NULL'`.
    async fn fetch_page(
        client: &mut Client,
        table: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Vec<String>>, DbError> {
        let sql = format!(
            "SELECT * FROM {} LIMIT {limit} OFFSET {offset}",
            quote_identifier(table)
        );

        let tx = client.transaction().await?;
        let messages = tx.simple_query(&sql).await?;
        tx.commit().await?;

        Ok(messages
            .iter()
            .filter_map(|message| match message {
                SimpleQueryMessage::Row(row) => Some(row_cells(row)),
                _ => None,
            })
            .collect())
    }

    async fn fetch_column_names(
        client: &mut Client,
        table: &str,
    ) -> Result<Vec<String>, DbError> {
        let tx = client.transaction().await?;
        let rows = tx.query(COLUMN_NAMES_QUERY, &[&table]).await?;
        tx.commit().await?;

        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    async fn fetch_row_count(
        client: &mut Client,
        table: &str,
    ) -> Result<usize, DbError> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));

        let tx = client.transaction().await?;
        let count: i64 = tx.query_one(&sql, &[]).await?.get(0);
        tx.commit().await?;

        Ok(usize::try_from(count).unwrap_or_default())
    }
}

#[async_trait]
impl DataSource for PostgresDatabase {
    async fn connect(&mut self) -> bool {
        if self.is_connected() {
            return true;
        }

        match self.config().connect(NoTls).await {
            Ok((client, connection)) => {
                let identity = self.identity.clone();
                // Spawn the connection to run in the background
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        error!(%identity, "database connection error: {e}");
                    }
                });
                info!(identity = %self.identity, "connected to database");
                self.client = Some(client);
                true
            }
            Err(e) => {
                warn!(identity = %self.identity, "can't connect to database: {e}");
                self.client = None;
                false
            }
        }
    }

    fn disconnect(&mut self) {
        if self.client.take().is_some() {
            info!(identity = %self.identity, "disconnected");
        }
    }

    fn is_connected(&self) -> bool {
        self.client.as_ref().is_some_and(|client| !client.is_closed())
    }

    fn name(&self) -> &str {
        &self.state.name
    }

    fn connection_identity(&self) -> &str {
        &self.identity
    }

    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Postgres
    }

    async fn refresh_tables(&mut self) {
        info!(database = %self.state.name, "refreshing tables");
        if !self.connect().await {
            self.state.refresh_skipped();
            return;
        }
        let result = match self.client.as_mut() {
            Some(client) => Self::load_tables(client).await,
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
        let result = match self.client().await {
            Ok(client) => Self::run_query(client, sql).await,
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
        let result = match self.client().await {
            Ok(client) => Self::fetch_page(client, table, limit, offset).await,
            Err(e) => Err(e),
        };
        result.unwrap_or_else(|e| {
            warn!(%table, "error getting table data: {e}");
            Vec::new()
        })
    }

    async fn column_names(&mut self, table: &str) -> Vec<String> {
        let result = match self.client().await {
            Ok(client) => Self::fetch_column_names(client, table).await,
            Err(e) => Err(e),
        };
        result.unwrap_or_else(|e| {
            warn!(%table, "error getting column names: {e}");
            Vec::new()
        })
    }

    async fn row_count(&mut self, table: &str) -> usize {
        let result = match self.client().await {
            Ok(client) => Self::fetch_row_count(client, table).await,
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

/// Format the last row-returning statement of a simple query, or the
/// affected-row count when none returned rows.
fn format_messages(messages: &[SimpleQueryMessage]) -> String {
    let mut current: Option<ResultFormatter> = None;
    let mut last_grid = None;
    let mut affected = 0;

    for message in messages {
        match message {
            SimpleQueryMessage::RowDescription(columns) => {
                let names: Vec<&str> =
                    columns.iter().map(|column| column.name()).collect();
                current = Some(ResultFormatter::new(&names));
            }
            SimpleQueryMessage::Row(row) => {
                if let Some(formatter) = current.as_mut() {
                    formatter.push_row(row_cells(row));
                }
            }
            SimpleQueryMessage::CommandComplete(count) => match current.take() {
                Some(formatter) => last_grid = Some(formatter.finish()),
                None => affected = *count,
            },
            _ => {}
        }
    }

    last_grid.unwrap_or_else(|| ResultFormatter::affected_rows(affected))
}

fn row_cells(row: &SimpleQueryRow) -> Vec<String> {
    (0..row.len())
        .map(|idx| row.get(idx).unwrap_or(NULL_TEXT).to_string())
        .collect()
}
