use tracing::{error, info, warn};

use crate::{DbError, Table};

/// Bookkeeping every backend carries next to its handle
#[derive(Debug, Default)]
pub(crate) struct SourceState {
    pub name: String,
    pub tables: Vec<Table>,
    pub tables_loaded: bool,
    pub expanded: bool,
}

impl SourceState {
    pub fn new(name: String) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    /// Record the outcome of a refresh whose connect step failed.
    ///
    /// The cached tables are left alone and the loaded flag is still set so
    /// the sidebar does not retry on every frame.
    pub fn refresh_skipped(&mut self) {
        warn!(database = %self.name, "failed to connect, skipping table refresh");
        self.tables_loaded = true;
    }

    pub fn refresh_finished(&mut self, result: Result<Vec<Table>, DbError>) {
        self.tables = match result {
            Ok(tables) => {
                info!(
                    database = %self.name,
                    count = tables.len(),
                    "finished refreshing tables"
                );
                tables
            }
            Err(e) => {
                error!(database = %self.name, "failed to load tables: {e}");
                Vec::new()
            }
        };
        self.tables_loaded = true;
    }
}
