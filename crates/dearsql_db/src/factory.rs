use tracing::{debug, error};

use crate::{
    ConnectionDescriptor, DataSource, postgres::PostgresDatabase,
    sqlite::SqliteDatabase,
};

/// Build an unconnected data source for a descriptor.
///
/// Returns `None` when the descriptor fails validation; the reason is
/// logged.
#[must_use]
pub fn create(descriptor: &ConnectionDescriptor) -> Option<Box<dyn DataSource>> {
    if let Err(e) = descriptor.validate() {
        error!(name = descriptor.name(), "invalid connection: {e}");
        return None;
    }

    debug!(name = descriptor.name(), kind = %descriptor.kind(), "creating data source");
    let source: Box<dyn DataSource> = match descriptor {
        ConnectionDescriptor::Sqlite { name, path } => {
            Box::new(SqliteDatabase::new(name.clone(), path.clone()))
        }
        ConnectionDescriptor::Postgres(server) => {
            Box::new(PostgresDatabase::new(server.clone()))
        }
    };

    Some(source)
}
