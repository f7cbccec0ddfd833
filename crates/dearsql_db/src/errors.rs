use std::fmt;

/// Errors raised inside the database backends.
///
/// These never cross the [`DataSource`](crate::DataSource) boundary: the
/// trait methods turn them into `false`, empty results or an `Error: ...`
/// string so the front-end can keep rendering.
#[derive(Debug)]
pub enum DbError {
    /// Opening the underlying handle failed
    Connection(String),
    /// A statement failed to prepare or run
    Query(String),
    /// An operation needed a live handle and none was available
    Disconnected,
    /// A connection descriptor was incomplete or malformed
    Configuration(String),
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(msg) => write!(f, "Connection error: {msg}"),
            Self::Query(msg) => write!(f, "{msg}"),
            Self::Disconnected => write!(f, "Failed to connect to database"),
            Self::Configuration(msg) => {
                write!(f, "Configuration error: {msg}")
            }
        }
    }
}

impl std::error::Error for DbError {}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Query(err.to_string())
    }
}

impl From<tokio_postgres::Error> for DbError {
    fn from(err: tokio_postgres::Error) -> Self {
        // The server-side message is far more useful than the generic
        // "db error" wrapper text.
        match err.as_db_error() {
            Some(db_err) => Self::Query(db_err.message().to_string()),
            None => Self::Query(err.to_string()),
        }
    }
}

impl From<url::ParseError> for DbError {
    fn from(err: url::ParseError) -> Self {
        Self::Configuration(err.to_string())
    }
}
