//! Result formatting shared by both backends, plus the stateless query
//! helpers the SQLite backend runs against its handle.

use std::fmt::Display;

use rusqlite::{
    Batch, Connection, Row, Statement, fallible_iterator::FallibleIterator,
    params, types::ValueRef,
};

use crate::{DbError, NULL_TEXT, ROW_DISPLAY_LIMIT, sql::quote_identifier};

const COLUMN_SEPARATOR: &str = " | ";
const SEPARATOR_JOIN: &str = "-+-";
const SEPARATOR_CELL: &str = "----------";
const TRUNCATION_NOTICE: &str = "\n... (showing first 1000 rows)";

/// Builds the text grid returned by `execute_query`.
///
/// Rows past [`ROW_DISPLAY_LIMIT`] are dropped and a notice is appended
/// when [`finish`](Self::finish) is called.
#[derive(Debug, Default)]
pub struct ResultFormatter {
    output: String,
    rows: usize,
    truncated: bool,
}

impl ResultFormatter {
    /// Start a grid with a header line and a dashed separator line
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Self {
        let mut output = join_cells(columns);
        output.push('\n');
        output.push_str(
            &vec![SEPARATOR_CELL; columns.len()].join(SEPARATOR_JOIN),
        );
        output.push('\n');

        Self {
            output,
            ..Self::default()
        }
    }

    /// Append one data row.
    ///
    /// Returns `false` once the display limit has been exceeded, telling the
    /// caller it can stop fetching.
    pub fn push_row<I, S>(&mut self, cells: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.rows >= ROW_DISPLAY_LIMIT {
            self.truncated = true;
            return false;
        }

        let line = join_cells(cells);
        self.output.push_str(&line);
        self.output.push('\n');
        self.rows += 1;
        true
    }

    #[must_use]
    pub const fn row_count(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn finish(mut self) -> String {
        if self.truncated {
            self.output.push_str(TRUNCATION_NOTICE);
        }
        self.output
    }

    /// Message for statements that return no columns
    #[must_use]
    pub fn affected_rows(count: impl Display) -> String {
        format!("Query executed successfully. Rows affected: {count}")
    }
}

fn join_cells<I, S>(cells: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut line = String::new();
    for (idx, cell) in cells.into_iter().enumerate() {
        if idx > 0 {
            line.push_str(COLUMN_SEPARATOR);
        }
        line.push_str(cell.as_ref());
    }
    line
}

/// Prefix a failure the way every string-returning query path reports it
#[must_use]
pub fn error_text(err: &DbError) -> String {
    format!("Error: {err}")
}

/// Run a script of one or more statements and format its result.
///
/// Statements run in order. The output is the grid of the last statement
/// that returned columns, or the affected-row count of the last one when
/// none did.
///
/// # Errors
///
/// Returns [`DbError::Query`] if a statement fails to prepare or step.
/// Statements before the failing one have already run.
pub fn execute_query(conn: &Connection, sql: &str) -> Result<String, DbError> {
    let sql = sql.trim();
    if sql.is_empty() {
        return Err(DbError::Query("No SQL statement to execute".to_string()));
    }

    let mut last_grid = None;
    let mut affected = 0;

    // Each statement is prepared only after the previous one ran, so a
    // script may use the tables it creates.
    let mut batch = Batch::new(conn, sql);
    while let Some(mut stmt) = batch.next()? {
        if stmt.column_count() == 0 {
            affected = stmt.execute([])?;
        } else {
            last_grid = Some(format_rows(&mut stmt)?);
        }
    }

    Ok(last_grid.unwrap_or_else(|| ResultFormatter::affected_rows(affected)))
}

fn format_rows(stmt: &mut Statement<'_>) -> Result<String, DbError> {
    let column_count = stmt.column_count();
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(|s| (*s).to_string())
        .collect();
    let mut formatter = ResultFormatter::new(&column_names);

    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        if !formatter.push_row(row_cells(row, column_count)?) {
            break;
        }
    }

    Ok(formatter.finish())
}

/// Fetch one page of a table as display strings.
///
/// # Errors
///
/// Returns [`DbError::Query`] if the table does not exist or a row fails to
/// decode.
pub fn table_data(
    conn: &Connection,
    table: &str,
    limit: usize,
    offset: usize,
) -> Result<Vec<Vec<String>>, DbError> {
    let sql = format!(
        "SELECT * FROM {} LIMIT ?1 OFFSET ?2",
        quote_identifier(table)
    );
    let mut stmt = conn.prepare(&sql)?;
    let column_count = stmt.column_count();

    let mut rows = stmt.query(params![to_i64(limit), to_i64(offset)])?;
    let mut data = Vec::new();
    while let Some(row) = rows.next()? {
        data.push(row_cells(row, column_count)?);
    }

    Ok(data)
}

/// Column names of a table or view, in declaration order
///
/// # Errors
///
/// Returns [`DbError::Query`] if the pragma fails.
pub fn column_names(
    conn: &Connection,
    table: &str,
) -> Result<Vec<String>, DbError> {
    let sql = format!("PRAGMA table_info({})", quote_identifier(table));
    let mut stmt = conn.prepare(&sql)?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(names)
}

/// # Errors
///
/// Returns [`DbError::Query`] if the table does not exist.
pub fn row_count(conn: &Connection, table: &str) -> Result<usize, DbError> {
    let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
    let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;

    Ok(usize::try_from(count).unwrap_or_default())
}

fn row_cells(
    row: &Row<'_>,
    column_count: usize,
) -> Result<Vec<String>, DbError> {
    (0..column_count)
        .map(|idx| -> Result<String, DbError> {
            Ok(cell_text(row.get_ref(idx)?))
        })
        .collect()
}

/// Render a cell the way `sqlite3_column_text` would
fn cell_text(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => NULL_TEXT.to_string(),
        ValueRef::Integer(v) => v.to_string(),
        ValueRef::Real(v) => real_text(v),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

/// SQLite's `%!.15g`: 15 significant digits, trailing zeros trimmed but at
/// least one fractional digit kept, two-digit signed exponent.
fn real_text(v: f64) -> String {
    if v.is_infinite() {
        return if v > 0.0 { "Inf" } else { "-Inf" }.to_string();
    }
    if v == 0.0 {
        return "0.0".to_string();
    }

    let scientific = format!("{v:.14e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return v.to_string();
    };
    let exponent: i32 = exponent.parse().unwrap_or_default();

    if !(-4..15).contains(&exponent) {
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!(
            "{}e{sign}{:02}",
            trim_fraction(mantissa),
            exponent.unsigned_abs()
        );
    }

    let decimals = usize::try_from(14 - exponent).unwrap_or_default();
    trim_fraction(&format!("{v:.decimals$}"))
}

fn trim_fraction(number: &str) -> String {
    if !number.contains('.') {
        return format!("{number}.0");
    }
    let trimmed = number.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{trimmed}0")
    } else {
        trimmed.to_string()
    }
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
