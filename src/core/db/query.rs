/// Query Module
///
/// Result sets, value formatting and read/write statement classification.

use crate::core::{FacadeError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{types::ValueRef, Batch, Connection, Statement};
use serde_json::{Map, Value};
use sqlparser::ast::Statement as ParsedStatement;
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;

/// Error text for input holding more than one statement
pub const MULTIPLE_STATEMENTS: &str =
    "Only one statement can be executed at a time; split the text and run each statement separately";

/// Literals, comments, parentheses and bare words, in source order.
static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)'(?:[^']|'')*'|"(?:[^"]|"")*"|`[^`]*`|\[[^\]]*\]|--[^\n]*|/\*.*?(?:\*/|$)|[()]|[A-Za-z_][A-Za-z0-9_$]*"#,
    )
    .expect("token pattern is valid")
});

/// Verbs that start a statement returning rows
const READ_VERBS: &[&str] = &["SELECT", "VALUES", "SHOW", "DESCRIBE", "DESC", "EXPLAIN", "PRAGMA"];

/// Verbs that can follow a `WITH` clause
const MAIN_VERBS: &[&str] = &["SELECT", "VALUES", "INSERT", "REPLACE", "UPDATE", "DELETE"];

/// Represents the result of a read-style statement
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// Column names from the query result
    pub columns: Vec<String>,
    /// Rows of data as string values
    pub rows: Vec<Vec<String>>,
    /// Number of rows returned
    pub row_count: usize,
}

impl QueryResult {
    /// Creates a new QueryResult from column names and row data
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let row_count = rows.len();
        QueryResult {
            columns,
            rows,
            row_count,
        }
    }

    /// Returns the first row, if any
    pub fn first_row(&self) -> Option<&[String]> {
        self.rows.first().map(|row| row.as_slice())
    }

    /// Renders one row as a JSON object keyed by column name.
    ///
    /// Duplicate column names keep the last value.
    pub fn row_as_json(&self, index: usize) -> Option<Value> {
        let row = self.rows.get(index)?;
        let object: Map<String, Value> = self
            .columns
            .iter()
            .cloned()
            .zip(row.iter().cloned().map(Value::String))
            .collect();
        Some(Value::Object(object))
    }
}

/// What one executed statement produced.
///
/// A write with a `RETURNING` clause carries both rows and a change count.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementOutcome {
    /// Rows, for statements with result columns
    pub result: Option<QueryResult>,
    /// Changed rows, for statements that modify the database
    pub changes: Option<usize>,
}

impl StatementOutcome {
    pub fn rows(result: QueryResult) -> Self {
        StatementOutcome {
            result: Some(result),
            changes: None,
        }
    }

    pub fn changed(count: usize) -> Self {
        StatementOutcome {
            result: None,
            changes: Some(count),
        }
    }

    /// `Read` when the statement returned a result set
    pub fn kind(&self) -> StatementKind {
        if self.result.is_some() {
            StatementKind::Read
        } else {
            StatementKind::Write
        }
    }
}

/// Prepares `sql`, rejecting text that holds more than one statement.
///
/// Nothing is executed here, so a rejected batch leaves the database as it was.
pub fn prepare_single<'conn>(connection: &'conn Connection, sql: &str) -> Result<Statement<'conn>> {
    let mut batch = Batch::new(connection, sql);
    let stmt = batch
        .next()
        .map_err(|e| FacadeError::Query(format!("Failed to prepare statement: {}", e)))?
        .ok_or_else(|| FacadeError::Query("Empty statement".to_string()))?;

    // A remainder that prepares, or fails to, is a second statement.
    if !matches!(batch.next(), Ok(None)) {
        return Err(FacadeError::Query(MULTIPLE_STATEMENTS.to_string()));
    }
    Ok(stmt)
}

fn execution_error(e: rusqlite::Error) -> FacadeError {
    FacadeError::Query(format!("Statement execution failed: {}", e))
}

fn rows_of(stmt: &mut Statement<'_>) -> Result<QueryResult> {
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let column_count = stmt.column_count();

    let rows = stmt
        .query_map([], |row| {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                values.push(format_value(row.get_ref(i)?));
            }
            Ok(values)
        })
        .map_err(|e| FacadeError::Query(format!("Query execution failed: {}", e)))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| FacadeError::Query(format!("Result processing failed: {}", e)))?;

    Ok(QueryResult::new(columns, rows))
}

/// Runs a read-style statement and collects every row as display strings.
pub fn collect_rows(connection: &Connection, sql: &str) -> Result<QueryResult> {
    let mut stmt = prepare_single(connection, sql)?;
    rows_of(&mut stmt)
}

/// Runs a write-style statement and returns the number of changed rows.
///
/// Rows produced by a `RETURNING` clause are drained and discarded. A
/// read-only statement with result columns is refused before it runs.
pub fn execute_statement(connection: &Connection, sql: &str) -> Result<usize> {
    let mut stmt = prepare_single(connection, sql)?;
    if stmt.column_count() == 0 {
        return stmt.raw_execute().map_err(execution_error);
    }
    if stmt.readonly() {
        return Err(FacadeError::Query(
            "Statement returns rows without changing any; run it as a query".to_string(),
        ));
    }

    let mut rows = stmt.raw_query();
    while rows.next().map_err(execution_error)?.is_some() {}
    Ok(connection.changes() as usize)
}

/// Runs one statement, letting the prepared statement decide its kind.
///
/// Statements with result columns are reads; those that also modify the
/// database (`RETURNING`) report their change count as well.
pub fn run_statement(connection: &Connection, sql: &str) -> Result<StatementOutcome> {
    let mut stmt = prepare_single(connection, sql)?;
    if stmt.column_count() == 0 {
        let changed = stmt.raw_execute().map_err(execution_error)?;
        return Ok(StatementOutcome::changed(changed));
    }

    let writes = !stmt.readonly();
    let result = rows_of(&mut stmt)?;
    Ok(StatementOutcome {
        result: Some(result),
        changes: writes.then(|| connection.changes() as usize),
    })
}

/// Formats a SQLite value for display
fn format_value(value: ValueRef) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).to_string(),
        ValueRef::Blob(b) => format!("<BLOB: {} bytes>", b.len()),
    }
}

/// Upper-cased words outside literals, comments and parentheses
fn top_level_words(sql: &str) -> Vec<String> {
    let mut depth = 0usize;
    let mut words = Vec::new();
    for token in TOKEN.find_iter(sql) {
        match token.as_str() {
            "(" => depth += 1,
            ")" => depth = depth.saturating_sub(1),
            word if depth == 0 && word.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') => {
                words.push(word.to_ascii_uppercase())
            }
            _ => {}
        }
    }
    words
}

fn has_returning(words: &[String]) -> bool {
    words.iter().any(|w| w == "RETURNING")
}

/// Whether a statement is expected to return rows or to change them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Returns rows (SELECT, EXPLAIN, PRAGMA, ... RETURNING)
    Read,
    /// Changes rows or schema (INSERT, UPDATE, DELETE, CREATE, ...)
    Write,
}

impl StatementKind {
    /// Classifies a raw SQL string without a database.
    ///
    /// The text is parsed with the SQLite dialect first: an `EXPLAIN` is a
    /// read, a query is classified by the verb after its `WITH` clause, and
    /// any other statement is a write unless it has a top-level `RETURNING`
    /// clause. Text the parser rejects (SQLite-only syntax such as `PRAGMA`)
    /// is classified by its main verb.
    pub fn classify(sql: &str) -> Self {
        match Parser::parse_sql(&SQLiteDialect {}, sql) {
            Ok(statements) if statements.len() == 1 => match &statements[0] {
                // A parsed query may still be `WITH ... INSERT`
                ParsedStatement::Query(_) => Self::from_leading_keyword(sql),
                ParsedStatement::Explain { .. } | ParsedStatement::ExplainTable { .. } => {
                    StatementKind::Read
                }
                _ if has_returning(&top_level_words(sql)) => StatementKind::Read,
                _ => StatementKind::Write,
            },
            _ => Self::from_leading_keyword(sql),
        }
    }

    /// Classifies by the statement's main verb, skipping comments, literals
    /// and any `WITH` clause.
    pub fn from_leading_keyword(sql: &str) -> Self {
        let words = top_level_words(sql);
        let verb = match words.first().map(String::as_str) {
            Some("WITH") => words
                .iter()
                .skip(1)
                .map(String::as_str)
                .find(|w| MAIN_VERBS.contains(w)),
            first => first,
        };

        match verb {
            Some(verb) if READ_VERBS.contains(&verb) => StatementKind::Read,
            Some(_) if has_returning(&words) => StatementKind::Read,
            _ => StatementKind::Write,
        }
    }
}
