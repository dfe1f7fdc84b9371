/// Database Client Module
///
/// The capability the facade forwards to, and its SQLite implementation.

use crate::config::ConnectionConfig;
use crate::core::db::query::{
    collect_rows, execute_statement, run_statement, QueryResult, StatementKind, StatementOutcome,
};
use crate::core::{FacadeError, Result};
use rusqlite::{ffi, Connection, OpenFlags};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Database name that opens a private in-memory database
pub const MEMORY_DATABASE: &str = ":memory:";

/// Operations the facade needs from a database client library.
///
/// Implementations own the live connection; `close` consumes it so a handle
/// can only be released once.
pub trait DatabaseClient: Sized {
    /// Opens a connection described by `config`
    fn connect(config: &ConnectionConfig) -> Result<Self>;
    /// Switches the active database
    fn select_db(&mut self, name: &str) -> Result<()>;
    /// Runs a statement that returns rows
    fn query(&mut self, sql: &str) -> Result<QueryResult>;
    /// Runs a statement that changes rows, returning how many
    fn execute(&mut self, sql: &str) -> Result<usize>;
    /// Runs a statement whose kind the client decides.
    ///
    /// The default classifies the text; clients that can inspect a prepared
    /// statement should do that instead.
    fn run(&mut self, sql: &str) -> Result<StatementOutcome> {
        match StatementKind::classify(sql) {
            StatementKind::Read => self.query(sql).map(StatementOutcome::rows),
            StatementKind::Write => self.execute(sql).map(StatementOutcome::changed),
        }
    }
    /// Closes the connection
    fn close(self) -> Result<()>;
}

/// SQLite-backed client.
///
/// The configured host is a directory; database `name` lives at
/// `<host>/<name>.db`. Files are never created on open.
#[derive(Debug)]
pub struct SqliteClient {
    host: PathBuf,
    database: String,
    connection: Connection,
}

impl SqliteClient {
    /// Name of the active database
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Directory the database files are resolved against
    pub fn host(&self) -> &Path {
        &self.host
    }

    /// Names stay inside the host directory
    fn is_valid_name(name: &str) -> bool {
        !name.is_empty() && !name.contains(&['/', '\\', '\0'][..]) && !name.contains("..")
    }

    fn database_path(host: &Path, name: &str) -> PathBuf {
        host.join(format!("{}.db", name))
    }

    fn open(host: &Path, name: &str) -> rusqlite::Result<Connection> {
        let connection = if name == MEMORY_DATABASE {
            Connection::open_in_memory()?
        } else {
            Connection::open_with_flags(
                Self::database_path(host, name),
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?
        };
        connection.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(connection)
    }
}

/// Maps an open failure to a connection error carrying SQLite's code and text.
fn connection_error(error: rusqlite::Error) -> FacadeError {
    match error {
        rusqlite::Error::SqliteFailure(failure, message) => FacadeError::Connection {
            code: failure.extended_code,
            message: message.unwrap_or_else(|| failure.to_string()),
        },
        other => FacadeError::Connection {
            code: -1,
            message: other.to_string(),
        },
    }
}

impl DatabaseClient for SqliteClient {
    fn connect(config: &ConnectionConfig) -> Result<Self> {
        let host = PathBuf::from(&config.host);
        if !host.is_dir() {
            return Err(FacadeError::Connection {
                code: ffi::SQLITE_CANTOPEN,
                message: format!("unknown host `{}`", config.host),
            });
        }

        if config.dbname != MEMORY_DATABASE && !Self::is_valid_name(&config.dbname) {
            return Err(FacadeError::Connection {
                code: ffi::SQLITE_CANTOPEN,
                message: format!("invalid database name `{}`", config.dbname),
            });
        }

        // SQLite has no accounts; the user name is only reported.
        debug!(
            "Opening database {} on {} as {}",
            config.dbname, config.host, config.username
        );
        let connection = Self::open(&host, &config.dbname).map_err(connection_error)?;

        Ok(SqliteClient {
            host,
            database: config.dbname.clone(),
            connection,
        })
    }

    fn select_db(&mut self, name: &str) -> Result<()> {
        let unknown = || FacadeError::UnknownDatabase {
            name: name.to_string(),
        };

        if name != MEMORY_DATABASE
            && !(Self::is_valid_name(name) && Self::database_path(&self.host, name).is_file())
        {
            return Err(unknown());
        }
        let connection = Self::open(&self.host, name).map_err(|e| {
            debug!("Opening database {} failed: {}", name, e);
            unknown()
        })?;

        let previous = std::mem::replace(&mut self.connection, connection);
        if let Err((_, e)) = previous.close() {
            warn!("Closing database {} failed: {}", self.database, e);
        }
        self.database = name.to_string();
        Ok(())
    }

    fn query(&mut self, sql: &str) -> Result<QueryResult> {
        collect_rows(&self.connection, sql)
    }

    fn execute(&mut self, sql: &str) -> Result<usize> {
        execute_statement(&self.connection, sql)
    }

    fn run(&mut self, sql: &str) -> Result<StatementOutcome> {
        run_statement(&self.connection, sql)
    }

    fn close(self) -> Result<()> {
        self.connection
            .close()
            .map_err(|(_, e)| FacadeError::Disconnect(e.to_string()))
    }
}
