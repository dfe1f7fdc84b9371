/// Connection Facade Module
///
/// The facade owns at most one database client handle and records the
/// outcome of every operation performed through it.

use crate::config::ConnectionConfig;
use crate::core::db::client::{DatabaseClient, SqliteClient};
use crate::core::db::query::{QueryResult, StatementKind, StatementOutcome};
use crate::core::{FacadeError, Result};
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Message recorded after a statement succeeds
pub const QUERY_SUCCESS_MESSAGE: &str = "Query executed successfully, no error.";

/// Lifecycle of the facade's client handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection has been opened yet
    Uninitialized,
    /// A client handle is open
    Connected,
    /// The handle was closed
    Disconnected,
}

impl Default for ConnectionState {
    fn default() -> Self {
        ConnectionState::Uninitialized
    }
}

/// Process-wide facade, created on first access
static INSTANCE: OnceCell<Mutex<ConnectionFacade>> = OnceCell::new();

/// Single point of database access.
///
/// The type is neither `Clone` nor deserializable, so the only way to share
/// one is by reference or through [`ConnectionFacade::instance`].
pub struct ConnectionFacade<C: DatabaseClient = SqliteClient> {
    config: Option<ConnectionConfig>,
    client: Option<C>,
    state: ConnectionState,
    last_error: Option<String>,
    last_success: Option<String>,
    last_result: Option<QueryResult>,
    returned_rows: Option<usize>,
    affected_rows: Option<usize>,
}

impl ConnectionFacade<SqliteClient> {
    /// Returns the process-wide facade.
    ///
    /// Every call returns the same instance; the mutex serializes access to
    /// the handle and the recorded state.
    ///
    /// The static is never dropped, so `Drop` does not run for it. Call
    /// [`disconnect`](Self::disconnect) before the process exits to release
    /// the handle.
    pub fn instance() -> &'static Mutex<ConnectionFacade> {
        INSTANCE.get_or_init(|| Mutex::new(ConnectionFacade::new()))
    }
}

impl<C: DatabaseClient> ConnectionFacade<C> {
    /// Creates a facade with no open connection
    pub fn new() -> Self {
        ConnectionFacade {
            config: None,
            client: None,
            state: ConnectionState::default(),
            last_error: None,
            last_success: None,
            last_result: None,
            returned_rows: None,
            affected_rows: None,
        }
    }

    /// Opens a connection using `config`.
    ///
    /// # Errors
    ///
    /// `AlreadyConnected` if a handle is open, `Config` for an invalid
    /// configuration, and whatever the client reports when the open fails.
    pub fn connect(&mut self, config: ConnectionConfig) -> Result<()> {
        if self.client.is_some() {
            return Err(self.fail(FacadeError::AlreadyConnected));
        }
        if let Err(e) = config.validate() {
            return Err(self.fail(e));
        }

        let client = match C::connect(&config) {
            Ok(client) => client,
            Err(e) => return Err(self.fail(e)),
        };

        info!("Connected to database {} on {}", config.dbname, config.host);
        self.succeed(format!(
            "Connected to database {} on {}",
            config.dbname, config.host
        ));
        self.client = Some(client);
        self.config = Some(config);
        self.state = ConnectionState::Connected;
        Ok(())
    }

    /// Closes the open connection.
    ///
    /// Closing twice fails with `NotConnected`.
    pub fn disconnect(&mut self) -> Result<()> {
        let client = match self.client.take() {
            Some(client) => client,
            None => return Err(self.fail(FacadeError::NotConnected)),
        };

        // The handle is consumed whether or not the close succeeds.
        self.state = ConnectionState::Disconnected;
        match client.close() {
            Ok(()) => {
                info!("Connection closed");
                self.succeed("Connection closed".to_string());
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Switches the active database on the open connection
    pub fn select_database(&mut self, name: &str) -> Result<()> {
        let outcome = match self.client.as_mut() {
            Some(client) => client.select_db(name),
            None => Err(FacadeError::NotConnected),
        };

        match outcome {
            Ok(()) => {
                info!("Selected database {}", name);
                if let Some(config) = self.config.as_mut() {
                    config.dbname = name.to_string();
                }
                self.succeed(format!("Selected database {}", name));
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Runs one raw statement and reports whether it returned rows.
    ///
    /// The statement is executed exactly once and the client decides its
    /// kind. Statements that return rows update the returned row count and
    /// the last result set; statements that change rows update the affected
    /// row count. A write with `RETURNING` updates both.
    /// Failures are recorded in [`last_error`](Self::last_error) and returned.
    ///
    /// # Errors
    ///
    /// `NotConnected` without an open handle, `Query` for text holding more
    /// than one statement or for statements the database rejects.
    pub fn execute_query(&mut self, sql: &str) -> Result<StatementKind> {
        let outcome = match self.client.as_mut() {
            Some(client) => client.run(sql),
            None => Err(FacadeError::NotConnected),
        };
        self.record(outcome)
    }

    /// Runs a statement the caller declares as returning rows
    pub fn query(&mut self, sql: &str) -> Result<()> {
        let outcome = match self.client.as_mut() {
            Some(client) => client.query(sql).map(StatementOutcome::rows),
            None => Err(FacadeError::NotConnected),
        };
        self.record(outcome).map(|_| ())
    }

    /// Runs a statement the caller declares as changing rows
    pub fn execute(&mut self, sql: &str) -> Result<()> {
        let outcome = match self.client.as_mut() {
            Some(client) => client.execute(sql).map(StatementOutcome::changed),
            None => Err(FacadeError::NotConnected),
        };
        self.record(outcome).map(|_| ())
    }

    fn record(&mut self, outcome: Result<StatementOutcome>) -> Result<StatementKind> {
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Statement failed: {}", e);
                return Err(self.fail(e));
            }
        };

        let kind = outcome.kind();
        if let Some(count) = outcome.changes {
            debug!("Statement affected {} rows", count);
            self.affected_rows = Some(count);
        }
        if let Some(result) = outcome.result {
            debug!("Statement returned {} rows", result.row_count);
            self.returned_rows = Some(result.row_count);
            self.last_result = Some(result);
        }

        self.succeed(QUERY_SUCCESS_MESSAGE.to_string());
        Ok(kind)
    }

    /// Rows returned by the last read, if any read has run
    pub fn returned_rows(&self) -> Option<usize> {
        self.returned_rows
    }

    /// Rows changed by the last write, if any write has run
    pub fn affected_rows(&self) -> Option<usize> {
        self.affected_rows
    }

    /// First row of the last result set
    pub fn first_result(&self) -> Option<&[String]> {
        self.last_result.as_ref().and_then(QueryResult::first_row)
    }

    pub fn last_result(&self) -> Option<&QueryResult> {
        self.last_result.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn last_success(&self) -> Option<&str> {
        self.last_success.as_deref()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Configuration of the current or last connection
    pub fn config(&self) -> Option<&ConnectionConfig> {
        self.config.as_ref()
    }

    fn fail(&mut self, error: FacadeError) -> FacadeError {
        self.last_error = Some(error.to_string());
        error
    }

    fn succeed(&mut self, message: String) {
        self.last_success = Some(message);
    }
}

impl<C: DatabaseClient> Default for ConnectionFacade<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: DatabaseClient> fmt::Debug for ConnectionFacade<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionFacade")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("last_error", &self.last_error)
            .field("last_success", &self.last_success)
            .field("returned_rows", &self.returned_rows)
            .field("affected_rows", &self.affected_rows)
            .finish()
    }
}

impl<C: DatabaseClient> Drop for ConnectionFacade<C> {
    fn drop(&mut self) {
        if let Some(client) = self.client.take() {
            if let Err(e) = client.close() {
                warn!("Closing connection on drop failed: {}", e);
            }
        }
    }
}
