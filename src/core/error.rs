/// Facade Error Module
///
/// This module defines the error type shared by every facade operation and the
/// `OrExit` helper used by callers that treat a failure as fatal.
use thiserror::Error;
use tracing::error;

/// Error type for the database facade.
///
/// Every operation returns one of these instead of terminating the process.
/// Whether an error is fatal is decided by the caller (see [`OrExit`]).
#[derive(Error, Debug)]
pub enum FacadeError {
    /// Errors surfaced directly by the SQLite client
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The connection could not be opened
    #[error("Connection error ({code}) {message}")]
    Connection { code: i32, message: String },

    /// The requested database does not exist or is not reachable
    #[error("Database not found: selecting the database named `{name}` failed. Check if the database exists or the name is misspelled.")]
    UnknownDatabase { name: String },

    /// The client refused to close the connection
    #[error("Failed to close the connection to database: {0}")]
    Disconnect(String),

    /// A handle-requiring operation ran without an open connection
    #[error("Not connected: no open database connection")]
    NotConnected,

    /// `connect` was called on a facade that already holds a connection
    #[error("Already connected: disconnect before connecting again")]
    AlreadyConnected,

    /// SQL statement errors (syntax, missing tables, constraint violations)
    #[error("Query error: {0}")]
    Query(String),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic application errors for unexpected conditions
    #[error("Application error: {0}")]
    App(String),
}

/// Type alias for Result to use FacadeError as the error type.
pub type Result<T> = std::result::Result<T, FacadeError>;

/// Turns a failed operation into process termination.
///
/// The message goes to the log and to stderr, then the process exits with
/// status 1. Only binaries should reach for this.
pub trait OrExit<T> {
    fn or_exit(self) -> T;
}

impl<T> OrExit<T> for Result<T> {
    fn or_exit(self) -> T {
        match self {
            Ok(value) => value,
            Err(e) => {
                error!("fatal: {}", e);
                eprintln!("{}", e);
                std::process::exit(1);
            }
        }
    }
}
