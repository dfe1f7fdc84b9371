// Core infrastructure modules
pub mod config;
pub mod core;

#[cfg(test)]
pub(crate) mod test_utils;

pub use crate::config::ConnectionConfig;
pub use crate::core::db::{
    ConnectionFacade, ConnectionState, DatabaseClient, QueryResult, SqliteClient, StatementKind,
    StatementOutcome,
};
pub use crate::core::{FacadeError, OrExit, Result};
