/// Database Module
///
/// The database layer is split into three concerns:
/// - **Client** (`client.rs`): the `DatabaseClient` capability and its SQLite implementation
/// - **Facade** (`connection.rs`): the single object that owns the client handle and the last-* state
/// - **Query** (`query.rs`): result sets and read/write classification
///
/// All operations report through `FacadeError`.
pub mod client;
pub mod connection;
pub mod query;

pub use client::*;
pub use connection::*;
pub use query::*;
