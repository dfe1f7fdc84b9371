/// Core Module
///
/// Shared infrastructure for the facade: the database layer and the error
/// type every operation reports through.

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{FacadeError, OrExit, Result};
