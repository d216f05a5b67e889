//! Typed errors for every stage of the CRUD pipeline.

use thiserror::Error;

/// Error taxonomy for action calls. Every action returns `Result<_, CrudError>`
/// and short-circuits on the first failing step.
#[derive(Error, Debug)]
pub enum CrudError {
    /// A single-row lookup matched zero rows. A signal, not a fault.
    #[error("not found")]
    NotFound,
    /// The payload was rejected: a permission/required-field check or a
    /// caller-supplied validator. The message names the offending fields.
    #[error("validation: {0}")]
    Validation(String),
    /// A record references a field the registry/schema does not know.
    /// Misconfiguration, not user error; fatal for the call.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),
    /// Connector-level failure, propagated with the driver's message.
    #[error("storage: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for CrudError {
    fn from(e: sqlx::Error) -> Self {
        CrudError::Storage(e.to_string())
    }
}
