use thiserror::Error;

/// Errors surfaced by the store and bootstrap layers.
///
/// `Connection` is fatal and never retried. `Validation` and
/// `DependencyMissing` abort only the operation that raised them; bootstrap
/// steps are independent and each one is safe to re-run.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection error: {0}")]
    Connection(#[source] mongodb::error::Error),

    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("unexpected server reply: {0}")]
    UnexpectedReply(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("missing dependency: {0}")]
    DependencyMissing(String),
}
