//! Identifier generation errors

use thiserror::Error;

use super::record_id::RecordId;

/// Boxed error returned by a generation hook.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for identifier operations
pub type IdResult<T> = Result<T, IdError>;

/// Identifier generation errors
#[derive(Debug, Error)]
pub enum IdError {
    /// The generation hook rejected the identifier
    #[error("generation of id {storage_id} for raw id {raw_id} rejected: {source}")]
    Rejected {
        raw_id: RecordId,
        storage_id: RecordId,
        #[source]
        source: HookError,
    },

    /// The counter cannot advance any further
    #[error("record id space exhausted")]
    Exhausted,

    /// No singleton identifier is assigned to the type
    #[error("no singleton id assigned to '{0}'")]
    UnknownSingleton(String),
}
