//! Records store errors

use thiserror::Error;

use crate::codec::CodecError;
use crate::ids::RecordId;
use crate::names::NamesError;
use crate::row::FieldErrors;
use crate::storage::StorageError;

/// Result type for records store operations
pub type RecordsResult<T> = Result<T, RecordsError>;

/// Records store errors
#[derive(Debug, Error)]
pub enum RecordsError {
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    #[error("codec: {0}")]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Names(#[from] NamesError),

    /// Only valid events are applied
    #[error("event '{qname}' is not valid: {reason}")]
    InvalidEvent { qname: String, reason: String },

    /// A new record's id is already taken
    #[error("record {id} already exists")]
    Exists { id: RecordId },

    /// An updated record is not in storage
    #[error("record {id} to update does not exist")]
    NotFound { id: RecordId },

    /// An update does not apply to its stored origin
    #[error("update of record {id} failed: {source}")]
    Update {
        id: RecordId,
        #[source]
        source: FieldErrors,
    },
}
