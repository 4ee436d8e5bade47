//! Event store errors

use thiserror::Error;

use crate::appdef::AppDefError;
use crate::config::ConfigError;
use crate::ids::IdError;
use crate::log::LogError;
use crate::names::NamesError;
use crate::records::RecordsError;
use crate::storage::StorageError;

/// Result type for event store operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Event store errors. Invalid events are not errors; they are reported
/// by the event itself.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("application definition: {0}")]
    AppDef(#[from] AppDefError),

    #[error(transparent)]
    Names(#[from] NamesError),

    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    #[error("log: {0}")]
    Log(#[from] LogError),

    #[error(transparent)]
    Records(#[from] RecordsError),

    #[error("id generation: {0}")]
    Ids(#[from] IdError),
}
