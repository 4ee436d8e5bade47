//! Name table errors

use std::io;

use thiserror::Error;

use crate::appdef::QName;

/// Result type for name table operations
pub type NamesResult<T> = Result<T, NamesError>;

/// Name table errors
#[derive(Debug, Error)]
pub enum NamesError {
    #[error("unknown qualified name '{0}'")]
    UnknownQName(QName),

    #[error("unknown qualified name id {0}")]
    UnknownQNameId(u16),

    #[error("unknown container name '{0}'")]
    UnknownContainer(String),

    #[error("unknown container id {0}")]
    UnknownContainerId(u16),

    #[error("no singleton id assigned to '{0}'")]
    UnknownSingleton(QName),

    /// No identifier is left in the table's range
    #[error("{table} table overflow")]
    Overflow { table: &'static str },

    /// A persisted entry clashes with a reserved or already assigned one
    #[error("{table} table conflict: {reason}")]
    Conflict { table: &'static str, reason: String },

    #[error("names file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("names file {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
