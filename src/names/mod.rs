//! Name interning tables
//!
//! Persisted once per application and loaded at startup. Identifiers of
//! already persisted names never change; new names are appended.

mod errors;
mod persist;
mod tables;

pub use errors::{NamesError, NamesResult};
pub use persist::{Names, NamesFile};
pub use tables::{
    plog_view, records_view, wlog_view, ContainerTable, QNameTable, SingletonTable,
    CORRUPTED_QNAME_ID, CUD_QNAME_ID, ERROR_QNAME_ID, FIRST_USER_CONTAINER_ID,
    FIRST_USER_QNAME_ID, NULL_CONTAINER_ID, NULL_QNAME_ID, PLOG_QNAME_ID, RECORDS_QNAME_ID,
    WLOG_QNAME_ID,
};
