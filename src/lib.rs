//! aeroevents - event and record storage core
//!
//! Commands arrive as events: a command name, argument objects and a
//! change-set of record creations and updates. Events are validated,
//! given durable identifiers, encoded with a versioned binary codec and
//! appended to partition and workspace logs; their change-sets are
//! materialized as records.

pub mod appdef;
pub mod codec;
pub mod config;
pub mod engine;
pub mod events;
pub mod ids;
pub mod log;
pub mod names;
pub mod records;
pub mod row;
pub mod storage;

pub use config::StoreConfig;
pub use engine::{EngineError, EventStore};
