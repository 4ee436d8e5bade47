//! Events subsystem
//!
//! An event is the unit of change: a command name, its argument objects
//! and a change-set of record creations and updates.
//!
//! # Design Principles
//!
//! - Building never fails; invalid input yields an invalid event that is
//!   still persisted with its raw bytes
//! - Raw identifiers are local to an event until regenerated at commit
//! - Events read from the logs are shared by reference count

mod builder;
mod errors;
mod event;
mod pool;
pub(crate) mod regen;
mod validate;

pub use builder::{EventBuilder, RawEventParams};
pub use errors::{BuildError, ValidationCode, ValidationError, ValidationErrors};
pub use event::{Event, EventParams, Offset, PartitionId, SyncParams, WorkspaceId};
pub use pool::{BufferPool, DbEvent};
