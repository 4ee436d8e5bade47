//! Record identifiers and identifier generation
//!
//! Raw identifiers proposed by clients are resolved to durable storage
//! identifiers while an event is committed. Singleton documents bypass
//! the generator and use identifiers assigned by the names tables.

mod errors;
mod generator;
mod record_id;

pub use errors::{HookError, IdError, IdResult};
pub use generator::{GenerationHook, IdGenerator, SequentialIdGenerator};
pub use record_id::RecordId;
