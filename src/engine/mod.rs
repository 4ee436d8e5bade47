//! Event store engine
//!
//! Single entry point tying the subsystems together.
//!
//! # Design Principles
//!
//! - One storage backend holds logs and records
//! - Identifier generators are supplied per call; callers serialize
//!   access per partition
//! - Invalid events are committed for audit, never dropped

mod errors;
mod store;

pub use errors::{EngineError, EngineResult};
pub use store::EventStore;
