//! Event logs
//!
//! Two append-only logs hold committed events: one per handling
//! partition and one per workspace. Each is addressed by a 64-bit offset
//! starting at zero.
//!
//! # Design Principles
//!
//! - Offsets map to fixed-size physical partitions of 4096 events
//! - Offset reuse is governed by the trust level
//! - Undecodable events are delivered, never hidden

mod addressing;
mod errors;
mod event_log;
pub mod keys;
mod trust;

pub use addressing::{read_partitioned, PartitionRange, ReadFlow, READ_TO_THE_END};
pub use errors::{LogError, LogErrorCode, LogResult, Severity};
pub use event_log::EventLog;
pub use keys::PARTITION_RECORD_COUNT;
pub use trust::{LogKind, TrustLevel};
