//! Key-value storage collaborator
//!
//! The record core only builds keys and values; it never assumes
//! multi-key atomicity beyond single-key writes.
//!
//! # Design Principles
//!
//! - Values are sealed with a CRC32 trailer by their writers
//! - Checksums are verified on every read
//! - The file backend is append-only; the latest record for a key wins

mod backend;
mod checksum;
mod errors;
mod file;
mod memory;
mod record;

pub use backend::{StorageBackend, StorageKey};
pub use checksum::{compute_checksum, seal, unseal, verify_checksum, CHECKSUM_LEN};
pub use errors::{Severity, StorageError, StorageErrorCode, StorageResult};
pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use record::{KvRecord, MIN_RECORD_SIZE};
