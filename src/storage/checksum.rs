//! CRC32 value envelope
//!
//! Every value written by the logs and the records store is sealed with a
//! trailing CRC32 (IEEE polynomial, little-endian). Unsealing verifies it.

use crc32fast::Hasher;

use super::errors::{StorageError, StorageResult};

/// Size of the checksum trailer.
pub const CHECKSUM_LEN: usize = 4;

/// Computes a CRC32 checksum over the provided data.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Verifies that the computed checksum matches the expected checksum.
pub fn verify_checksum(data: &[u8], expected: u32) -> bool {
    compute_checksum(data) == expected
}

/// Appends the checksum trailer to a value.
pub fn seal(mut value: Vec<u8>) -> Vec<u8> {
    let checksum = compute_checksum(&value);
    value.extend_from_slice(&checksum.to_le_bytes());
    value
}

/// Verifies and strips the checksum trailer.
pub fn unseal(sealed: &[u8]) -> StorageResult<&[u8]> {
    if sealed.len() < CHECKSUM_LEN {
        return Err(StorageError::corrupt_value(format!(
            "sealed value too short: {} bytes",
            sealed.len()
        )));
    }
    let (value, trailer) = sealed.split_at(sealed.len() - CHECKSUM_LEN);
    let expected = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    if !verify_checksum(value, expected) {
        return Err(StorageError::corrupt_value(format!(
            "checksum mismatch: expected {:#010x}, computed {:#010x}",
            expected,
            compute_checksum(value)
        )));
    }
    Ok(value)
}
