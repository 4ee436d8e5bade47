//! Storage keys of the logs and the records view
//!
//! Keys are big-endian so that byte order is numeric order. An offset or
//! record id is split into a physical partition index (partition key) and
//! a position inside it (clustering key).
//!
//! ```text
//! partition log: pk = [u16 sys.PLog][u16 partition][u64 offset >> 12]
//!                cc = [u16 offset & 0xFFF]
//! workspace log: pk = [u16 sys.WLog][u64 workspace][u64 offset >> 12]
//!                cc = [u16 offset & 0xFFF]
//! records:       pk = [u16 sys.Records][u64 workspace][u64 id >> 12]
//!                cc = [u16 id & 0xFFF]
//! ```

use crate::events::{Offset, PartitionId, WorkspaceId};
use crate::ids::RecordId;
use crate::names::{PLOG_QNAME_ID, RECORDS_QNAME_ID, WLOG_QNAME_ID};
use crate::storage::StorageKey;

/// Records per physical partition.
pub const PARTITION_RECORD_COUNT: u64 = 1 << PARTITION_BITS;

const PARTITION_BITS: u32 = 12;
const POSITION_MASK: u64 = PARTITION_RECORD_COUNT - 1;

/// Physical partition index and position of an offset.
pub fn split(offset: u64) -> (u64, u16) {
    (offset >> PARTITION_BITS, (offset & POSITION_MASK) as u16)
}

/// Clustering key of a position inside a physical partition.
pub fn cc(position: u16) -> Vec<u8> {
    position.to_be_bytes().to_vec()
}

/// Position encoded in a clustering key.
pub fn position(cc: &[u8]) -> Option<u16> {
    let bytes: [u8; 2] = cc.try_into().ok()?;
    Some(u16::from_be_bytes(bytes))
}

pub fn plog_pk(partition: PartitionId, index: u64) -> Vec<u8> {
    let mut pk = Vec::with_capacity(12);
    pk.extend_from_slice(&PLOG_QNAME_ID.to_be_bytes());
    pk.extend_from_slice(&partition.to_be_bytes());
    pk.extend_from_slice(&index.to_be_bytes());
    pk
}

pub fn wlog_pk(workspace: WorkspaceId, index: u64) -> Vec<u8> {
    let mut pk = Vec::with_capacity(18);
    pk.extend_from_slice(&WLOG_QNAME_ID.to_be_bytes());
    pk.extend_from_slice(&workspace.to_be_bytes());
    pk.extend_from_slice(&index.to_be_bytes());
    pk
}

pub fn plog_key(partition: PartitionId, offset: Offset) -> StorageKey {
    let (index, pos) = split(offset);
    StorageKey::new(plog_pk(partition, index), cc(pos))
}

pub fn wlog_key(workspace: WorkspaceId, offset: Offset) -> StorageKey {
    let (index, pos) = split(offset);
    StorageKey::new(wlog_pk(workspace, index), cc(pos))
}

pub fn record_key(workspace: WorkspaceId, id: RecordId) -> StorageKey {
    let (index, pos) = split(id.value());
    let mut pk = Vec::with_capacity(18);
    pk.extend_from_slice(&RECORDS_QNAME_ID.to_be_bytes());
    pk.extend_from_slice(&workspace.to_be_bytes());
    pk.extend_from_slice(&index.to_be_bytes());
    StorageKey::new(pk, cc(pos))
}
