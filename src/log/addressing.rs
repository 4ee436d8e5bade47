//! Log range addressing
//!
//! Splits a logical offset range into per-partition clustering-key
//! ranges. Only the first partition gets a lower bound and only the last
//! partition gets an upper bound; partitions between them are read in
//! full.

use tokio_util::sync::CancellationToken;

use super::errors::{LogError, LogResult};
use super::keys::split;

/// Count meaning "until the log ends".
pub const READ_TO_THE_END: i64 = i64::MAX;

/// Clustering range inside one physical partition. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionRange {
    pub index: u64,
    pub min_cc: Option<u16>,
    pub max_cc: Option<u16>,
}

/// Whether a range read goes on to the next partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadFlow {
    Continue,
    Stop,
}

/// Visits the partition ranges covering `count` offsets from `offset`.
///
/// A count of zero or less reads nothing. A callback returning the
/// end-of-log error ends the read successfully; any other error is
/// returned as is.
pub fn read_partitioned<F>(
    offset: u64,
    count: i64,
    cancel: &CancellationToken,
    mut visit: F,
) -> LogResult<()>
where
    F: FnMut(PartitionRange) -> LogResult<ReadFlow>,
{
    if count <= 0 {
        return Ok(());
    }

    let to_end = count == READ_TO_THE_END;
    let last = if to_end {
        u64::MAX
    } else {
        offset.saturating_add(count as u64 - 1)
    };
    let (first_index, first_pos) = split(offset);
    let (last_index, last_pos) = split(last);

    let mut index = first_index;
    loop {
        if cancel.is_cancelled() {
            return Err(LogError::cancelled(index));
        }
        let range = PartitionRange {
            index,
            min_cc: (index == first_index).then_some(first_pos),
            max_cc: (index == last_index && !to_end).then_some(last_pos),
        };
        match visit(range) {
            Ok(ReadFlow::Continue) => {}
            Ok(ReadFlow::Stop) => return Ok(()),
            Err(e) if e.is_end_of_log() => return Ok(()),
            Err(e) => return Err(e),
        }
        if index == last_index {
            return Ok(());
        }
        index += 1;
    }
}
