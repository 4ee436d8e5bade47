//! Key-value storage backend interface
//!
//! Values are addressed by a partition key and a clustering key. Within one
//! partition key, clustering keys are ordered bytewise. Only single-key
//! writes are atomic.

use std::ops::ControlFlow;

use super::errors::StorageResult;

/// Partition key and clustering key of one value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StorageKey {
    pub pk: Vec<u8>,
    pub cc: Vec<u8>,
}

impl StorageKey {
    pub fn new(pk: Vec<u8>, cc: Vec<u8>) -> Self {
        Self { pk, cc }
    }
}

/// Byte-oriented key-value store.
pub trait StorageBackend: Send + Sync {
    fn get(&self, pk: &[u8], cc: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Reads several keys; results are in request order.
    fn get_batch(&self, keys: &[StorageKey]) -> StorageResult<Vec<Option<Vec<u8>>>> {
        keys.iter().map(|k| self.get(&k.pk, &k.cc)).collect()
    }

    fn put(&self, pk: &[u8], cc: &[u8], value: &[u8]) -> StorageResult<()>;

    /// Writes several values. Each write is atomic, the batch is not.
    fn put_batch(&self, items: &[(StorageKey, Vec<u8>)]) -> StorageResult<()> {
        for (key, value) in items {
            self.put(&key.pk, &key.cc, value)?;
        }
        Ok(())
    }

    /// Writes the value only if the key is vacant. Returns false if it was occupied.
    fn insert_if_not_exists(&self, pk: &[u8], cc: &[u8], value: &[u8]) -> StorageResult<bool>;

    /// Visits values of one partition key with clustering keys in
    /// `[from, to]` (bounds inclusive, `None` unbounded) in key order.
    fn read_range(
        &self,
        pk: &[u8],
        from: Option<&[u8]>,
        to: Option<&[u8]>,
        visit: &mut dyn FnMut(&[u8], &[u8]) -> ControlFlow<()>,
    ) -> StorageResult<()>;
}
