//! In-memory storage backend

use std::collections::BTreeMap;
use std::ops::{Bound, ControlFlow};
use std::sync::RwLock;

use super::backend::StorageBackend;
use super::errors::{StorageError, StorageResult};

type Partition = BTreeMap<Vec<u8>, Vec<u8>>;

/// Ordered in-memory key-value store.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    data: RwLock<BTreeMap<Vec<u8>, Partition>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.data
            .read()
            .map(|d| d.values().map(BTreeMap::len).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overwrites a stored value without any checks. Used to simulate
    /// media corruption.
    pub fn corrupt(&self, pk: &[u8], cc: &[u8], f: impl FnOnce(&mut Vec<u8>)) -> bool {
        match self.data.write() {
            Ok(mut data) => match data.get_mut(pk).and_then(|p| p.get_mut(cc)) {
                Some(value) => {
                    f(value);
                    true
                }
                None => false,
            },
            Err(_) => false,
        }
    }
}

fn bound(key: Option<&[u8]>) -> Bound<Vec<u8>> {
    match key {
        Some(k) => Bound::Included(k.to_vec()),
        None => Bound::Unbounded,
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, pk: &[u8], cc: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let data = self
            .data
            .read()
            .map_err(|_| StorageError::poisoned("memory"))?;
        Ok(data.get(pk).and_then(|p| p.get(cc)).cloned())
    }

    fn put(&self, pk: &[u8], cc: &[u8], value: &[u8]) -> StorageResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|_| StorageError::poisoned("memory"))?;
        data.entry(pk.to_vec())
            .or_default()
            .insert(cc.to_vec(), value.to_vec());
        Ok(())
    }

    fn insert_if_not_exists(&self, pk: &[u8], cc: &[u8], value: &[u8]) -> StorageResult<bool> {
        let mut data = self
            .data
            .write()
            .map_err(|_| StorageError::poisoned("memory"))?;
        let partition = data.entry(pk.to_vec()).or_default();
        if partition.contains_key(cc) {
            return Ok(false);
        }
        partition.insert(cc.to_vec(), value.to_vec());
        Ok(true)
    }

    fn read_range(
        &self,
        pk: &[u8],
        from: Option<&[u8]>,
        to: Option<&[u8]>,
        visit: &mut dyn FnMut(&[u8], &[u8]) -> ControlFlow<()>,
    ) -> StorageResult<()> {
        let data = self
            .data
            .read()
            .map_err(|_| StorageError::poisoned("memory"))?;
        let Some(partition) = data.get(pk) else {
            return Ok(());
        };
        if let (Some(f), Some(t)) = (from, to) {
            if f > t {
                return Ok(());
            }
        }
        for (cc, value) in partition.range((bound(from), bound(to))) {
            if visit(cc, value).is_break() {
                break;
            }
        }
        Ok(())
    }
}
