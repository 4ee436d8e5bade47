//! Append-only file backend
//!
//! Values are appended to `<data_dir>/data/kv.dat` with fsync after every
//! write; the latest record for a key wins. An in-memory index is rebuilt
//! by scanning the file on open. Any checksum failure during the scan
//! aborts the open.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use super::backend::StorageBackend;
use super::errors::{StorageError, StorageResult};
use super::memory::MemoryBackend;
use super::record::KvRecord;

/// Durable key-value store backed by a single append-only file.
pub struct FileBackend {
    path: PathBuf,
    /// Serializes appends; holds the file handle
    file: Mutex<File>,
    index: MemoryBackend,
}

impl FileBackend {
    /// Opens or creates `<data_dir>/data/kv.dat`.
    pub fn open(data_dir: &Path) -> StorageResult<Self> {
        let data_subdir = data_dir.join("data");
        let path = data_subdir.join("kv.dat");

        if !data_subdir.exists() {
            fs::create_dir_all(&data_subdir).map_err(|e| {
                StorageError::io(
                    format!("Failed to create data directory: {}", data_subdir.display()),
                    e,
                )
            })?;
        }

        let index = MemoryBackend::new();
        let records = Self::scan(&path, &index)?;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                StorageError::write(
                    format!("Failed to open storage file: {}", path.display()),
                    e,
                )
            })?;

        debug!(path = %path.display(), records, "storage file opened");

        Ok(Self {
            path,
            file: Mutex::new(file),
            index,
        })
    }

    /// Replays every record of the file into the index.
    fn scan(path: &Path, index: &MemoryBackend) -> StorageResult<usize> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(StorageError::io("Failed to read storage file", e)),
        };

        let mut offset = 0usize;
        let mut count = 0usize;
        while offset < data.len() {
            let (record, consumed) = KvRecord::deserialize(&data[offset..])
                .map_err(|e| StorageError::corrupt_frame(offset as u64, e.to_string()))?;
            index.put(&record.pk, &record.cc, &record.value)?;
            offset += consumed;
            count += 1;
        }
        Ok(count)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(file: &mut File, pk: &[u8], cc: &[u8], value: &[u8]) -> StorageResult<()> {
        let bytes = KvRecord::new(pk, cc, value)
            .serialize()
            .map_err(|e| StorageError::write("Failed to serialize record", e))?;

        file.write_all(&bytes)
            .map_err(|e| StorageError::write("Failed to append record", e))?;

        file.sync_all()
            .map_err(|e| StorageError::write("fsync failed after append", e))
    }
}

impl StorageBackend for FileBackend {
    fn get(&self, pk: &[u8], cc: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.index.get(pk, cc)
    }

    fn put(&self, pk: &[u8], cc: &[u8], value: &[u8]) -> StorageResult<()> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| StorageError::poisoned("file"))?;
        Self::append(&mut file, pk, cc, value)?;
        self.index.put(pk, cc, value)
    }

    fn insert_if_not_exists(&self, pk: &[u8], cc: &[u8], value: &[u8]) -> StorageResult<bool> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| StorageError::poisoned("file"))?;
        if self.index.get(pk, cc)?.is_some() {
            return Ok(false);
        }
        Self::append(&mut file, pk, cc, value)?;
        self.index.put(pk, cc, value)?;
        Ok(true)
    }

    fn read_range(
        &self,
        pk: &[u8],
        from: Option<&[u8]>,
        to: Option<&[u8]>,
        visit: &mut dyn FnMut(&[u8], &[u8]) -> ControlFlow<()>,
    ) -> StorageResult<()> {
        self.index.read_range(pk, from, to, visit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileBackend::open(temp_dir.path()).unwrap();
        assert!(store.path().exists());
        assert!(temp_dir.path().join("data").exists());
    }

    #[test]
    fn test_values_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = FileBackend::open(temp_dir.path()).unwrap();
            store.put(b"pk", b"a", b"first").unwrap();
            store.put(b"pk", b"a", b"second").unwrap();
            assert!(store.insert_if_not_exists(b"pk", b"b", b"x").unwrap());
        }

        let store = FileBackend::open(temp_dir.path()).unwrap();
        // latest record wins
        assert_eq!(store.get(b"pk", b"a").unwrap(), Some(b"second".to_vec()));
        assert_eq!(store.get(b"pk", b"b").unwrap(), Some(b"x".to_vec()));
        assert!(!store.insert_if_not_exists(b"pk", b"b", b"y").unwrap());
    }

    #[test]
    fn test_corrupted_file_aborts_open() {
        let temp_dir = TempDir::new().unwrap();
        let path = {
            let store = FileBackend::open(temp_dir.path()).unwrap();
            store.put(b"pk", b"a", b"value").unwrap();
            store.path().to_path_buf()
        };

        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 6;
        bytes[last] ^= 0xFF;
        fs::write(&path, bytes).unwrap();

        let err = FileBackend::open(temp_dir.path()).err().unwrap();
        assert!(err.is_corruption());
        assert!(err.to_string().contains("file offset 0"));
    }
}
