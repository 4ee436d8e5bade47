//! On-disk key-value record
//!
//! ```text
//! +------------------+
//! | Record Length    | (u32 LE)
//! +------------------+
//! | Partition Key    | (u16 LE length-prefixed bytes)
//! +------------------+
//! | Clustering Key   | (u16 LE length-prefixed bytes)
//! +------------------+
//! | Value            | (u32 LE length-prefixed bytes)
//! +------------------+
//! | Checksum         | (u32 LE)
//! +------------------+
//! ```
//!
//! Checksum covers all bytes except the checksum itself.

use std::io::{self, Read};

use super::checksum::compute_checksum;

/// Smallest possible record: length + two empty keys + empty value + checksum.
pub const MIN_RECORD_SIZE: usize = 4 + 2 + 2 + 4 + 4;

/// One stored key-value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvRecord {
    pub pk: Vec<u8>,
    pub cc: Vec<u8>,
    pub value: Vec<u8>,
}

impl KvRecord {
    pub fn new(pk: &[u8], cc: &[u8], value: &[u8]) -> Self {
        Self {
            pk: pk.to_vec(),
            cc: cc.to_vec(),
            value: value.to_vec(),
        }
    }

    /// Serialize the complete record to bytes.
    ///
    /// Keys longer than `u16::MAX` bytes or values longer than `u32::MAX`
    /// bytes are rejected.
    pub fn serialize(&self) -> io::Result<Vec<u8>> {
        if self.pk.len() > u16::MAX as usize || self.cc.len() > u16::MAX as usize {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "Key too long"));
        }
        let record_length = MIN_RECORD_SIZE + self.pk.len() + self.cc.len() + self.value.len();
        let record_length = u32::try_from(record_length)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "Value too long"))?;

        let mut record = Vec::with_capacity(record_length as usize);
        record.extend_from_slice(&record_length.to_le_bytes());
        record.extend_from_slice(&(self.pk.len() as u16).to_le_bytes());
        record.extend_from_slice(&self.pk);
        record.extend_from_slice(&(self.cc.len() as u16).to_le_bytes());
        record.extend_from_slice(&self.cc);
        record.extend_from_slice(&(self.value.len() as u32).to_le_bytes());
        record.extend_from_slice(&self.value);

        let checksum = compute_checksum(&record);
        record.extend_from_slice(&checksum.to_le_bytes());

        Ok(record)
    }

    /// Deserialize a record from bytes, verifying checksum.
    ///
    /// Returns the record and the number of bytes consumed.
    pub fn deserialize(data: &[u8]) -> io::Result<(Self, usize)> {
        if data.len() < MIN_RECORD_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Record too short",
            ));
        }

        let record_length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if record_length < MIN_RECORD_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid record length: {}", record_length),
            ));
        }
        if data.len() < record_length {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "Incomplete record: expected {} bytes, got {}",
                    record_length,
                    data.len()
                ),
            ));
        }

        let checksum_offset = record_length - 4;
        let stored = u32::from_le_bytes([
            data[checksum_offset],
            data[checksum_offset + 1],
            data[checksum_offset + 2],
            data[checksum_offset + 3],
        ]);
        let computed = compute_checksum(&data[..checksum_offset]);
        if stored != computed {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Checksum mismatch: stored {:#010x}, computed {:#010x}",
                    stored, computed
                ),
            ));
        }

        let mut cursor = io::Cursor::new(&data[4..checksum_offset]);
        let pk = read_bytes_u16(&mut cursor)?;
        let cc = read_bytes_u16(&mut cursor)?;
        let value = read_bytes_u32(&mut cursor)?;

        if cursor.position() as usize != checksum_offset - 4 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Record length does not match contents",
            ));
        }

        Ok((Self { pk, cc, value }, record_length))
    }
}

fn read_bytes_u16<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 2];
    reader.read_exact(&mut len_buf)?;
    let mut bytes = vec![0u8; u16::from_le_bytes(len_buf) as usize];
    reader.read_exact(&mut bytes)?;
    Ok(bytes)
}

fn read_bytes_u32<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let mut bytes = vec![0u8; u32::from_le_bytes(len_buf) as usize];
    reader.read_exact(&mut bytes)?;
    Ok(bytes)
}
