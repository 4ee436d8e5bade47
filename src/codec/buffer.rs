//! Little-endian byte writer and bounds-checked reader

use super::errors::{CodecError, CodecResult};

/// Growable little-endian output buffer.
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuses an existing allocation; the buffer is cleared.
    pub fn with_buffer(mut buf: Vec<u8>) -> Self {
        buf.clear();
        Self { buf }
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn put_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes bytes prefixed with a u16 length.
    pub fn put_bytes16(&mut self, bytes: &[u8]) -> CodecResult<()> {
        let len = u16::try_from(bytes.len())
            .map_err(|_| CodecError::overflow("byte length", bytes.len(), u16::MAX as usize))?;
        self.put_u16(len);
        self.put_raw(bytes);
        Ok(())
    }

    /// Writes bytes prefixed with a u32 length.
    pub fn put_bytes32(&mut self, bytes: &[u8]) -> CodecResult<()> {
        let len = u32::try_from(bytes.len())
            .map_err(|_| CodecError::overflow("byte length", bytes.len(), u32::MAX as usize))?;
        self.put_u32(len);
        self.put_raw(bytes);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over encoded bytes. Every read is bounds-checked.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    /// Offset of `data` within the outermost input, for error reports
    base: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            base: 0,
        }
    }

    /// Absolute offset of the next byte.
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn take(&mut self, n: usize) -> CodecResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(CodecError::unexpected_eof(
                self.offset(),
                n - self.remaining(),
            ));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Splits off a reader over the next `n` bytes.
    pub fn sub_reader(&mut self, n: usize) -> CodecResult<ByteReader<'a>> {
        let base = self.offset();
        let data = self.take(n)?;
        Ok(ByteReader { data, pos: 0, base })
    }

    fn array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let slice = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    pub fn get_u8(&mut self) -> CodecResult<u8> {
        Ok(self.array::<1>()?[0])
    }

    pub fn get_u16(&mut self) -> CodecResult<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub fn get_u32(&mut self) -> CodecResult<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub fn get_u64(&mut self) -> CodecResult<u64> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    pub fn get_i32(&mut self) -> CodecResult<i32> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    pub fn get_i64(&mut self) -> CodecResult<i64> {
        Ok(i64::from_le_bytes(self.array()?))
    }

    /// Reads a strict boolean byte: 0 or 1.
    pub fn get_bool(&mut self) -> CodecResult<bool> {
        let offset = self.offset();
        match self.get_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::malformed(
                offset,
                format!("invalid boolean byte {:#04x}", other),
            )),
        }
    }

    pub fn get_bytes16(&mut self) -> CodecResult<&'a [u8]> {
        let len = self.get_u16()? as usize;
        self.take(len)
    }

    pub fn get_bytes32(&mut self) -> CodecResult<&'a [u8]> {
        let len = self.get_u32()? as usize;
        self.take(len)
    }

    pub fn get_string16(&mut self) -> CodecResult<String> {
        let offset = self.offset();
        let bytes = self.get_bytes16()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| CodecError::malformed(offset, format!("invalid UTF-8: {}", e)))
    }

    pub fn get_string32(&mut self) -> CodecResult<String> {
        let offset = self.offset();
        let bytes = self.get_bytes32()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| CodecError::malformed(offset, format!("invalid UTF-8: {}", e)))
    }

    /// Fails if any input is left.
    pub fn expect_end(&self) -> CodecResult<()> {
        if !self.is_empty() {
            return Err(CodecError::malformed(
                self.offset(),
                format!("{} trailing bytes", self.remaining()),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecErrorCode;

    #[test]
    fn test_write_read_primitives() {
        let mut w = ByteWriter::new();
        w.put_u8(7);
        w.put_u16(0x1234);
        w.put_u64(u64::MAX - 1);
        w.put_i64(-5);
        w.put_bytes16(b"abc").unwrap();
        let bytes = w.into_inner();
        assert_eq!(&bytes[1..3], &[0x34, 0x12]);

        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.get_u8().unwrap(), 7);
        assert_eq!(r.get_u16().unwrap(), 0x1234);
        assert_eq!(r.get_u64().unwrap(), u64::MAX - 1);
        assert_eq!(r.get_i64().unwrap(), -5);
        assert_eq!(r.get_bytes16().unwrap(), b"abc");
        r.expect_end().unwrap();
    }

    #[test]
    fn test_truncated_read_fails() {
        let mut r = ByteReader::new(&[1, 2, 3]);
        let err = r.get_u32().unwrap_err();
        assert_eq!(err.code(), CodecErrorCode::AeroCodecUnexpectedEof);
    }

    #[test]
    fn test_strict_bool() {
        let mut r = ByteReader::new(&[0, 1, 2]);
        assert!(!r.get_bool().unwrap());
        assert!(r.get_bool().unwrap());
        assert_eq!(r.get_bool().unwrap_err().code(), CodecErrorCode::AeroCodecMalformed);
    }

    #[test]
    fn test_sub_reader_offsets() {
        let data = [9, 9, 1, 2, 3];
        let mut r = ByteReader::new(&data);
        r.take(2).unwrap();
        let mut sub = r.sub_reader(2).unwrap();
        assert_eq!(sub.offset(), 2);
        sub.get_u8().unwrap();
        let err = sub.get_u16().unwrap_err();
        assert!(err.to_string().contains("byte_offset: 3"));
        assert_eq!(r.remaining(), 1);
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let r = ByteReader::new(&[0]);
        assert!(r.expect_end().is_err());
    }
}
