//! Codec versions
//!
//! Byte layouts of released versions never change:
//! - V0: system fields are derived from the type kind; the active flag is a byte
//! - V1: a system-field mask precedes the system fields; inactive is a mask bit
//! - V2: change-set entries carry the list of emptied field indexes

use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::{CodecError, CodecResult};

/// Binary codec version, stored as the leading byte of every encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum CodecVersion {
    V0 = 0x00,
    V1 = 0x01,
    V2 = 0x02,
}

impl CodecVersion {
    /// Version written by default.
    pub const LATEST: CodecVersion = CodecVersion::V2;

    pub fn from_byte(byte: u8) -> CodecResult<Self> {
        match byte {
            0x00 => Ok(CodecVersion::V0),
            0x01 => Ok(CodecVersion::V1),
            0x02 => Ok(CodecVersion::V2),
            other => Err(CodecError::unknown_version(other)),
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Whether rows carry an explicit system-field mask.
    pub fn has_sys_mask(self) -> bool {
        self >= CodecVersion::V1
    }

    /// Whether change-set entries carry emptied field indexes.
    pub fn has_emptied_fields(self) -> bool {
        self >= CodecVersion::V2
    }
}

impl Default for CodecVersion {
    fn default() -> Self {
        Self::LATEST
    }
}

impl fmt::Display for CodecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.as_byte())
    }
}

impl TryFrom<u8> for CodecVersion {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_byte(value)
    }
}

impl From<CodecVersion> for u8 {
    fn from(version: CodecVersion) -> Self {
        version.as_byte()
    }
}
