//! RecordId - 64-bit record identity with reserved ranges
//!
//! Layout of the identifier space:
//! - 0: null
//! - 1..=0xFFFF: raw identifiers, local to the event proposing them
//! - 0x1_0000..=0x1_01FF: singleton documents
//! - up to 0x1_FFFF: reserved
//! - 0x2_0000 and above: identifiers issued by the generator

use std::fmt;

use serde::{Deserialize, Serialize};

/// A record identifier.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    pub const NULL: RecordId = RecordId(0);
    pub const MIN_RAW: RecordId = RecordId(1);
    pub const MAX_RAW: RecordId = RecordId(0xFFFF);
    pub const FIRST_SINGLETON: RecordId = RecordId(0x1_0000);
    pub const MAX_SINGLETON: RecordId = RecordId(0x1_01FF);
    pub const MAX_RESERVED: RecordId = RecordId(0x1_FFFF);
    pub const FIRST_USER: RecordId = RecordId(0x2_0000);

    #[inline]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[inline]
    pub const fn value(&self) -> u64 {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Raw identifiers are meaningless outside the event that proposed them.
    pub fn is_raw(&self) -> bool {
        *self >= Self::MIN_RAW && *self <= Self::MAX_RAW
    }

    pub fn is_singleton(&self) -> bool {
        *self >= Self::FIRST_SINGLETON && *self <= Self::MAX_SINGLETON
    }

    /// Identifiers that may be issued by an identifier generator.
    pub fn is_user(&self) -> bool {
        *self >= Self::FIRST_USER
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RecordId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<RecordId> for u64 {
    fn from(id: RecordId) -> Self {
        id.0
    }
}
