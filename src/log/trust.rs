//! Trust levels
//!
//! Controls whether writes to occupied offsets are rejected:
//!
//! | level | partition log | workspace log | records |
//! |-------|---------------|---------------|---------|
//! | 0     | reject        | reject        | reject  |
//! | 1     | reject        | overwrite     | overwrite |
//! | 2     | overwrite     | overwrite     | overwrite |
//!
//! Level 0 is the production default. Higher levels exist for recovery
//! and migration tools that must rewrite history.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which log a write targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Partition,
    Workspace,
}

impl LogKind {
    pub(crate) fn owner_name(&self) -> &'static str {
        match self {
            LogKind::Partition => "partition",
            LogKind::Workspace => "workspace",
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogKind::Partition => write!(f, "partition log"),
            LogKind::Workspace => write!(f, "workspace log"),
        }
    }
}

/// Offset overwrite policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum TrustLevel {
    /// Every occupied offset and record is protected
    #[default]
    Strict = 0,
    /// Only the partition log is protected
    Replay = 1,
    /// Nothing is protected
    Overwrite = 2,
}

impl TrustLevel {
    /// True if an occupied offset of the given log may be rewritten.
    pub fn allows_log_overwrite(self, log: LogKind) -> bool {
        match log {
            LogKind::Partition => self >= TrustLevel::Overwrite,
            LogKind::Workspace => self >= TrustLevel::Replay,
        }
    }

    /// True if an existing record may be created again.
    pub fn allows_record_overwrite(self) -> bool {
        self >= TrustLevel::Replay
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for TrustLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TrustLevel::Strict),
            1 => Ok(TrustLevel::Replay),
            2 => Ok(TrustLevel::Overwrite),
            other => Err(format!("trust level must be 0, 1 or 2, got {}", other)),
        }
    }
}

impl From<TrustLevel> for u8 {
    fn from(level: TrustLevel) -> Self {
        level.as_u8()
    }
}

impl fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overwrite_matrix() {
        use LogKind::*;
        assert!(!TrustLevel::Strict.allows_log_overwrite(Partition));
        assert!(!TrustLevel::Strict.allows_log_overwrite(Workspace));
        assert!(!TrustLevel::Replay.allows_log_overwrite(Partition));
        assert!(TrustLevel::Replay.allows_log_overwrite(Workspace));
        assert!(TrustLevel::Overwrite.allows_log_overwrite(Partition));
        assert!(TrustLevel::Overwrite.allows_log_overwrite(Workspace));

        assert!(!TrustLevel::Strict.allows_record_overwrite());
        assert!(TrustLevel::Replay.allows_record_overwrite());
    }

    #[test]
    fn test_from_u8() {
        assert_eq!(TrustLevel::try_from(1).unwrap(), TrustLevel::Replay);
        assert!(TrustLevel::try_from(3).is_err());
        let level: TrustLevel = serde_json::from_str("2").unwrap();
        assert_eq!(level, TrustLevel::Overwrite);
    }
}
