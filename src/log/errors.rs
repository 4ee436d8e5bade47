//! Event log error types
//!
//! Error codes:
//! - AERO_LOG_OFFSET_REUSED (FATAL severity)
//! - AERO_LOG_STORAGE (ERROR severity)
//! - AERO_LOG_CODEC (ERROR severity)
//! - AERO_LOG_CANCELLED (ERROR severity)
//! - AERO_LOG_ABORTED (ERROR severity)
//! - AERO_LOG_END_OF_LOG (ERROR severity, swallowed by range reads)

use std::fmt;

use crate::codec::CodecError;
use crate::storage::StorageError;

use super::trust::LogKind;

/// Severity levels for log errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The operation failed; the log is unchanged
    Error,
    /// Sequencing was violated; the writer must stop
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Log-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogErrorCode {
    /// An occupied offset was written again under a strict trust level
    AeroLogOffsetReused,
    /// The storage backend failed
    AeroLogStorage,
    /// An event could not be encoded
    AeroLogCodec,
    /// A read was cancelled
    AeroLogCancelled,
    /// A read callback aborted the read
    AeroLogAborted,
    /// Natural end of the log
    AeroLogEndOfLog,
}

impl LogErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            LogErrorCode::AeroLogOffsetReused => "AERO_LOG_OFFSET_REUSED",
            LogErrorCode::AeroLogStorage => "AERO_LOG_STORAGE",
            LogErrorCode::AeroLogCodec => "AERO_LOG_CODEC",
            LogErrorCode::AeroLogCancelled => "AERO_LOG_CANCELLED",
            LogErrorCode::AeroLogAborted => "AERO_LOG_ABORTED",
            LogErrorCode::AeroLogEndOfLog => "AERO_LOG_END_OF_LOG",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            LogErrorCode::AeroLogOffsetReused => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for LogErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Log error with context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogError {
    code: LogErrorCode,
    message: String,
    details: Option<String>,
}

impl LogError {
    pub fn offset_reused(log: LogKind, owner: u64, offset: u64) -> Self {
        Self {
            code: LogErrorCode::AeroLogOffsetReused,
            message: format!("{} offset {} is already written", log, offset),
            details: Some(format!("{}: {}", log.owner_name(), owner)),
        }
    }

    pub fn storage(source: &StorageError) -> Self {
        Self {
            code: LogErrorCode::AeroLogStorage,
            message: source.to_string(),
            details: None,
        }
    }

    pub fn codec(source: &CodecError) -> Self {
        Self {
            code: LogErrorCode::AeroLogCodec,
            message: source.to_string(),
            details: None,
        }
    }

    pub fn cancelled(partition_index: u64) -> Self {
        Self {
            code: LogErrorCode::AeroLogCancelled,
            message: "log read cancelled".to_string(),
            details: Some(format!("partition_index: {}", partition_index)),
        }
    }

    /// Error a read callback returns to abort the read.
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self {
            code: LogErrorCode::AeroLogAborted,
            message: reason.into(),
            details: None,
        }
    }

    /// Error a read callback returns when the log has no more events.
    pub fn end_of_log() -> Self {
        Self {
            code: LogErrorCode::AeroLogEndOfLog,
            message: "end of log".to_string(),
            details: None,
        }
    }

    pub fn code(&self) -> LogErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    pub fn is_end_of_log(&self) -> bool {
        self.code == LogErrorCode::AeroLogEndOfLog
    }
}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for LogError {}

impl From<StorageError> for LogError {
    fn from(source: StorageError) -> Self {
        Self::storage(&source)
    }
}

impl From<CodecError> for LogError {
    fn from(source: CodecError) -> Self {
        Self::codec(&source)
    }
}

/// Result type for log operations
pub type LogResult<T> = Result<T, LogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_reuse_is_fatal() {
        let err = LogError::offset_reused(LogKind::Partition, 3, 42);
        assert!(err.is_fatal());
        assert_eq!(err.code().code(), "AERO_LOG_OFFSET_REUSED");
        assert_eq!(
            err.to_string(),
            "[FATAL] AERO_LOG_OFFSET_REUSED: partition log offset 42 is already written (partition: 3)"
        );
    }

    #[test]
    fn test_end_of_log_is_recognized() {
        assert!(LogError::end_of_log().is_end_of_log());
        assert!(!LogError::aborted("stop").is_end_of_log());
        assert!(!LogError::cancelled(0).is_fatal());
    }
}
