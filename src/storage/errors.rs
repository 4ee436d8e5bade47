//! Storage errors
//!
//! Codes:
//! - AERO_KV_IO (ERROR): the data file could not be opened or read
//! - AERO_KV_WRITE (ERROR): an append or its fsync failed
//! - AERO_KV_POISONED (ERROR): a backend lock was poisoned by a panic
//! - AERO_KV_CORRUPTION (FATAL): a stored value or log frame fails verification

use std::fmt;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The call fails, the backend stays usable
    Error,
    /// Stored bytes can no longer be trusted
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorCode {
    AeroKvIo,
    AeroKvWrite,
    AeroKvPoisoned,
    AeroKvCorruption,
}

impl StorageErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            StorageErrorCode::AeroKvIo => "AERO_KV_IO",
            StorageErrorCode::AeroKvWrite => "AERO_KV_WRITE",
            StorageErrorCode::AeroKvPoisoned => "AERO_KV_POISONED",
            StorageErrorCode::AeroKvCorruption => "AERO_KV_CORRUPTION",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            StorageErrorCode::AeroKvCorruption => Severity::Fatal,
            StorageErrorCode::AeroKvIo
            | StorageErrorCode::AeroKvWrite
            | StorageErrorCode::AeroKvPoisoned => Severity::Error,
        }
    }
}

impl fmt::Display for StorageErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Backend failure with the key or file position it concerns.
#[derive(Debug)]
pub struct StorageError {
    code: StorageErrorCode,
    message: String,
    details: Option<String>,
    source: Option<io::Error>,
}

impl StorageError {
    fn with_code(code: StorageErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            source: Some(source),
            ..Self::with_code(StorageErrorCode::AeroKvIo, message)
        }
    }

    pub fn write(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            source: Some(source),
            ..Self::with_code(StorageErrorCode::AeroKvWrite, message)
        }
    }

    /// A lock of the named backend was poisoned.
    pub fn poisoned(backend: &str) -> Self {
        Self::with_code(
            StorageErrorCode::AeroKvPoisoned,
            format!("{} backend lock poisoned", backend),
        )
    }

    /// A sealed value failed verification.
    pub fn corrupt_value(reason: impl Into<String>) -> Self {
        Self::with_code(StorageErrorCode::AeroKvCorruption, reason)
    }

    /// A frame of the data file failed verification.
    pub fn corrupt_frame(file_offset: u64, reason: impl Into<String>) -> Self {
        Self {
            details: Some(format!("file offset {}", file_offset)),
            ..Self::with_code(StorageErrorCode::AeroKvCorruption, reason)
        }
    }

    /// Attaches the key the failing call was made for.
    pub fn for_key(mut self, pk: &[u8], cc: &[u8]) -> Self {
        let key = format!("pk {:02x?} cc {:02x?}", pk, cc);
        self.details = Some(match self.details.take() {
            Some(details) => format!("{}, {}", details, key),
            None => key,
        });
        self
    }

    pub fn code(&self) -> StorageErrorCode {
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

    pub fn is_corruption(&self) -> bool {
        self.code == StorageErrorCode::AeroKvCorruption
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.code, self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
