//! Codec error types
//!
//! Error codes:
//! - AERO_CODEC_UNEXPECTED_EOF (ERROR severity)
//! - AERO_CODEC_UNKNOWN_VERSION (ERROR severity)
//! - AERO_CODEC_UNKNOWN_NAME (ERROR severity)
//! - AERO_CODEC_MALFORMED (ERROR severity)
//! - AERO_CODEC_OVERFLOW (FATAL severity)

use std::fmt;

use crate::names::NamesError;

/// Severity levels for codec errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The input is rejected
    Error,
    /// The value cannot be represented; the caller has a bug
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

/// Codec-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecErrorCode {
    /// Input ended before the value was complete
    AeroCodecUnexpectedEof,
    /// Leading version byte is not a known codec version
    AeroCodecUnknownVersion,
    /// A name or name id is missing from the name tables
    AeroCodecUnknownName,
    /// Input is structurally invalid or not canonical
    AeroCodecMalformed,
    /// A count or length does not fit its encoded width
    AeroCodecOverflow,
}

impl CodecErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            CodecErrorCode::AeroCodecUnexpectedEof => "AERO_CODEC_UNEXPECTED_EOF",
            CodecErrorCode::AeroCodecUnknownVersion => "AERO_CODEC_UNKNOWN_VERSION",
            CodecErrorCode::AeroCodecUnknownName => "AERO_CODEC_UNKNOWN_NAME",
            CodecErrorCode::AeroCodecMalformed => "AERO_CODEC_MALFORMED",
            CodecErrorCode::AeroCodecOverflow => "AERO_CODEC_OVERFLOW",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            CodecErrorCode::AeroCodecOverflow => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for CodecErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Codec error with context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecError {
    code: CodecErrorCode,
    message: String,
    details: Option<String>,
}

impl CodecError {
    pub fn unexpected_eof(offset: usize, needed: usize) -> Self {
        Self {
            code: CodecErrorCode::AeroCodecUnexpectedEof,
            message: format!("unexpected end of input, {} more bytes needed", needed),
            details: Some(format!("byte_offset: {}", offset)),
        }
    }

    pub fn unknown_version(version: u8) -> Self {
        Self {
            code: CodecErrorCode::AeroCodecUnknownVersion,
            message: format!("unknown codec version {:#04x}", version),
            details: None,
        }
    }

    pub fn unknown_name(source: NamesError) -> Self {
        Self {
            code: CodecErrorCode::AeroCodecUnknownName,
            message: source.to_string(),
            details: None,
        }
    }

    pub fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        Self {
            code: CodecErrorCode::AeroCodecMalformed,
            message: reason.into(),
            details: Some(format!("byte_offset: {}", offset)),
        }
    }

    /// A value that cannot be encoded at all.
    pub fn unencodable(reason: impl Into<String>) -> Self {
        Self {
            code: CodecErrorCode::AeroCodecMalformed,
            message: reason.into(),
            details: None,
        }
    }

    pub fn overflow(what: impl fmt::Display, count: usize, max: usize) -> Self {
        Self {
            code: CodecErrorCode::AeroCodecOverflow,
            message: format!("{} count {} exceeds maximum {}", what, count, max),
            details: None,
        }
    }

    pub fn code(&self) -> CodecErrorCode {
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
}

impl fmt::Display for CodecError {
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

impl std::error::Error for CodecError {}

impl From<NamesError> for CodecError {
    fn from(source: NamesError) -> Self {
        Self::unknown_name(source)
    }
}

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;
