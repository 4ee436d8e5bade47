//! Event validation errors
//!
//! Validation errors are the only errors callers are expected to branch
//! on. Each carries a stable numeric value and a string code:
//! - AERO_VALIDATION_EMPTY_NAME (1)
//! - AERO_VALIDATION_EMPTY_DATA (2)
//! - AERO_VALIDATION_INVALID_NAME (3)
//! - AERO_VALIDATION_INVALID_TYPE (4)
//! - AERO_VALIDATION_INVALID_RECORD_ID (5)
//! - AERO_VALIDATION_INVALID_REF_RECORD_ID (6)
//! - AERO_VALIDATION_INVALID_OCCURS_MIN (7)
//! - AERO_VALIDATION_INVALID_OCCURS_MAX (8)
//! - AERO_VALIDATION_INVALID_CHILD (9)
//! - AERO_VALIDATION_UNIQUE_VIOLATION (10)
//! - AERO_VALIDATION_INVALID_DATA (11)

use std::fmt;

/// Machine-readable validation failure class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValidationCode {
    /// Command name is missing
    EmptyName = 1,
    /// A required field has no value
    EmptyData = 2,
    /// Command name is not defined
    InvalidName = 3,
    /// A type has the wrong kind for its position
    InvalidType = 4,
    /// An identifier is out of range or used twice
    InvalidRecordId = 5,
    /// A reference names no raw identifier of an allowed type
    InvalidRefRecordId = 6,
    /// A container holds fewer children than required
    InvalidOccursMin = 7,
    /// A container holds more children than allowed
    InvalidOccursMax = 8,
    /// A child does not fit its container
    InvalidChild = 9,
    /// A unique value or singleton already exists
    UniqueViolation = 10,
    /// Field values failed to build
    InvalidData = 11,
}

impl ValidationCode {
    /// Stable numeric value
    pub fn value(&self) -> u8 {
        *self as u8
    }

    /// Stable string code
    pub fn code(&self) -> &'static str {
        match self {
            ValidationCode::EmptyName => "AERO_VALIDATION_EMPTY_NAME",
            ValidationCode::EmptyData => "AERO_VALIDATION_EMPTY_DATA",
            ValidationCode::InvalidName => "AERO_VALIDATION_INVALID_NAME",
            ValidationCode::InvalidType => "AERO_VALIDATION_INVALID_TYPE",
            ValidationCode::InvalidRecordId => "AERO_VALIDATION_INVALID_RECORD_ID",
            ValidationCode::InvalidRefRecordId => "AERO_VALIDATION_INVALID_REF_RECORD_ID",
            ValidationCode::InvalidOccursMin => "AERO_VALIDATION_INVALID_OCCURS_MIN",
            ValidationCode::InvalidOccursMax => "AERO_VALIDATION_INVALID_OCCURS_MAX",
            ValidationCode::InvalidChild => "AERO_VALIDATION_INVALID_CHILD",
            ValidationCode::UniqueViolation => "AERO_VALIDATION_UNIQUE_VIOLATION",
            ValidationCode::InvalidData => "AERO_VALIDATION_INVALID_DATA",
        }
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A single validation failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    code: ValidationCode,
    message: String,
}

impl ValidationError {
    pub fn new(code: ValidationCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ValidationCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validation failures of one event, in detection order, without repeats
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        if !self.errors.contains(&error) {
            self.errors.push(error);
        }
    }

    pub fn add(&mut self, code: ValidationCode, message: impl Into<String>) {
        self.push(ValidationError::new(code, message));
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        for error in other.errors {
            self.push(error);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }

    /// True if any failure has the given code
    pub fn has_code(&self, code: ValidationCode) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Why an event is invalid, plus the raw input it was built from.
///
/// Only the message and raw bytes are persisted; validation details are
/// available on the event that failed, not on events read back.
#[derive(Debug, Clone)]
pub struct BuildError {
    message: String,
    raw_bytes: Vec<u8>,
    validation: ValidationErrors,
}

impl BuildError {
    pub fn new(message: impl Into<String>, raw_bytes: Vec<u8>) -> Self {
        Self {
            message: message.into(),
            raw_bytes,
            validation: ValidationErrors::new(),
        }
    }

    pub(crate) fn from_validation(validation: ValidationErrors, raw_bytes: Vec<u8>) -> Self {
        Self {
            message: validation.to_string(),
            raw_bytes,
            validation,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw_bytes
    }

    pub fn validation(&self) -> &ValidationErrors {
        &self.validation
    }

    pub fn has_code(&self, code: ValidationCode) -> bool {
        self.validation.has_code(code)
    }
}

impl PartialEq for BuildError {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message && self.raw_bytes == other.raw_bytes
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for BuildError {}
