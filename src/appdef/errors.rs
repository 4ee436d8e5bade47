//! Application definition error types
//!
//! Error codes:
//! - AERO_APPDEF_DUPLICATE_TYPE (REJECT)
//! - AERO_APPDEF_UNKNOWN_TYPE (REJECT)
//! - AERO_APPDEF_INVALID_TYPE (REJECT)
//! - AERO_APPDEF_INVALID_UNIQUE (REJECT)
//! - AERO_APPDEF_MALFORMED (FATAL)

use std::fmt;

/// Severity levels for definition errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Definition rejected
    Reject,
    /// Startup must abort
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Definition error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppDefErrorCode {
    /// Type name registered twice
    AeroAppDefDuplicateType,
    /// Reference to an undefined type
    AeroAppDefUnknownType,
    /// Type definition is structurally invalid
    AeroAppDefInvalidType,
    /// Unique field group is invalid
    AeroAppDefInvalidUnique,
    /// Definition file cannot be read or parsed
    AeroAppDefMalformed,
}

impl AppDefErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            AppDefErrorCode::AeroAppDefDuplicateType => "AERO_APPDEF_DUPLICATE_TYPE",
            AppDefErrorCode::AeroAppDefUnknownType => "AERO_APPDEF_UNKNOWN_TYPE",
            AppDefErrorCode::AeroAppDefInvalidType => "AERO_APPDEF_INVALID_TYPE",
            AppDefErrorCode::AeroAppDefInvalidUnique => "AERO_APPDEF_INVALID_UNIQUE",
            AppDefErrorCode::AeroAppDefMalformed => "AERO_APPDEF_MALFORMED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            AppDefErrorCode::AeroAppDefMalformed => Severity::Fatal,
            _ => Severity::Reject,
        }
    }
}

impl fmt::Display for AppDefErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Application definition error with context
#[derive(Debug)]
pub struct AppDefError {
    code: AppDefErrorCode,
    message: String,
    /// Qualified name of the offending type, if any
    type_name: Option<String>,
}

impl AppDefError {
    fn new(code: AppDefErrorCode, message: String, type_name: Option<String>) -> Self {
        Self {
            code,
            message,
            type_name,
        }
    }

    pub fn duplicate_type(type_name: impl fmt::Display) -> Self {
        let name = type_name.to_string();
        Self::new(
            AppDefErrorCode::AeroAppDefDuplicateType,
            format!("Type '{}' is already defined", name),
            Some(name),
        )
    }

    pub fn unknown_type(type_name: impl fmt::Display, referenced_from: impl fmt::Display) -> Self {
        let name = type_name.to_string();
        Self::new(
            AppDefErrorCode::AeroAppDefUnknownType,
            format!("Type '{}' referenced from '{}' is not defined", name, referenced_from),
            Some(name),
        )
    }

    pub fn invalid_type(type_name: impl fmt::Display, reason: impl Into<String>) -> Self {
        let name = type_name.to_string();
        Self::new(
            AppDefErrorCode::AeroAppDefInvalidType,
            format!("Type '{}': {}", name, reason.into()),
            Some(name),
        )
    }

    pub fn invalid_unique(
        type_name: impl fmt::Display,
        unique: &str,
        reason: impl Into<String>,
    ) -> Self {
        let name = type_name.to_string();
        Self::new(
            AppDefErrorCode::AeroAppDefInvalidUnique,
            format!("Type '{}' unique '{}': {}", name, unique, reason.into()),
            Some(name),
        )
    }

    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(
            AppDefErrorCode::AeroAppDefMalformed,
            format!("Malformed definition file '{}': {}", path.into(), reason.into()),
            None,
        )
    }

    /// Returns the error code
    pub fn code(&self) -> AppDefErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the offending type name, if any
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for AppDefError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for AppDefError {}

/// Result type for definition operations
pub type AppDefResult<T> = Result<T, AppDefError>;
