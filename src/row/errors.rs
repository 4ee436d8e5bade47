//! Field errors
//!
//! Field errors are collected while a row is written and reported once,
//! joined, when the row is built.

use std::fmt;

use thiserror::Error;

use crate::appdef::QName;

/// A single field write or build failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("unknown type '{qname}'")]
    UnknownType { qname: QName },

    #[error("field '{field}' is not defined in '{type_name}'")]
    UnknownField { type_name: QName, field: String },

    #[error("field '{field}': expected {expected} value, got {actual}")]
    WrongKind {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("field '{field}': value length {len} exceeds maximum {max}")]
    TooLong { field: String, max: usize, len: usize },

    /// The type kind does not carry the system field
    #[error("system field '{field}' does not apply to '{type_name}'")]
    NotApplicable { type_name: QName, field: String },

    #[error("field '{field}' is read-only")]
    ReadOnly { field: String },

    #[error("system field '{field}' cannot be changed")]
    SysFieldImmutable { field: String },

    #[error("field '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("container '{container}' is not defined in '{type_name}'")]
    UnknownContainer { type_name: QName, container: String },

    #[error("'{type_name}' has {count} children, at most 65535 allowed")]
    TooManyChildren { type_name: QName, count: usize },
}

/// Flattening aggregate of field errors. The same error is kept once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    errors: Vec<FieldError>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: FieldError) {
        if !self.errors.contains(&error) {
            self.errors.push(error);
        }
    }

    /// Merges another aggregate into this one.
    pub fn extend(&mut self, other: FieldErrors) {
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

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }

    /// Returns `Ok` if no error was collected.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<FieldError> for FieldErrors {
    fn from(error: FieldError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl fmt::Display for FieldErrors {
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

impl std::error::Error for FieldErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_reported_once() {
        let mut errors = FieldErrors::new();
        let e = FieldError::ReadOnly {
            field: "sys.QName".to_string(),
        };
        errors.push(e.clone());
        errors.push(e.clone());

        let mut other = FieldErrors::from(e);
        other.push(FieldError::SysFieldImmutable {
            field: "sys.ID".to_string(),
        });
        errors.extend(other);

        assert_eq!(errors.len(), 2);
        let text = errors.to_string();
        assert!(text.contains("sys.QName"));
        assert!(text.contains("sys.ID"));
        assert_eq!(text.matches("; ").count(), 1);
    }

    #[test]
    fn test_into_result() {
        assert!(FieldErrors::new().into_result().is_ok());
        assert!(FieldErrors::from(FieldError::UnknownType {
            qname: QName::new("test", "X")
        })
        .into_result()
        .is_err());
    }
}
