//! Qualified type names
//!
//! A qualified name is a `package.Entity` pair. The null name (`.`) is a
//! reserved sentinel: a row with the null name carries no fields at all.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Package reserved for system names.
pub const SYS_PACKAGE: &str = "sys";

/// Namespaced identifier naming a document, record, object, view or command.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QName {
    pkg: String,
    entity: String,
}

impl QName {
    /// Creates a qualified name from its parts.
    pub fn new(pkg: impl Into<String>, entity: impl Into<String>) -> Self {
        Self {
            pkg: pkg.into(),
            entity: entity.into(),
        }
    }

    /// The null name.
    pub fn null() -> Self {
        Self::default()
    }

    /// Creates a name in the `sys` package.
    pub fn sys(entity: impl Into<String>) -> Self {
        Self::new(SYS_PACKAGE, entity)
    }

    /// Name substituted for events that failed to build or validate.
    pub fn error() -> Self {
        Self::sys("Error")
    }

    /// Name of events whose stored bytes could not be decoded.
    pub fn corrupted() -> Self {
        Self::sys("Corrupted")
    }

    /// Generic command that only carries a change-set.
    pub fn command_cud() -> Self {
        Self::sys("CUD")
    }

    pub fn pkg(&self) -> &str {
        &self.pkg
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn is_null(&self) -> bool {
        self.pkg.is_empty() && self.entity.is_empty()
    }

    pub fn is_sys(&self) -> bool {
        self.pkg == SYS_PACKAGE
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.pkg, self.entity)
    }
}

/// Returns true if `s` is a valid identifier: a letter or underscore
/// followed by letters, digits or underscores.
pub fn is_valid_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    s.len() <= 255 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl FromStr for QName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "." {
            return Ok(Self::null());
        }
        let (pkg, entity) = s
            .split_once('.')
            .ok_or_else(|| format!("invalid qualified name '{}': missing '.'", s))?;
        if !is_valid_ident(pkg) || !is_valid_ident(entity) {
            return Err(format!("invalid qualified name '{}'", s));
        }
        Ok(Self::new(pkg, entity))
    }
}

impl TryFrom<String> for QName {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<QName> for String {
    fn from(value: QName) -> Self {
        value.to_string()
    }
}
