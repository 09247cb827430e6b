//! Resource access modes.

use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, Result};

/// How a backing resource is opened.
///
/// - `Read` opens existing content for query only.
/// - `Write` creates or truncates the resource for output.
/// - `Append` keeps existing content; writes extend rather than replace it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    Read,
    Write,
    Append,
}

impl Default for AccessMode {
    fn default() -> Self {
        Self::Read
    }
}

impl AccessMode {
    /// Parse from string (case-insensitive). Accepts the short forms `r`, `w`, `a`.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "r" | "read" => Ok(Self::Read),
            "w" | "write" => Ok(Self::Write),
            "a" | "append" => Ok(Self::Append),
            other => Err(DatasetError::Config(format!("unknown access mode '{}'", other))),
        }
    }

    /// Get the mode name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Append => "append",
        }
    }

    /// True for modes that accept writes.
    pub fn is_output(&self) -> bool {
        matches!(self, Self::Write | Self::Append)
    }
}

impl std::str::FromStr for AccessMode {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_short_and_long_forms() {
        assert_eq!(AccessMode::parse("r").unwrap(), AccessMode::Read);
        assert_eq!(AccessMode::parse("WRITE").unwrap(), AccessMode::Write);
        assert_eq!(AccessMode::parse(" a ").unwrap(), AccessMode::Append);
        assert!(AccessMode::parse("rw").is_err());
    }

    #[test]
    fn test_is_output() {
        assert!(!AccessMode::Read.is_output());
        assert!(AccessMode::Write.is_output());
        assert!(AccessMode::Append.is_output());
    }
}
