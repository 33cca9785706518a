use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Longest accepted table name
pub const MAX_TABLE_NAME_LEN: usize = 64;

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("valid table name pattern"))
}

/// Why a table name was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableNameError {
    #[error("table name is empty")]
    Empty,

    #[error("table name '{name}' is {len} characters long (limit {MAX_TABLE_NAME_LEN})")]
    TooLong { name: String, len: usize },

    #[error("table name '{0}' contains characters outside [A-Za-z0-9_]")]
    InvalidCharacters(String),
}

/// A table name that is safe to splice into generated statements
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableName(String);

impl TableName {
    pub fn parse(raw: &str) -> Result<Self, TableNameError> {
        if raw.trim().is_empty() {
            return Err(TableNameError::Empty);
        }
        if !name_pattern().is_match(raw) {
            return Err(TableNameError::InvalidCharacters(raw.to_string()));
        }
        let len = raw.chars().count();
        if len > MAX_TABLE_NAME_LEN {
            return Err(TableNameError::TooLong {
                name: raw.to_string(),
                len,
            });
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TableName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for TableName {
    type Error = TableNameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}
