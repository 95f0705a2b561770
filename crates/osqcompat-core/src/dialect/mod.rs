//! SQL dialect support

use sqlparser::dialect::{Dialect, GenericDialect, SQLiteDialect};
use std::str::FromStr;

/// Supported SQL dialects.
///
/// osquery evaluates queries with SQLite, so that is the default; the
/// generic dialect is more permissive and useful when checking query
/// packs written for other tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlDialect {
    #[default]
    SQLite,
    Generic,
}

impl SqlDialect {
    /// Get the sqlparser dialect for parsing
    pub fn parser_dialect(&self) -> Box<dyn Dialect> {
        match self {
            SqlDialect::SQLite => Box::new(SQLiteDialect {}),
            SqlDialect::Generic => Box::new(GenericDialect {}),
        }
    }
}

impl FromStr for SqlDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" | "osquery" => Ok(SqlDialect::SQLite),
            "generic" | "ansi" => Ok(SqlDialect::Generic),
            _ => Err(format!(
                "Unknown dialect: '{}'. Supported dialects: sqlite, generic.",
                s
            )),
        }
    }
}

impl std::fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlDialect::SQLite => write!(f, "sqlite"),
            SqlDialect::Generic => write!(f, "generic"),
        }
    }
}
