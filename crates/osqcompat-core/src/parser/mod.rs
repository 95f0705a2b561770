//! SQL parser adapter
//!
//! Parses query text with sqlparser and lowers the result into the closed
//! node set in [`ast`]. Only query statements are accepted.

pub mod ast;
mod lower;
mod nesting;

use sqlparser::parser::Parser;

use crate::dialect::SqlDialect;
use crate::error::ParseError;

pub use ast::{Node, Script};
pub use nesting::{check_nesting, DEFAULT_MAX_NESTING};

use lower::Lowerer;

/// Parse query text with the default (SQLite) dialect
pub fn parse(sql: &str) -> Result<Script, ParseError> {
    parse_with_dialect(sql, SqlDialect::default())
}

/// Parse query text with the given dialect
pub fn parse_with_dialect(sql: &str, dialect: SqlDialect) -> Result<Script, ParseError> {
    parse_with_limit(sql, dialect, DEFAULT_MAX_NESTING)
}

/// Parse query text, rejecting input whose estimated nesting exceeds `max_nesting`
pub fn parse_with_limit(
    sql: &str,
    dialect: SqlDialect,
    max_nesting: usize,
) -> Result<Script, ParseError> {
    if sql.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let parser_dialect = dialect.parser_dialect();
    check_nesting(parser_dialect.as_ref(), sql, max_nesting)?;
    let statements = Parser::parse_sql(parser_dialect.as_ref(), sql)?;

    // Comment-only input parses to nothing
    if statements.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut lowerer = Lowerer::new();
    let statements = statements
        .iter()
        .map(|stmt| lowerer.lower_statement(stmt))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Script { statements })
}
