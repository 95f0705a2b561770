//! Error and diagnostic types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Source location span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
    /// Length in characters
    pub length: usize,
}

impl Span {
    pub fn new(line: usize, column: usize, length: usize) -> Self {
        Self {
            line,
            column,
            length,
        }
    }

    /// Create a span from sqlparser's Span, `None` when the parser recorded no location
    pub fn from_sqlparser(span: &sqlparser::tokenizer::Span) -> Option<Self> {
        let start = span.start;
        let end = span.end;
        if start.line == 0 {
            return None;
        }
        let length = if end.line == start.line && end.column > start.column {
            end.column as usize - start.column as usize
        } else {
            1
        };
        Some(Self::new(start.line as usize, start.column as usize, length))
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Diagnostic message produced while analyzing a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
    pub span: Option<Span>,
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            message: message.into(),
            span: None,
            help: None,
        }
    }

    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Warning,
            message: message.into(),
            span: None,
            help: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Get the diagnostic code string (e.g., "E0001")
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

impl From<&AnalysisError> for Diagnostic {
    fn from(err: &AnalysisError) -> Self {
        let kind = match err {
            AnalysisError::Parse(ParseError::TooDeep(_)) | AnalysisError::DepthExceeded(_) => {
                DiagnosticKind::DepthExceeded
            }
            AnalysisError::Parse(_) => DiagnosticKind::ParseError,
        };
        let diag = Diagnostic::error(kind, err.to_string());
        match err {
            AnalysisError::Parse(ParseError::Empty) => {
                diag.with_help("Type a SELECT query to see which platforms it supports")
            }
            AnalysisError::Parse(ParseError::UnsupportedStatement(_)) => {
                diag.with_help("Only SELECT queries can be scheduled in osquery")
            }
            _ => diag,
        }
    }
}

/// Types of diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// E0001: Table not present in the schema index
    UnknownTable,
    /// Parse error
    ParseError,
    /// Query nesting exceeded the traversal bound
    DepthExceeded,
}

impl DiagnosticKind {
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticKind::UnknownTable => "E0001",
            DiagnosticKind::ParseError => "E1000",
            DiagnosticKind::DepthExceeded => "E1001",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DiagnosticKind::UnknownTable => "unknown-table",
            DiagnosticKind::ParseError => "parse-error",
            DiagnosticKind::DepthExceeded => "depth-exceeded",
        }
    }
}

/// Query text that could not be turned into an AST
#[derive(Debug, Error, miette::Diagnostic)]
pub enum ParseError {
    #[error("query is empty")]
    #[diagnostic(code(osqcompat::parse::empty))]
    Empty,

    #[error("syntax error: {0}")]
    #[diagnostic(code(osqcompat::parse::syntax))]
    Syntax(#[from] sqlparser::parser::ParserError),

    #[error("unsupported statement '{0}': only SELECT queries can be analyzed")]
    #[diagnostic(code(osqcompat::parse::unsupported_statement))]
    UnsupportedStatement(String),

    #[error("unsupported table expression '{0}'")]
    #[diagnostic(code(osqcompat::parse::unsupported_relation))]
    UnsupportedRelation(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    TooDeep(#[from] DepthExceededError),
}

/// AST nesting went past the traversal bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, miette::Diagnostic)]
#[error("query nesting exceeds the maximum depth of {limit}")]
#[diagnostic(code(osqcompat::analyze::depth_exceeded))]
pub struct DepthExceededError {
    pub limit: usize,
}

/// Any failure inside a single analysis. Never escapes `analyze()`.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum AnalysisError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    DepthExceeded(#[from] DepthExceededError),
}

/// Malformed schema data, raised while building a `SchemaIndex`
#[derive(Debug, Error, miette::Diagnostic)]
pub enum SchemaError {
    #[error("table '{name}' is defined more than once")]
    #[diagnostic(
        code(osqcompat::schema::duplicate_table),
        help("table names are compared case-insensitively")
    )]
    DuplicateTable { name: String },

    #[error("table '{name}' declares no platforms")]
    #[diagnostic(code(osqcompat::schema::empty_platforms))]
    EmptyPlatforms { name: String },

    #[error("table '{table}' declares unknown platform '{platform}'")]
    #[diagnostic(code(osqcompat::schema::unknown_platform))]
    UnknownPlatform { table: String, platform: String },

    #[error("invalid schema document: {0}")]
    #[diagnostic(code(osqcompat::schema::json))]
    Json(#[from] serde_json::Error),
}
