//! osqcompat-core: osquery query platform-compatibility analysis
//!
//! Given query text and an index of osquery tables, this library works out
//! which platforms (macOS, Windows, Linux, ChromeOS) the query can run on by
//! finding every table it references and intersecting their platform
//! support.

pub mod analyzer;
pub mod dialect;
pub mod error;
pub mod parser;
pub mod platform;
pub mod schema;

pub use analyzer::{analyze, Analysis, Analyzer, AnalyzerOptions, CompatibilityResult};
pub use dialect::SqlDialect;
pub use error::{
    AnalysisError, DepthExceededError, Diagnostic, DiagnosticKind, ParseError, SchemaError,
    Severity, Span,
};
pub use platform::{Platform, PlatformSet};
pub use schema::{SchemaEntry, SchemaIndex};
