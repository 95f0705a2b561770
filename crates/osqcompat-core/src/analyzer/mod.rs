//! Platform compatibility analyzer

pub mod extract;
mod resolver;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dialect::SqlDialect;
use crate::error::{AnalysisError, Diagnostic};
use crate::parser::{parse_with_limit, DEFAULT_MAX_NESTING};
use crate::platform::PlatformSet;
use crate::schema::SchemaIndex;

pub use extract::{extract_tables, visit, TableReference, DEFAULT_MAX_DEPTH};
pub use resolver::{dedup_tables, resolve, PlatformResolver};

/// Outcome of analyzing one query text.
///
/// Serializes as `{"status": "invalid"}` or
/// `{"status": "ok", "platforms": [...]}` with platforms in canonical order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CompatibilityResult {
    /// The query could not be parsed or traversed
    Invalid,
    /// Platforms the query can run on; empty means none
    #[serde(rename = "ok")]
    Platforms { platforms: PlatformSet },
}

impl CompatibilityResult {
    pub fn is_invalid(&self) -> bool {
        matches!(self, CompatibilityResult::Invalid)
    }

    /// Compatible platforms, `None` for an invalid query
    pub fn platforms(&self) -> Option<&PlatformSet> {
        match self {
            CompatibilityResult::Invalid => None,
            CompatibilityResult::Platforms { platforms } => Some(platforms),
        }
    }
}

/// Analyzer settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzerOptions {
    pub dialect: SqlDialect,
    /// Bound on AST nesting; deeper queries are reported as invalid
    pub max_depth: usize,
    /// Bound on expression nesting estimated from the token stream
    pub max_nesting: usize,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            dialect: SqlDialect::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            max_nesting: DEFAULT_MAX_NESTING,
        }
    }
}

/// Full analysis report: the result plus what led to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Analysis {
    #[serde(flatten)]
    pub result: CompatibilityResult,
    /// Referenced tables, deduplicated, in first-seen order
    pub tables: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Platform compatibility analyzer over a schema index
#[derive(Debug, Clone, Copy)]
pub struct Analyzer<'a> {
    index: &'a SchemaIndex,
    options: AnalyzerOptions,
}

impl<'a> Analyzer<'a> {
    pub fn new(index: &'a SchemaIndex) -> Self {
        Self::with_options(index, AnalyzerOptions::default())
    }

    pub fn with_options(index: &'a SchemaIndex, options: AnalyzerOptions) -> Self {
        Self { index, options }
    }

    /// Analyze a query. Never fails: parse and traversal errors become
    /// `CompatibilityResult::Invalid` with an error diagnostic.
    pub fn analyze(&self, sql: &str) -> Analysis {
        match self.try_analyze(sql) {
            Ok(analysis) => analysis,
            Err(err) => {
                debug!(error = %err, "query is invalid");
                Analysis {
                    result: CompatibilityResult::Invalid,
                    tables: Vec::new(),
                    diagnostics: vec![Diagnostic::from(&err)],
                }
            }
        }
    }

    fn try_analyze(&self, sql: &str) -> Result<Analysis, AnalysisError> {
        let script = parse_with_limit(sql, self.options.dialect, self.options.max_nesting)?;
        let references = extract_tables(&script, self.options.max_depth)?;

        let tables: Vec<String> = dedup_tables(&references)
            .into_iter()
            .map(|t| t.name.clone())
            .collect();
        debug!(?tables, "extracted table references");

        let mut resolver = PlatformResolver::new(self.index);
        let platforms = resolver.resolve(&references);

        Ok(Analysis {
            result: CompatibilityResult::Platforms { platforms },
            tables,
            diagnostics: resolver.into_diagnostics(),
        })
    }
}

/// Which platforms can run `sql`, given the tables in `index`
pub fn analyze(sql: &str, index: &SchemaIndex) -> CompatibilityResult {
    Analyzer::new(index).analyze(sql).result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticKind;
    use crate::platform::Platform;

    fn setup_index() -> SchemaIndex {
        SchemaIndex::build([
            ("users", vec![Platform::Darwin, Platform::Windows, Platform::Linux]),
            ("wifi_status", vec![Platform::Darwin]),
        ])
        .unwrap()
    }

    #[test]
    fn test_analysis_reports_tables_and_diagnostics() {
        let index = setup_index();
        let analyzer = Analyzer::new(&index);

        let analysis = analyzer
            .analyze("SELECT * FROM users u JOIN Users v JOIN mystery m ON u.uid = m.uid");
        assert_eq!(analysis.tables, vec!["users", "mystery"]);
        assert_eq!(analysis.diagnostics.len(), 1);
        assert_eq!(analysis.diagnostics[0].kind, DiagnosticKind::UnknownTable);
        let span = analysis.diagnostics[0].span.expect("unknown table should carry a span");
        assert_eq!(span.line, 1);
    }

    #[test]
    fn test_parse_error_becomes_invalid() {
        let index = setup_index();
        let analysis = Analyzer::new(&index).analyze("SELECT * FRM users");
        assert_eq!(analysis.result, CompatibilityResult::Invalid);
        assert!(analysis.tables.is_empty());
        assert_eq!(analysis.diagnostics[0].kind, DiagnosticKind::ParseError);
    }

    #[test]
    fn test_depth_exceeded_becomes_invalid() {
        let index = setup_index();
        let options = AnalyzerOptions {
            max_depth: 4,
            ..AnalyzerOptions::default()
        };
        let analyzer = Analyzer::with_options(&index, options);

        let analysis = analyzer.analyze("SELECT * FROM (SELECT * FROM (SELECT * FROM users))");
        assert_eq!(analysis.result, CompatibilityResult::Invalid);
        assert_eq!(analysis.diagnostics[0].kind, DiagnosticKind::DepthExceeded);

        // Shallow enough for the same limit
        assert!(!analyzer.analyze("SELECT * FROM users").result.is_invalid());
    }

    #[test]
    fn test_result_serialization() {
        let ok = CompatibilityResult::Platforms {
            platforms: [Platform::Linux, Platform::Darwin].into_iter().collect(),
        };
        assert_eq!(
            serde_json::to_string(&ok).unwrap(),
            r#"{"status":"ok","platforms":["darwin","linux"]}"#
        );
        assert_eq!(
            serde_json::to_string(&CompatibilityResult::Invalid).unwrap(),
            r#"{"status":"invalid"}"#
        );

        let empty: CompatibilityResult =
            serde_json::from_str(r#"{"status":"ok","platforms":[]}"#).unwrap();
        assert_eq!(empty.platforms().map(|p| p.len()), Some(0));
    }

    #[test]
    fn test_analyzer_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Analyzer<'static>>();
        assert_send_sync::<SchemaIndex>();
        assert_send_sync::<CompatibilityResult>();
    }
}
