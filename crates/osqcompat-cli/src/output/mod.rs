//! Output formatting

use osqcompat_core::{Analysis, CompatibilityResult, Diagnostic, PlatformSet, Severity};
use serde_json::Value;

use crate::args::OutputFormat;

/// Output formatter for the analysis of one query source
pub struct OutputFormatter {
    format: OutputFormat,
    source_name: String,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, source_name: String) -> Self {
        Self {
            format,
            source_name,
            quiet: false,
        }
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Render an analysis. Human output is printed directly; JSON output is
    /// returned so the caller can emit every report as one document.
    pub fn emit(&self, analysis: &Analysis, source: &str) -> Option<Value> {
        match self.format {
            OutputFormat::Human => {
                self.print_human(analysis, source);
                None
            }
            OutputFormat::Json => Some(self.to_json(analysis)),
        }
    }

    fn print_human(&self, analysis: &Analysis, source: &str) {
        let invalid = analysis.result.is_invalid();
        if self.quiet && !invalid {
            return;
        }

        println!("{}: {}", self.source_name, describe_result(&analysis.result));
        if !analysis.tables.is_empty() {
            println!("   tables: {}", analysis.tables.join(", "));
        }

        for diag in &analysis.diagnostics {
            if self.quiet && diag.severity != Severity::Error {
                continue;
            }
            self.print_diagnostic(diag, source);
        }
    }

    fn print_diagnostic(&self, diag: &Diagnostic, source: &str) {
        let severity_str = match diag.severity {
            Severity::Error => "\x1b[31merror\x1b[0m",
            Severity::Warning => "\x1b[33mwarning\x1b[0m",
        };

        eprintln!(
            "{}[{}/{}]: {}",
            severity_str,
            diag.code(),
            diag.kind.name(),
            diag.message
        );

        if let Some(span) = &diag.span {
            eprintln!("  --> {}:{}:{}", self.source_name, span.line, span.column);

            if let Some(source_line) = get_source_line(source, span.line) {
                eprintln!("   |");
                eprintln!("{:>3} | {}", span.line, source_line);

                let width = source_line.chars().count();
                let padding = " ".repeat(span.column.saturating_sub(1));
                let underline = "^".repeat(
                    span.length
                        .min((width + 1).saturating_sub(span.column))
                        .max(1),
                );
                eprintln!("   | {}{}", padding, underline);
            }
        }

        if let Some(help) = &diag.help {
            eprintln!("   = help: {}", help);
        }

        eprintln!();
    }

    fn to_json(&self, analysis: &Analysis) -> Value {
        serde_json::json!({
            "source": self.source_name,
            "analysis": analysis,
        })
    }
}

/// Print collected JSON reports as a single array
pub fn print_json_reports(reports: &[Value]) -> miette::Result<()> {
    let output = serde_json::to_string_pretty(reports)
        .map_err(|e| miette::miette!("failed to serialize report: {}", e))?;
    println!("{}", output);
    Ok(())
}

/// One-line summary of a compatibility result
pub fn describe_result(result: &CompatibilityResult) -> String {
    match result {
        CompatibilityResult::Invalid => "\x1b[31minvalid query\x1b[0m".to_string(),
        CompatibilityResult::Platforms { platforms } if platforms.is_empty() => {
            "\x1b[33mnot supported on any platform\x1b[0m".to_string()
        }
        CompatibilityResult::Platforms { platforms } => {
            format!("\x1b[32mcompatible with\x1b[0m {}", platform_names(platforms))
        }
    }
}

/// Display names of a platform set, in canonical order
pub fn platform_names(platforms: &PlatformSet) -> String {
    platforms
        .iter()
        .map(|p| p.display_name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Get a specific line from source (1-indexed)
fn get_source_line(source: &str, line: usize) -> Option<&str> {
    source.lines().nth(line.checked_sub(1)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use osqcompat_core::Platform;

    #[test]
    fn test_describe_result() {
        assert!(describe_result(&CompatibilityResult::Invalid).contains("invalid"));

        let none = CompatibilityResult::Platforms {
            platforms: PlatformSet::new(),
        };
        assert!(describe_result(&none).contains("not supported on any platform"));

        let some = CompatibilityResult::Platforms {
            platforms: [Platform::Linux, Platform::Darwin].into_iter().collect(),
        };
        assert!(describe_result(&some).ends_with("macOS, Linux"));
    }

    #[test]
    fn test_json_report_shape() {
        let analysis = Analysis {
            result: CompatibilityResult::Platforms {
                platforms: [Platform::Windows].into_iter().collect(),
            },
            tables: vec!["registry".to_string()],
            diagnostics: Vec::new(),
        };
        let formatter = OutputFormatter::new(OutputFormat::Json, "q.sql".to_string());

        let report = formatter.emit(&analysis, "SELECT * FROM registry").unwrap();
        assert_eq!(
            report,
            serde_json::json!({
                "source": "q.sql",
                "analysis": {
                    "status": "ok",
                    "platforms": ["windows"],
                    "tables": ["registry"],
                    "diagnostics": [],
                },
            })
        );
    }

    #[test]
    fn test_get_source_line() {
        let source = "SELECT *\nFROM users";
        assert_eq!(get_source_line(source, 2), Some("FROM users"));
        assert_eq!(get_source_line(source, 0), None);
        assert_eq!(get_source_line(source, 3), None);
    }
}
