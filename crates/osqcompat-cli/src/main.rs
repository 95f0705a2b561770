//! osqcompat CLI - osquery query platform compatibility checker

mod args;
mod config;
mod output;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use miette::{IntoDiagnostic, Result, WrapErr};
use osqcompat_core::parser::parse_with_dialect;
use osqcompat_core::{Analyzer, AnalyzerOptions, Platform, SchemaIndex, SqlDialect};
use tracing::{debug, Level};

use crate::args::{Args, Command, OutputFormat};
use crate::config::{Config, CONFIG_FILE_NAME};
use crate::output::{platform_names, print_json_reports, OutputFormatter};

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    match run(args) {
        Ok(has_invalid) => {
            if has_invalid {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::from(2)
        }
    }
}

fn run(args: Args) -> Result<bool> {
    match args.command {
        Command::Check {
            files,
            query,
            schema,
            config: config_path,
            dialect,
            format,
            max_depth,
        } => {
            let config = match config_path {
                Some(path) => Config::from_file(&path)?,
                None => Config::find_and_load()?.unwrap_or_default(),
            };
            let config = config.merge_with_args(&schema, &files, &dialect, &format, max_depth);

            let dialect: SqlDialect = match &config.dialect {
                Some(name) => name.parse().map_err(|e: String| miette::miette!(e))?,
                None => SqlDialect::default(),
            };
            let output_format = config.output_format()?;
            let mut options = AnalyzerOptions {
                dialect,
                ..AnalyzerOptions::default()
            };
            if let Some(depth) = config.max_depth {
                options.max_depth = depth;
            }

            let Some(schema_path) = &config.schema else {
                miette::bail!(
                    "No schema file specified. Use --schema, OSQCOMPAT_SCHEMA, or configure in {}",
                    CONFIG_FILE_NAME
                );
            };
            let index = load_schema(Path::new(schema_path))?;

            let query_files = expand_patterns(&config.files)?;
            if query_files.is_empty() && query.is_empty() {
                miette::bail!(
                    "No queries specified. Use positional arguments, --query, or configure in {}",
                    CONFIG_FILE_NAME
                );
            }

            let mut sources = Vec::with_capacity(query_files.len() + query.len());
            for query_file in &query_files {
                let content = fs::read_to_string(query_file)
                    .into_diagnostic()
                    .wrap_err_with(|| format!("failed to read {}", query_file.display()))?;
                sources.push((query_file.display().to_string(), content));
            }
            for (i, sql) in query.into_iter().enumerate() {
                sources.push((format!("<query {}>", i + 1), sql));
            }

            let analyzer = Analyzer::with_options(&index, options);
            let mut reports = Vec::new();
            let mut invalid = 0;

            for (name, content) in &sources {
                debug!(source = %name, "analyzing");
                let analysis = analyzer.analyze(content);
                if analysis.result.is_invalid() {
                    invalid += 1;
                }

                let formatter = OutputFormatter::new(output_format, name.clone()).quiet(args.quiet);
                if let Some(report) = formatter.emit(&analysis, content) {
                    reports.push(report);
                }
            }

            if output_format == OutputFormat::Json {
                print_json_reports(&reports)?;
            } else if !args.quiet {
                eprintln!();
                if invalid > 0 {
                    eprintln!("{} of {} query source(s) invalid", invalid, sources.len());
                } else {
                    eprintln!("All {} query source(s) parsed", sources.len());
                }
            }

            Ok(invalid > 0)
        }

        Command::Tables { schema, platform } => {
            let index = load_schema(&schema)?;
            let platform: Option<Platform> = platform
                .map(|p| p.parse().map_err(|e: String| miette::miette!(e)))
                .transpose()?;

            let entries: Vec<_> = match platform {
                Some(p) => index.tables_for(p).collect(),
                None => index.entries().collect(),
            };
            let width = entries.iter().map(|e| e.name.len()).max().unwrap_or(0);

            for entry in &entries {
                println!(
                    "{:<width$}  {}",
                    entry.name,
                    platform_names(&entry.platforms),
                    width = width
                );
            }
            if !args.quiet {
                eprintln!("{} table(s)", entries.len());
            }

            Ok(false)
        }

        Command::Parse { file, dialect } => {
            let dialect: SqlDialect = dialect.parse().map_err(|e: String| miette::miette!(e))?;
            let content = fs::read_to_string(&file).into_diagnostic()?;

            match parse_with_dialect(&content, dialect) {
                Ok(script) => {
                    let json = serde_json::to_string_pretty(&script).into_diagnostic()?;
                    println!("{}", json);
                    Ok(false)
                }
                Err(e) => {
                    eprintln!("Parse error: {}", e);
                    Ok(true)
                }
            }
        }
    }
}

fn load_schema(path: &Path) -> Result<SchemaIndex> {
    let content = fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read schema {}", path.display()))?;
    let index = SchemaIndex::from_json(&content)?;
    debug!(tables = index.len(), path = %path.display(), "loaded schema");
    Ok(index)
}

/// Expand glob patterns; plain paths pass through unchanged
fn expand_patterns(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        if pattern.contains(['*', '?', '[']) {
            for path in glob::glob(pattern).into_diagnostic()?.flatten() {
                paths.push(path);
            }
        } else {
            paths.push(PathBuf::from(pattern));
        }
    }
    Ok(paths)
}
