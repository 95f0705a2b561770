//! CLI argument definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "osqcompat")]
#[command(author, version, about = "Report which osquery platforms a query can run on")]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check queries for platform compatibility
    Check {
        /// Query files to check (supports glob patterns)
        files: Vec<PathBuf>,

        /// Inline query to check
        #[arg(short = 'e', long = "query", value_name = "SQL")]
        query: Vec<String>,

        /// osquery schema JSON file
        #[arg(short, long, value_name = "FILE", env = "OSQCOMPAT_SCHEMA")]
        schema: Option<PathBuf>,

        /// Configuration file (defaults to osqcompat.toml in this or a parent directory)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// SQL dialect (sqlite, generic)
        #[arg(short, long)]
        dialect: Option<String>,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Maximum AST nesting depth before a query is rejected
        #[arg(long, value_name = "N")]
        max_depth: Option<usize>,
    },

    /// List schema tables and their platforms
    Tables {
        /// osquery schema JSON file
        #[arg(short, long, value_name = "FILE", env = "OSQCOMPAT_SCHEMA")]
        schema: PathBuf,

        /// Only show tables available on this platform
        #[arg(short, long)]
        platform: Option<String>,
    },

    /// Parse a query and display its AST (for debugging)
    Parse {
        /// Query file to parse
        file: PathBuf,

        /// SQL dialect (sqlite, generic)
        #[arg(short, long, default_value = "sqlite")]
        dialect: String,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_check_command() {
        let args = Args::try_parse_from([
            "osqcompat",
            "-vv",
            "check",
            "queries/*.sql",
            "-e",
            "SELECT * FROM users",
            "--schema",
            "schema.json",
            "--format",
            "json",
            "--max-depth",
            "50",
        ])
        .unwrap();

        assert_eq!(args.verbose, 2);
        match args.command {
            Command::Check {
                files,
                query,
                schema,
                format,
                max_depth,
                ..
            } => {
                assert_eq!(files, vec![PathBuf::from("queries/*.sql")]);
                assert_eq!(query, vec!["SELECT * FROM users".to_string()]);
                assert_eq!(schema, Some(PathBuf::from("schema.json")));
                assert_eq!(format, Some(OutputFormat::Json));
                assert_eq!(max_depth, Some(50));
            }
            _ => panic!("expected check command"),
        }
    }
}
