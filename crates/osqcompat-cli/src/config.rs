//! Configuration file handling

use clap::ValueEnum;
use miette::{IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::args::OutputFormat;

pub const CONFIG_FILE_NAME: &str = "osqcompat.toml";

/// Configuration for osqcompat
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// osquery schema JSON path
    #[serde(default)]
    pub schema: Option<String>,

    /// Query file paths or glob patterns to check
    #[serde(default)]
    pub files: Vec<String>,

    /// SQL dialect ("sqlite" or "generic")
    #[serde(default)]
    pub dialect: Option<String>,

    /// Output format (human, json)
    #[serde(default)]
    pub format: Option<String>,

    /// Traversal depth bound
    #[serde(default)]
    pub max_depth: Option<usize>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).into_diagnostic()?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).into_diagnostic()
    }

    /// Try to find and load osqcompat.toml in current directory or parent directories
    pub fn find_and_load() -> Result<Option<Self>> {
        let mut current_dir = std::env::current_dir().into_diagnostic()?;

        loop {
            let config_path = current_dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                tracing::info!(path = %config_path.display(), "loading configuration");
                return Ok(Some(Self::from_file(&config_path)?));
            }

            if !current_dir.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// Merge CLI arguments into configuration.
    /// CLI arguments take precedence over config file values.
    pub fn merge_with_args(
        mut self,
        schema: &Option<PathBuf>,
        files: &[PathBuf],
        dialect: &Option<String>,
        format: &Option<OutputFormat>,
        max_depth: Option<usize>,
    ) -> Self {
        if let Some(path) = schema {
            self.schema = Some(path.display().to_string());
        }

        if !files.is_empty() {
            self.files = files.iter().map(|p| p.display().to_string()).collect();
        }

        if dialect.is_some() {
            self.dialect = dialect.clone();
        }

        if let Some(fmt) = format {
            self.format = Some(format!("{:?}", fmt).to_lowercase());
        }

        if max_depth.is_some() {
            self.max_depth = max_depth;
        }

        self
    }

    /// Resolved output format
    pub fn output_format(&self) -> Result<OutputFormat> {
        match self.format.as_deref() {
            None => Ok(OutputFormat::default()),
            Some(name) => OutputFormat::from_str(name, true).map_err(|_| {
                miette::miette!(
                    "Unknown output format: '{}'. Supported formats: human, json.",
                    name
                )
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let config = Config::from_toml(
            r#"
            schema = "data/osquery_schema.json"
            files = ["packs/**/*.sql"]
            dialect = "sqlite"
            format = "json"
            max_depth = 200
            "#,
        )
        .unwrap();

        assert_eq!(config.schema.as_deref(), Some("data/osquery_schema.json"));
        assert_eq!(config.files, vec!["packs/**/*.sql"]);
        assert_eq!(config.max_depth, Some(200));
        assert_eq!(config.output_format().unwrap(), OutputFormat::Json);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(Config::from_toml("disable = [\"E0001\"]").is_err());
    }

    #[test]
    fn test_unknown_format_rejected() {
        let config = Config::from_toml("format = \"sarif\"").unwrap();
        let err = config.output_format().unwrap_err();
        assert!(err.to_string().contains("sarif"));

        assert_eq!(
            Config::default().output_format().unwrap(),
            OutputFormat::Human
        );
    }

    #[test]
    fn test_args_override_config() {
        let config = Config {
            schema: Some("a.json".to_string()),
            files: vec!["a.sql".to_string()],
            format: Some("json".to_string()),
            ..Config::default()
        };

        let merged = config.merge_with_args(
            &Some(PathBuf::from("b.json")),
            &[],
            &Some("generic".to_string()),
            &Some(OutputFormat::Human),
            Some(10),
        );

        assert_eq!(merged.schema.as_deref(), Some("b.json"));
        assert_eq!(merged.files, vec!["a.sql"]);
        assert_eq!(merged.dialect.as_deref(), Some("generic"));
        assert_eq!(merged.output_format().unwrap(), OutputFormat::Human);
        assert_eq!(merged.max_depth, Some(10));
    }
}
