//! Schema loader - reads osquery schema documents into a SchemaIndex

use serde::Deserialize;
use tracing::debug;

use crate::error::SchemaError;
use crate::platform::Platform;
use crate::schema::SchemaIndex;

/// One table as it appears in a generated osquery schema document.
/// Fields other than the name and platforms (columns, description, ...) are ignored.
#[derive(Debug, Deserialize)]
struct RawTable {
    name: String,
    #[serde(default)]
    platforms: Vec<String>,
}

impl SchemaIndex {
    /// Build an index from a JSON array of `{ "name": ..., "platforms": [...] }` objects
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let raw: Vec<RawTable> = serde_json::from_str(json)?;
        let mut entries = Vec::with_capacity(raw.len());

        for table in raw {
            if table.platforms.is_empty() {
                return Err(SchemaError::EmptyPlatforms { name: table.name });
            }

            let mut platforms = Vec::with_capacity(table.platforms.len());
            for name in &table.platforms {
                match Platform::parse_schema_name(name) {
                    Ok(Some(platform)) => platforms.push(platform),
                    Ok(None) => {}
                    Err(_) => {
                        return Err(SchemaError::UnknownPlatform {
                            table: table.name,
                            platform: name.clone(),
                        })
                    }
                }
            }

            // Only legacy platforms left: nothing the analysis can target
            if platforms.is_empty() {
                debug!(table = %table.name, "skipping table with legacy-only platforms");
                continue;
            }

            entries.push((table.name, platforms));
        }

        let index = Self::build(entries)?;
        debug!(tables = index.len(), "loaded schema index");
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PlatformSet;

    #[test]
    fn test_from_json() {
        let json = r#"[
            {"name": "users", "platforms": ["darwin", "windows", "linux", "freebsd"], "evented": false},
            {"name": "wifi_status", "platforms": ["darwin"], "columns": [{"name": "ssid"}]}
        ]"#;
        let index = SchemaIndex::from_json(json).unwrap();

        let expected: PlatformSet = [Platform::Darwin, Platform::Windows, Platform::Linux]
            .into_iter()
            .collect();
        assert_eq!(index.lookup("users"), Some(&expected));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_legacy_only_table_skipped() {
        let json = r#"[{"name": "pkg_packages", "platforms": ["freebsd"]}]"#;
        let index = SchemaIndex::from_json(json).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_unknown_platform_fails() {
        let json = r#"[{"name": "users", "platforms": ["solaris"]}]"#;
        let err = SchemaIndex::from_json(json).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::UnknownPlatform { ref platform, .. } if platform == "solaris"
        ));
    }

    #[test]
    fn test_duplicate_table_in_document_fails() {
        let json = r#"[
            {"name": "users", "platforms": ["darwin"]},
            {"name": "users", "platforms": ["linux"]}
        ]"#;
        let err = SchemaIndex::from_json(json).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateTable { .. }));
    }

    #[test]
    fn test_malformed_document_fails() {
        let err = SchemaIndex::from_json("{not json").unwrap_err();
        assert!(matches!(err, SchemaError::Json(_)));
    }
}
