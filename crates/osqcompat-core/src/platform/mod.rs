//! osquery target platforms

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Operating-system family a table or query can target.
///
/// Variant order is the canonical display order; `PlatformSet` relies on
/// the derived `Ord` to iterate and serialize in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Darwin,
    Windows,
    Linux,
    Chrome,
}

/// Ordered set of platforms
pub type PlatformSet = BTreeSet<Platform>;

impl Platform {
    /// Every supported platform, in canonical order
    pub const ALL: [Platform; 4] = [
        Platform::Darwin,
        Platform::Windows,
        Platform::Linux,
        Platform::Chrome,
    ];

    /// The unconstrained set
    pub fn all() -> PlatformSet {
        Self::ALL.into_iter().collect()
    }

    /// Identifier used in osquery schema data
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Darwin => "darwin",
            Platform::Windows => "windows",
            Platform::Linux => "linux",
            Platform::Chrome => "chrome",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Darwin => "macOS",
            Platform::Windows => "Windows",
            Platform::Linux => "Linux",
            Platform::Chrome => "ChromeOS",
        }
    }

    /// Parse a platform name as it appears in schema data.
    ///
    /// Returns `Ok(None)` for legacy platforms that are recognised but no
    /// longer part of the analysis (`freebsd`).
    pub fn parse_schema_name(s: &str) -> Result<Option<Self>, String> {
        if s.eq_ignore_ascii_case("freebsd") {
            return Ok(None);
        }
        s.parse().map(Some)
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "darwin" | "macos" => Ok(Platform::Darwin),
            "windows" => Ok(Platform::Windows),
            "linux" => Ok(Platform::Linux),
            "chrome" | "chromeos" => Ok(Platform::Chrome),
            _ => Err(format!(
                "Unknown platform: '{}'. Supported platforms: darwin, windows, linux, chrome.",
                s
            )),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order() {
        let set: PlatformSet = [Platform::Chrome, Platform::Linux, Platform::Darwin]
            .into_iter()
            .collect();
        let ordered: Vec<_> = set.into_iter().collect();
        assert_eq!(
            ordered,
            vec![Platform::Darwin, Platform::Linux, Platform::Chrome]
        );
    }

    #[test]
    fn test_parse_schema_name() {
        assert_eq!(
            Platform::parse_schema_name("darwin"),
            Ok(Some(Platform::Darwin))
        );
        assert_eq!(Platform::parse_schema_name("FreeBSD"), Ok(None));
        assert!(Platform::parse_schema_name("solaris").is_err());
    }

    #[test]
    fn test_serializes_lowercase() {
        let json = serde_json::to_string(&Platform::all()).unwrap();
        assert_eq!(json, r#"["darwin","windows","linux","chrome"]"#);
    }
}
