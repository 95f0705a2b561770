//! Schema index - maps osquery table names to their supported platforms

use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::platform::{Platform, PlatformSet};

/// A single osquery table and the platforms it is available on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaEntry {
    pub name: String,
    pub platforms: PlatformSet,
}

/// Immutable lookup from table name to platform set.
///
/// Built once from externally supplied schema data and only read after
/// that. Keys are stored lowercased; entries keep their original spelling
/// and schema order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchemaIndex {
    tables: IndexMap<String, SchemaEntry>,
}

impl SchemaIndex {
    /// Build an index from `(name, platforms)` pairs.
    ///
    /// Fails on the first duplicate name (case-insensitive) or on an entry
    /// with no platforms.
    pub fn build<I, N, P>(entries: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = (N, P)>,
        N: Into<String>,
        P: IntoIterator<Item = Platform>,
    {
        let entries = entries.into_iter();
        let mut tables = IndexMap::with_capacity(entries.size_hint().0);

        for (name, platforms) in entries {
            let name = name.into();
            let platforms: PlatformSet = platforms.into_iter().collect();
            if platforms.is_empty() {
                return Err(SchemaError::EmptyPlatforms { name });
            }

            match tables.entry(name.to_lowercase()) {
                Entry::Occupied(_) => return Err(SchemaError::DuplicateTable { name }),
                Entry::Vacant(slot) => {
                    slot.insert(SchemaEntry { name, platforms });
                }
            }
        }

        Ok(Self { tables })
    }

    /// Look up a table's platforms (case-insensitive)
    pub fn lookup(&self, name: &str) -> Option<&PlatformSet> {
        self.get(name).map(|entry| &entry.platforms)
    }

    /// Look up a full entry (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&SchemaEntry> {
        self.tables.get(name.to_lowercase().as_str())
    }

    /// Entries in schema order
    pub fn entries(&self) -> impl Iterator<Item = &SchemaEntry> {
        self.tables.values()
    }

    /// Tables available on the given platform, in schema order
    pub fn tables_for(&self, platform: Platform) -> impl Iterator<Item = &SchemaEntry> {
        self.entries()
            .filter(move |entry| entry.platforms.contains(&platform))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
