//! Platform resolver - intersects the platform sets of referenced tables

use indexmap::IndexMap;
use tracing::trace;

use crate::analyzer::extract::TableReference;
use crate::analyzer::CompatibilityResult;
use crate::error::{Diagnostic, DiagnosticKind};
use crate::platform::{Platform, PlatformSet};
use crate::schema::SchemaIndex;

/// Resolves table references against a schema index
pub struct PlatformResolver<'a> {
    index: &'a SchemaIndex,
    /// Collected diagnostics
    diagnostics: Vec<Diagnostic>,
}

impl<'a> PlatformResolver<'a> {
    pub fn new(index: &'a SchemaIndex) -> Self {
        Self {
            index,
            diagnostics: Vec::new(),
        }
    }

    /// Platforms every referenced, known table supports.
    ///
    /// No tables means no constraint, so the result starts from the full
    /// set. Unknown tables do not narrow it; each gets a warning instead.
    pub fn resolve(&mut self, tables: &[TableReference]) -> PlatformSet {
        let mut platforms = Platform::all();

        for table in dedup_tables(tables) {
            match self.index.lookup(&table.name) {
                Some(supported) => {
                    trace!(table = %table.name, ?supported, "resolved table platforms");
                    platforms = platforms.intersection(supported).copied().collect();
                }
                None => self.report_unknown(table),
            }
        }

        platforms
    }

    /// Consume the resolver and return collected diagnostics
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    fn report_unknown(&mut self, table: &TableReference) {
        trace!(table = %table.name, "table not in schema index");

        let mut diag = Diagnostic::warning(
            DiagnosticKind::UnknownTable,
            format!(
                "Table '{}' is not in the osquery schema; it does not restrict platforms",
                table.name
            ),
        );
        if let Some(span) = table.span {
            diag = diag.with_span(span);
        }
        diag = match find_similar_table(self.index, &table.name) {
            Some(suggestion) => diag.with_help(format!("Did you mean '{}'?", suggestion)),
            None => diag.with_help("The table may come from an extension or a newer osquery release"),
        };
        self.diagnostics.push(diag);
    }
}

/// Resolve table references into a compatibility result, discarding diagnostics
pub fn resolve(tables: &[TableReference], index: &SchemaIndex) -> CompatibilityResult {
    let platforms = PlatformResolver::new(index).resolve(tables);
    CompatibilityResult::Platforms { platforms }
}

/// Drop repeated references (case-insensitive), keeping the first spelling and position
pub fn dedup_tables(tables: &[TableReference]) -> Vec<&TableReference> {
    let mut unique: IndexMap<String, &TableReference> = IndexMap::with_capacity(tables.len());
    for table in tables {
        unique.entry(table.name.to_lowercase()).or_insert(table);
    }
    unique.into_values().collect()
}

/// Closest schema table name within an edit distance of 2
fn find_similar_table<'i>(index: &'i SchemaIndex, name: &str) -> Option<&'i str> {
    let name_lower = name.to_lowercase();

    index
        .entries()
        .map(|entry| {
            (
                levenshtein_distance(&name_lower, &entry.name.to_lowercase()),
                entry.name.as_str(),
            )
        })
        .filter(|(distance, _)| *distance <= 2)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, name)| name)
}

fn levenshtein_distance(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}
