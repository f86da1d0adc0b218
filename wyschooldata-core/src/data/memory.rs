//! In-memory provider backed by a JSON fixture document.
//!
//! Document layout:
//! `{ "min_year": 2000, "max_year": 2024, "years": { "2024": { "columns": [...], "rows": [[...]] } } }`
//!
//! A year inside the bounds with no table yields an empty table.

use super::provider::{ProviderError, ProviderTable, UpstreamProvider};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FixtureDocument {
    min_year: i32,
    max_year: i32,
    #[serde(default)]
    years: BTreeMap<i32, ProviderTable>,
}

/// Provider serving tables held in memory.
#[derive(Debug)]
pub struct MemoryProvider {
    bounds: (i32, i32),
    tables: BTreeMap<i32, ProviderTable>,
    extract_calls: AtomicUsize,
}

impl MemoryProvider {
    pub fn new(min_year: i32, max_year: i32) -> Self {
        Self {
            bounds: (min_year, max_year),
            tables: BTreeMap::new(),
            extract_calls: AtomicUsize::new(0),
        }
    }

    /// Add or replace the table served for `year`.
    pub fn with_table(mut self, year: i32, table: ProviderTable) -> Self {
        self.tables.insert(year, table);
        self
    }

    /// Parse a fixture document.
    pub fn from_json(content: &str) -> Result<Self, ProviderError> {
        let doc: FixtureDocument = serde_json::from_str(content)
            .map_err(|e| ProviderError::Malformed(format!("fixture document: {e}")))?;
        Ok(Self {
            bounds: (doc.min_year, doc.max_year),
            tables: doc.years,
            extract_calls: AtomicUsize::new(0),
        })
    }

    /// Load a fixture document from disk.
    pub fn from_json_file(path: &Path) -> Result<Self, ProviderError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::Unavailable(format!("read fixture {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    /// How many extract reads have been served so far.
    pub fn extract_calls(&self) -> usize {
        self.extract_calls.load(Ordering::SeqCst)
    }
}

impl UpstreamProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn get_year_bounds(&self) -> Result<(i32, i32), ProviderError> {
        Ok(self.bounds)
    }

    fn fetch_year_extract(&self, year: i32) -> Result<ProviderTable, ProviderError> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.tables.get(&year).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fixture_document() {
        let doc = r#"{
            "min_year": 2000,
            "max_year": 2024,
            "years": {
                "2024": { "columns": ["grade_level", "n_students"], "rows": [["TOTAL", 90000]] }
            }
        }"#;
        let p = MemoryProvider::from_json(doc).unwrap();
        assert_eq!(p.get_year_bounds().unwrap(), (2000, 2024));
        assert_eq!(p.fetch_year_extract(2024).unwrap().row_count(), 1);
        assert_eq!(p.fetch_year_extract(2010).unwrap(), ProviderTable::empty());
        assert_eq!(p.extract_calls(), 2);
    }

    #[test]
    fn malformed_document_is_reported() {
        let err = MemoryProvider::from_json("{\"min_year\": \"x\"}").unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
    }

    #[test]
    fn missing_file_is_unavailable() {
        let err = MemoryProvider::from_json_file(Path::new("/nonexistent/fixture.json")).unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)));
    }
}
