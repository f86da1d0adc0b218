//! Versioned mapping from provider column names to the canonical schema.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Version of the built-in column map.
pub const COLUMN_MAP_VERSION: u32 = 1;

/// Canonical identifying columns of a wide row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalColumn {
    EndYear,
    DistrictId,
    SchoolId,
    DistrictName,
    SchoolName,
    IsState,
    GradeLevel,
    NStudents,
}

impl CanonicalColumn {
    pub const ALL: [CanonicalColumn; 8] = [
        CanonicalColumn::EndYear,
        CanonicalColumn::DistrictId,
        CanonicalColumn::SchoolId,
        CanonicalColumn::DistrictName,
        CanonicalColumn::SchoolName,
        CanonicalColumn::IsState,
        CanonicalColumn::GradeLevel,
        CanonicalColumn::NStudents,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CanonicalColumn::EndYear => "end_year",
            CanonicalColumn::DistrictId => "district_id",
            CanonicalColumn::SchoolId => "school_id",
            CanonicalColumn::DistrictName => "district_name",
            CanonicalColumn::SchoolName => "school_name",
            CanonicalColumn::IsState => "is_state",
            CanonicalColumn::GradeLevel => "grade_level",
            CanonicalColumn::NStudents => "n_students",
        }
    }

    /// Columns a provider extract must carry.
    pub fn is_required(&self) -> bool {
        matches!(self, CanonicalColumn::GradeLevel | CanonicalColumn::NStudents)
    }
}

/// Provider spellings for each canonical column, plus the markers the provider
/// uses for suppressed cells. Aliases are stored normalized
/// (see [`normalize_column_name`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub version: u32,
    pub end_year: Vec<String>,
    pub district_id: Vec<String>,
    pub school_id: Vec<String>,
    pub district_name: Vec<String>,
    pub school_name: Vec<String>,
    pub is_state: Vec<String>,
    pub grade_level: Vec<String>,
    pub n_students: Vec<String>,
    pub suppression_markers: Vec<String>,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self::v1()
    }
}

impl ColumnMap {
    /// Built-in column map, version 1.
    pub fn v1() -> Self {
        fn names(list: &[&str]) -> Vec<String> {
            list.iter().map(|s| s.to_string()).collect()
        }

        Self {
            version: COLUMN_MAP_VERSION,
            end_year: names(&["end_year", "year", "school_year_end"]),
            district_id: names(&["district_id", "dist_id", "district_number", "lea_id"]),
            school_id: names(&["school_id", "campus_id", "school_number"]),
            district_name: names(&["district_name", "district", "lea_name"]),
            school_name: names(&["school_name", "campus_name", "school"]),
            is_state: names(&["is_state", "state_flag"]),
            grade_level: names(&["grade_level", "grade"]),
            n_students: names(&["n_students", "row_total", "total", "total_enrollment"]),
            suppression_markers: names(&["*", "**", "<10", "n/a", "na", "--", "."]),
        }
    }

    pub fn aliases(&self, column: CanonicalColumn) -> &[String] {
        match column {
            CanonicalColumn::EndYear => &self.end_year,
            CanonicalColumn::DistrictId => &self.district_id,
            CanonicalColumn::SchoolId => &self.school_id,
            CanonicalColumn::DistrictName => &self.district_name,
            CanonicalColumn::SchoolName => &self.school_name,
            CanonicalColumn::IsState => &self.is_state,
            CanonicalColumn::GradeLevel => &self.grade_level,
            CanonicalColumn::NStudents => &self.n_students,
        }
    }

    /// Canonical column a provider column maps onto, if any.
    pub fn resolve(&self, provider_column: &str) -> Option<CanonicalColumn> {
        let norm = normalize_column_name(provider_column);
        CanonicalColumn::ALL
            .into_iter()
            .find(|c| self.aliases(*c).iter().any(|a| *a == norm))
    }

    /// True when a text cell is one of the provider's suppression markers.
    pub fn is_suppressed(&self, cell: &str) -> bool {
        let cell = cell.trim();
        cell.is_empty()
            || self
                .suppression_markers
                .iter()
                .any(|m| m.eq_ignore_ascii_case(cell))
    }

    /// No alias may belong to two canonical columns.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for column in CanonicalColumn::ALL {
            if column.is_required() && self.aliases(column).is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "required column '{}' has no aliases",
                    column.name()
                )));
            }
            for alias in self.aliases(column) {
                if !seen.insert(alias.as_str()) {
                    return Err(ConfigError::Invalid(format!(
                        "alias '{alias}' is mapped more than once"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Lowercase, trim, and fold spaces, hyphens and dots into underscores.
pub fn normalize_column_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_sep = true;
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_sep = false;
        } else if !last_sep {
            out.push('_');
            last_sep = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_provider_headers() {
        assert_eq!(normalize_column_name("  District ID "), "district_id");
        assert_eq!(normalize_column_name("Two-or-More Races"), "two_or_more_races");
        assert_eq!(normalize_column_name("GRADE"), "grade");
        assert_eq!(normalize_column_name("row.total"), "row_total");
    }

    #[test]
    fn resolves_aliases() {
        let m = ColumnMap::v1();
        assert_eq!(m.resolve("Campus ID"), Some(CanonicalColumn::SchoolId));
        assert_eq!(m.resolve("ROW_TOTAL"), Some(CanonicalColumn::NStudents));
        assert_eq!(m.resolve("Grade"), Some(CanonicalColumn::GradeLevel));
        assert_eq!(m.resolve("white"), None);
    }

    #[test]
    fn suppression_markers_are_case_insensitive() {
        let m = ColumnMap::v1();
        assert!(m.is_suppressed("*"));
        assert!(m.is_suppressed("N/A"));
        assert!(m.is_suppressed("  "));
        assert!(!m.is_suppressed("0"));
    }

    #[test]
    fn v1_is_valid() {
        assert!(ColumnMap::v1().validate().is_ok());
    }

    #[test]
    fn rejects_alias_mapped_twice() {
        let mut m = ColumnMap::v1();
        m.school_id.push("district_id".into());
        assert!(m.validate().is_err());
    }
}
