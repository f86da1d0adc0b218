//! Canonical enrollment rows.

use super::grade::GradeLevel;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Level of aggregation of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    State,
    District,
    School,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::State => "State",
            EntityType::District => "District",
            EntityType::School => "School",
        }
    }

    /// Derive the aggregation level from the identifiers present.
    pub fn from_ids(is_state: bool, district_id: Option<&str>, school_id: Option<&str>) -> Self {
        if school_id.is_some() {
            EntityType::School
        } else if is_state || district_id.is_none() {
            EntityType::State
        } else {
            EntityType::District
        }
    }
}

/// Wide-format row: one per (school, grade, year), subgroup counts as columns.
///
/// `None` counts are privacy-suppressed cells and are never coerced to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub end_year: i32,
    pub district_id: Option<String>,
    pub school_id: Option<String>,
    pub district_name: Option<String>,
    pub school_name: Option<String>,
    pub is_state: bool,
    pub entity_type: EntityType,
    pub grade_level: GradeLevel,
    /// Row total across every subgroup.
    pub n_students: Option<u64>,
    /// Subgroup column name -> count.
    pub subgroups: BTreeMap<String, Option<u64>>,
    /// Columns the subgroup catalog does not know, exactly as the provider sent them.
    #[serde(default)]
    pub passthrough: BTreeMap<String, Value>,
}

impl EnrollmentRecord {
    pub fn is_district(&self) -> bool {
        self.entity_type == EntityType::District
    }

    pub fn is_school(&self) -> bool {
        self.entity_type == EntityType::School
    }

    /// Count for a subgroup column; `None` when absent or suppressed.
    pub fn subgroup(&self, column: &str) -> Option<u64> {
        self.subgroups.get(column).copied().flatten()
    }
}

/// Long-format row: one per (school, grade, year, subgroup).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TidyRecord {
    pub end_year: i32,
    pub district_id: Option<String>,
    pub school_id: Option<String>,
    pub district_name: Option<String>,
    pub school_name: Option<String>,
    pub is_state: bool,
    pub entity_type: EntityType,
    pub grade_level: GradeLevel,
    pub subgroup: String,
    pub n_students: Option<u64>,
    /// Share of the row total, `None` when either count is unknown or the total is zero.
    pub pct: Option<f64>,
    /// Wide columns the subgroup catalog does not know, carried unconverted.
    pub passthrough: BTreeMap<String, Value>,
}
