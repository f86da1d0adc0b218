//! Per-call extracts handed back to callers.

use super::record::{EnrollmentRecord, TidyRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Wide extract: records plus the ordered headers of the subgroup columns and
/// the unrecognized (passthrough) columns present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WideExtract {
    pub subgroup_columns: Vec<String>,
    #[serde(default)]
    pub passthrough_columns: Vec<String>,
    pub records: Vec<EnrollmentRecord>,
}

impl WideExtract {
    pub fn new(subgroup_columns: Vec<String>, records: Vec<EnrollmentRecord>) -> Self {
        Self {
            subgroup_columns,
            passthrough_columns: Vec::new(),
            records,
        }
    }

    pub fn with_passthrough_columns(mut self, columns: Vec<String>) -> Self {
        self.passthrough_columns = columns;
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct `end_year` values present, ascending.
    pub fn end_years(&self) -> BTreeSet<i32> {
        self.records.iter().map(|r| r.end_year).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EnrollmentRecord> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a WideExtract {
    type Item = &'a EnrollmentRecord;
    type IntoIter = std::slice::Iter<'a, EnrollmentRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Something worth telling the caller about while reshaping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TidyDiagnostic {
    /// A wide column with no catalog label; its raw value is carried as
    /// passthrough on every row.
    UnrecognizedColumn { column: String },
    /// A partition's member counts do not add up to the row total.
    TotalMismatch {
        row: usize,
        partition: String,
        total: u64,
        /// Member sum; wider than a count so it cannot overflow.
        sum: u128,
    },
}

/// Tidy extract: long records plus diagnostics emitted while reshaping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TidyExtract {
    pub records: Vec<TidyRecord>,
    pub diagnostics: Vec<TidyDiagnostic>,
}

impl TidyExtract {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TidyRecord> {
        self.records.iter()
    }

    /// Distinct subgroup labels, in first-seen order.
    pub fn subgroups(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for r in &self.records {
            if !seen.contains(&r.subgroup.as_str()) {
                seen.push(r.subgroup.as_str());
            }
        }
        seen
    }

    pub fn unrecognized_columns(&self) -> Vec<&str> {
        self.diagnostics
            .iter()
            .filter_map(|d| match d {
                TidyDiagnostic::UnrecognizedColumn { column } => Some(column.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn total_mismatches(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d, TidyDiagnostic::TotalMismatch { .. }))
            .count()
    }
}

impl<'a> IntoIterator for &'a TidyExtract {
    type Item = &'a TidyRecord;
    type IntoIter = std::slice::Iter<'a, TidyRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
