//! Wide-to-long reshaping.

use crate::data::{SubgroupCatalog, TOTAL_COLUMN, TOTAL_LABEL};
use crate::domain::{EnrollmentRecord, TidyDiagnostic, TidyExtract, TidyRecord, WideExtract};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Reshapes a wide extract into one row per (entity, grade, year, subgroup).
///
/// Labels come from the subgroup catalog. Columns it does not know are carried
/// unconverted on every output row and reported as diagnostics.
pub struct TidyTransformer<'a> {
    catalog: &'a SubgroupCatalog,
}

/// A recognized wide column and the label it becomes.
struct Recognized<'c> {
    column: &'c str,
    label: &'c str,
}

impl<'a> TidyTransformer<'a> {
    pub fn new(catalog: &'a SubgroupCatalog) -> Self {
        Self { catalog }
    }

    pub fn tidy(&self, extract: WideExtract) -> TidyExtract {
        let recognized = self.recognized_columns(&extract);
        // Passthrough columns, plus count columns this catalog has no label for.
        let unrecognized: Vec<&str> = extract
            .passthrough_columns
            .iter()
            .chain(
                extract
                    .subgroup_columns
                    .iter()
                    .filter(|c| self.catalog.label_for(c).is_none()),
            )
            .map(String::as_str)
            .collect();

        let mut diagnostics = Vec::new();
        for column in &unrecognized {
            warn!(column = *column, "unrecognized subgroup column passed through");
            diagnostics.push(TidyDiagnostic::UnrecognizedColumn {
                column: column.to_string(),
            });
        }

        let mut records = Vec::with_capacity(extract.len() * recognized.len());
        for (row, wide) in extract.records.iter().enumerate() {
            diagnostics.extend(self.check_partitions(row, wide));

            let passthrough: BTreeMap<String, Value> = unrecognized
                .iter()
                .map(|c| (c.to_string(), raw_value(wide, c)))
                .collect();

            for r in &recognized {
                let n_students = count(wide, r.column);
                records.push(TidyRecord {
                    end_year: wide.end_year,
                    district_id: wide.district_id.clone(),
                    school_id: wide.school_id.clone(),
                    district_name: wide.district_name.clone(),
                    school_name: wide.school_name.clone(),
                    is_state: wide.is_state,
                    entity_type: wide.entity_type,
                    grade_level: wide.grade_level,
                    subgroup: r.label.to_string(),
                    n_students,
                    pct: share(n_students, wide.n_students),
                    passthrough: passthrough.clone(),
                });
            }
        }

        debug!(
            wide_rows = extract.len(),
            subgroups = recognized.len(),
            tidy_rows = records.len(),
            "reshaped extract"
        );

        TidyExtract {
            records,
            diagnostics,
        }
    }

    /// Recognized columns present in the extract, in catalog order. The row
    /// total is always present.
    fn recognized_columns(&self, extract: &WideExtract) -> Vec<Recognized<'a>> {
        let mut out: Vec<Recognized<'a>> = self
            .catalog
            .entries
            .iter()
            .filter(|e| e.column == TOTAL_COLUMN || extract.subgroup_columns.contains(&e.column))
            .map(|e| Recognized {
                column: e.column.as_str(),
                label: e.label.as_str(),
            })
            .collect();
        if !out.iter().any(|r| r.column == TOTAL_COLUMN) {
            out.insert(
                0,
                Recognized {
                    column: TOTAL_COLUMN,
                    label: TOTAL_LABEL,
                },
            );
        }
        out
    }

    fn check_partitions(&self, row: usize, wide: &EnrollmentRecord) -> Vec<TidyDiagnostic> {
        let Some(total) = wide.n_students else {
            return Vec::new();
        };

        let mut out = Vec::new();
        for partition in &self.catalog.partitions {
            let counts: Option<Vec<u64>> = partition
                .members
                .iter()
                .map(|label| {
                    self.catalog
                        .column_for_label(label)
                        .and_then(|column| count(wide, column))
                })
                .collect();
            let Some(counts) = counts else { continue };

            // u64 counts cannot overflow a u128 sum
            let sum: u128 = counts.iter().map(|&n| u128::from(n)).sum();
            if sum != u128::from(total) {
                warn!(row, partition = partition.name.as_str(), total, sum, "partition does not add up to total");
                out.push(TidyDiagnostic::TotalMismatch {
                    row,
                    partition: partition.name.clone(),
                    total,
                    sum,
                });
            }
        }
        out
    }
}

fn count(wide: &EnrollmentRecord, column: &str) -> Option<u64> {
    if column == TOTAL_COLUMN {
        wide.n_students
    } else {
        wide.subgroup(column)
    }
}

/// The provider's raw cell for a passthrough column, or the decoded count for
/// a count column the catalog does not label.
fn raw_value(wide: &EnrollmentRecord, column: &str) -> Value {
    match wide.passthrough.get(column) {
        Some(value) => value.clone(),
        None => wide.subgroup(column).map_or(Value::Null, Value::from),
    }
}

fn share(n: Option<u64>, total: Option<u64>) -> Option<f64> {
    match (n, total) {
        (Some(n), Some(total)) if total > 0 => Some(n as f64 / total as f64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntityType, GradeLevel};
    use serde_json::json;

    fn record(total: Option<u64>, subgroups: &[(&str, Option<u64>)]) -> EnrollmentRecord {
        EnrollmentRecord {
            end_year: 2024,
            district_id: Some("0101000".into()),
            school_id: Some("0101001".into()),
            district_name: Some("Albany County #1".into()),
            school_name: Some("Beitel Elementary".into()),
            is_state: false,
            entity_type: EntityType::School,
            grade_level: GradeLevel::Kindergarten,
            n_students: total,
            subgroups: subgroups
                .iter()
                .map(|(c, n)| (c.to_string(), *n))
                .collect(),
            passthrough: BTreeMap::new(),
        }
    }

    fn extract(columns: &[&str], records: Vec<EnrollmentRecord>) -> WideExtract {
        WideExtract::new(columns.iter().map(|c| c.to_string()).collect(), records)
    }

    #[test]
    fn one_row_per_recognized_column() {
        let catalog = SubgroupCatalog::v1();
        let wide = extract(
            &["male", "female"],
            vec![
                record(Some(20), &[("male", Some(12)), ("female", Some(8))]),
                record(Some(10), &[("male", Some(4)), ("female", Some(6))]),
            ],
        );
        let out = TidyTransformer::new(&catalog).tidy(wide);

        assert_eq!(out.len(), 2 * 3);
        assert_eq!(out.subgroups(), vec!["total_enrollment", "male", "female"]);
        assert!(out.diagnostics.is_empty());
        assert_eq!(out.records[1].n_students, Some(12));
        assert_eq!(out.records[1].pct, Some(0.6));
        assert_eq!(out.records[0].pct, Some(1.0));
        assert_eq!(out.records[3].school_name.as_deref(), Some("Beitel Elementary"));
    }

    #[test]
    fn rows_follow_catalog_order_not_header_order() {
        let catalog = SubgroupCatalog::v1();
        let wide = extract(
            &["female", "white", "male"],
            vec![record(None, &[("female", None), ("white", None), ("male", None)])],
        );
        let out = TidyTransformer::new(&catalog).tidy(wide);
        assert_eq!(out.subgroups(), vec!["total_enrollment", "white", "male", "female"]);
    }

    #[test]
    fn suppressed_counts_stay_unknown() {
        let catalog = SubgroupCatalog::v1();
        let wide = extract(&["lep"], vec![record(Some(0), &[("lep", None)])]);
        let out = TidyTransformer::new(&catalog).tidy(wide);
        assert_eq!(out.records[1].n_students, None);
        assert_eq!(out.records[1].pct, None);
        // zero total has no meaningful share
        assert_eq!(out.records[0].pct, None);
    }

    #[test]
    fn unrecognized_columns_pass_through_and_are_flagged() {
        let catalog = SubgroupCatalog::v1();
        let mut first = record(Some(5), &[("male", Some(5))]);
        first.passthrough.insert("school_type".into(), json!("Charter"));
        first.passthrough.insert("homeless".into(), json!("1,204"));
        let mut second = record(Some(6), &[("male", Some(6))]);
        second.passthrough.insert("school_type".into(), Value::Null);
        second.passthrough.insert("homeless".into(), json!("*"));

        let wide = extract(&["male"], vec![first, second])
            .with_passthrough_columns(vec!["school_type".into(), "homeless".into()]);
        let out = TidyTransformer::new(&catalog).tidy(wide);

        assert_eq!(out.len(), 2 * 2);
        assert_eq!(out.unrecognized_columns(), vec!["school_type", "homeless"]);
        assert!(out.iter().all(|r| r.subgroup != "homeless"));
        assert_eq!(out.records[0].passthrough.get("school_type"), Some(&json!("Charter")));
        assert_eq!(out.records[1].passthrough.get("homeless"), Some(&json!("1,204")));
        assert_eq!(out.records[3].passthrough.get("homeless"), Some(&json!("*")));
        assert_eq!(out.records[3].passthrough.get("school_type"), Some(&Value::Null));
    }

    #[test]
    fn count_columns_unknown_to_catalog_are_not_dropped() {
        let catalog = SubgroupCatalog::v1();
        let wide = extract(
            &["male", "migrant"],
            vec![record(Some(5), &[("male", Some(5)), ("migrant", Some(2))])],
        );
        let out = TidyTransformer::new(&catalog).tidy(wide);
        assert_eq!(out.len(), 2);
        assert_eq!(out.unrecognized_columns(), vec!["migrant"]);
        assert_eq!(out.records[0].passthrough.get("migrant"), Some(&json!(2)));
    }

    #[test]
    fn partition_sum_near_u64_max_does_not_overflow() {
        let catalog = SubgroupCatalog::v1();
        let wide = extract(
            &["male", "female"],
            vec![
                record(Some(u64::MAX), &[("male", Some(u64::MAX)), ("female", Some(1))]),
                record(Some(u64::MAX), &[("male", Some(u64::MAX - 1)), ("female", Some(1))]),
            ],
        );
        let out = TidyTransformer::new(&catalog).tidy(wide);
        assert_eq!(
            out.diagnostics,
            vec![TidyDiagnostic::TotalMismatch {
                row: 0,
                partition: "gender".into(),
                total: u64::MAX,
                sum: u128::from(u64::MAX) + 1,
            }]
        );
    }

    #[test]
    fn partition_mismatch_is_reported_per_row() {
        let catalog = SubgroupCatalog::v1();
        let wide = extract(
            &["male", "female"],
            vec![
                record(Some(20), &[("male", Some(12)), ("female", Some(8))]),
                record(Some(20), &[("male", Some(12)), ("female", Some(7))]),
                record(Some(20), &[("male", Some(12)), ("female", None)]),
            ],
        );
        let out = TidyTransformer::new(&catalog).tidy(wide);

        assert_eq!(
            out.diagnostics,
            vec![TidyDiagnostic::TotalMismatch {
                row: 1,
                partition: "gender".into(),
                total: 20,
                sum: 19,
            }]
        );
    }

    #[test]
    fn empty_extract_is_empty() {
        let catalog = SubgroupCatalog::v1();
        let out = TidyTransformer::new(&catalog).tidy(WideExtract::default());
        assert!(out.is_empty());
        assert!(out.diagnostics.is_empty());
    }
}
