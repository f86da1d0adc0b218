//! Decode a provider-native table into the canonical wide schema.
//!
//! This is the single place where provider column names and cell encodings are
//! interpreted. The result is either a typed `WideExtract` or a
//! `SchemaMismatch` naming the offending row and column.

use super::catalog::SubgroupCatalog;
use super::columns::{normalize_column_name, CanonicalColumn, ColumnMap};
use super::provider::ProviderTable;
use crate::domain::{EnrollmentRecord, EntityType, GradeLevel, WideExtract};
use crate::error::EnrollmentError;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// What a provider column position decodes into.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Canonical(CanonicalColumn),
    /// Count column the subgroup catalog recognizes.
    Subgroup(String),
    /// Anything else; kept as the raw provider cell.
    Passthrough(String),
}

/// Column layout of a provider table, resolved once per extract.
#[derive(Debug)]
struct Layout {
    slots: Vec<Slot>,
    canonical: HashMap<CanonicalColumn, usize>,
    subgroup_columns: Vec<String>,
    passthrough_columns: Vec<String>,
}

impl Layout {
    fn resolve(
        columns: &[String],
        map: &ColumnMap,
        catalog: &SubgroupCatalog,
    ) -> Result<Self, EnrollmentError> {
        let mut slots = Vec::with_capacity(columns.len());
        let mut canonical = HashMap::new();
        let mut subgroup_columns: Vec<String> = Vec::new();
        let mut passthrough_columns: Vec<String> = Vec::new();

        for (idx, name) in columns.iter().enumerate() {
            if let Some(c) = map.resolve(name) {
                if canonical.insert(c, idx).is_some() {
                    return Err(mismatch(format!(
                        "more than one provider column maps to '{}'",
                        c.name()
                    )));
                }
                slots.push(Slot::Canonical(c));
                continue;
            }

            let (column, recognized) = match catalog.resolve(name) {
                Some(column) => (column.to_string(), true),
                None => (normalize_column_name(name), false),
            };
            if column.is_empty() {
                return Err(mismatch(format!("unnamed provider column at position {idx}")));
            }
            if subgroup_columns.contains(&column) || passthrough_columns.contains(&column) {
                return Err(mismatch(format!(
                    "more than one provider column maps to '{column}'"
                )));
            }
            if recognized {
                subgroup_columns.push(column.clone());
                slots.push(Slot::Subgroup(column));
            } else {
                passthrough_columns.push(column.clone());
                slots.push(Slot::Passthrough(column));
            }
        }

        for c in CanonicalColumn::ALL.into_iter().filter(|c| c.is_required()) {
            if !canonical.contains_key(&c) {
                return Err(mismatch(format!("missing required column '{}'", c.name())));
            }
        }

        Ok(Self {
            slots,
            canonical,
            subgroup_columns,
            passthrough_columns,
        })
    }

    fn cell<'a>(&self, row: &'a [Value], column: CanonicalColumn) -> Option<&'a Value> {
        self.canonical.get(&column).map(|&idx| &row[idx])
    }
}

/// Decode one year's provider table.
///
/// `year` is stamped onto rows when the provider omits an end-year column; a
/// provider that does send one is trusted here and checked by the caller.
pub fn decode_table(
    table: &ProviderTable,
    year: i32,
    map: &ColumnMap,
    catalog: &SubgroupCatalog,
) -> Result<WideExtract, EnrollmentError> {
    if table.columns.is_empty() && table.rows.is_empty() {
        return Ok(WideExtract::default());
    }

    let layout = Layout::resolve(&table.columns, map, catalog)?;
    let mut records = Vec::with_capacity(table.rows.len());

    for (row_idx, row) in table.rows.iter().enumerate() {
        if row.len() != table.columns.len() {
            return Err(mismatch(format!(
                "row {row_idx} has {} cells, expected {}",
                row.len(),
                table.columns.len()
            )));
        }
        records.push(decode_row(row, row_idx, year, &layout, map, &table.columns)?);
    }

    Ok(WideExtract::new(layout.subgroup_columns, records)
        .with_passthrough_columns(layout.passthrough_columns))
}

fn decode_row(
    row: &[Value],
    row_idx: usize,
    year: i32,
    layout: &Layout,
    map: &ColumnMap,
    names: &[String],
) -> Result<EnrollmentRecord, EnrollmentError> {
    let at = |column: CanonicalColumn, reason: String| {
        mismatch(format!("row {row_idx}, column '{}': {reason}", column.name()))
    };

    let end_year = match layout.cell(row, CanonicalColumn::EndYear) {
        None => year,
        Some(v) => match parse_count(v, map) {
            Ok(Some(y)) => i32::try_from(y).map_err(|_| at(CanonicalColumn::EndYear, format!("{y} is not a year")))?,
            Ok(None) => return Err(at(CanonicalColumn::EndYear, "end year is missing".into())),
            Err(reason) => return Err(at(CanonicalColumn::EndYear, reason)),
        },
    };

    let text = |column: CanonicalColumn| -> Option<String> {
        layout
            .cell(row, column)
            .and_then(|v| parse_text(v, map))
    };
    let district_id = text(CanonicalColumn::DistrictId);
    let school_id = text(CanonicalColumn::SchoolId);
    let district_name = text(CanonicalColumn::DistrictName);
    let school_name = text(CanonicalColumn::SchoolName);

    let is_state = match layout.cell(row, CanonicalColumn::IsState) {
        Some(v) => parse_flag(v).map_err(|reason| at(CanonicalColumn::IsState, reason))?,
        None => district_id.is_none() && school_id.is_none(),
    };

    let grade_level = match layout.cell(row, CanonicalColumn::GradeLevel).and_then(|v| parse_text(v, map)) {
        Some(label) => label
            .parse::<GradeLevel>()
            .map_err(|e| at(CanonicalColumn::GradeLevel, e.to_string()))?,
        None => return Err(at(CanonicalColumn::GradeLevel, "grade is missing".into())),
    };

    let n_students = match layout.cell(row, CanonicalColumn::NStudents) {
        Some(v) => parse_count(v, map).map_err(|reason| at(CanonicalColumn::NStudents, reason))?,
        None => None,
    };

    let mut subgroups = BTreeMap::new();
    let mut passthrough = BTreeMap::new();
    for (idx, slot) in layout.slots.iter().enumerate() {
        match slot {
            Slot::Subgroup(column) => {
                let count = parse_count(&row[idx], map).map_err(|reason| {
                    mismatch(format!("row {row_idx}, column '{}': {reason}", names[idx]))
                })?;
                subgroups.insert(column.clone(), count);
            }
            Slot::Passthrough(column) => {
                passthrough.insert(column.clone(), row[idx].clone());
            }
            Slot::Canonical(_) => {}
        }
    }

    let entity_type =
        EntityType::from_ids(is_state, district_id.as_deref(), school_id.as_deref());

    Ok(EnrollmentRecord {
        end_year,
        district_id,
        school_id,
        district_name,
        school_name,
        is_state,
        entity_type,
        grade_level,
        n_students,
        subgroups,
        passthrough,
    })
}

/// Non-negative whole count; `None` for null or a suppression marker.
fn parse_count(value: &Value, map: &ColumnMap) -> Result<Option<u64>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                return Ok(Some(u));
            }
            match n.as_f64() {
                Some(f) => whole_count(f)
                    .map(Some)
                    .ok_or_else(|| format!("{n} is not a non-negative whole count")),
                None => Err(format!("{n} is not a non-negative whole count")),
            }
        }
        Value::String(s) => {
            if map.is_suppressed(s) {
                return Ok(None);
            }
            let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
            if let Ok(u) = cleaned.parse::<u64>() {
                return Ok(Some(u));
            }
            match cleaned.parse::<f64>().ok().and_then(whole_count) {
                Some(u) => Ok(Some(u)),
                None => Err(format!("'{s}' is not a count")),
            }
        }
        other => Err(format!("{other} is not a count")),
    }
}

/// A float that is exactly a count representable as `u64`.
fn whole_count(f: f64) -> Option<u64> {
    // 2^64 is the first float past u64::MAX
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f < u64::MAX as f64 {
        Some(f as u64)
    } else {
        None
    }
}

fn parse_text(value: &Value, map: &ColumnMap) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if map.is_suppressed(s) => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_flag(value: &Value) -> Result<bool, String> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_u64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(format!("{n} is not a flag")),
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "y" | "yes" | "1" => Ok(true),
            "false" | "f" | "n" | "no" | "0" | "" => Ok(false),
            _ => Err(format!("'{s}' is not a flag")),
        },
        Value::Null => Ok(false),
        other => Err(format!("{other} is not a flag")),
    }
}

fn mismatch(reason: String) -> EnrollmentError {
    EnrollmentError::SchemaMismatch(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(table: &ProviderTable) -> Result<WideExtract, EnrollmentError> {
        decode_table(table, 2024, &ColumnMap::v1(), &SubgroupCatalog::v1())
    }

    fn table(columns: &[&str], rows: Vec<Vec<Value>>) -> ProviderTable {
        ProviderTable::new(columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    #[test]
    fn maps_provider_columns_onto_canonical_schema() {
        let t = table(
            &["YEAR", "District ID", "Campus ID", "Campus Name", "GRADE", "ROW_TOTAL", "White", "Two or More Races"],
            vec![vec![
                json!(2024),
                json!("0101000"),
                json!("0101001"),
                json!("Lincoln Elementary"),
                json!("K"),
                json!(41),
                json!("30"),
                json!(11),
            ]],
        );
        let extract = decode(&t).unwrap();
        assert_eq!(extract.subgroup_columns, vec!["white", "multiracial"]);
        let r = &extract.records[0];
        assert_eq!(r.end_year, 2024);
        assert_eq!(r.school_id.as_deref(), Some("0101001"));
        assert_eq!(r.school_name.as_deref(), Some("Lincoln Elementary"));
        assert_eq!(r.entity_type, EntityType::School);
        assert!(!r.is_state);
        assert_eq!(r.grade_level, GradeLevel::Kindergarten);
        assert_eq!(r.n_students, Some(41));
        assert_eq!(r.subgroup("white"), Some(30));
        assert_eq!(r.subgroup("multiracial"), Some(11));
    }

    #[test]
    fn suppressed_cells_stay_missing() {
        let t = table(
            &["grade_level", "n_students", "asian", "black"],
            vec![vec![json!("TOTAL"), json!(12), json!("*"), json!(null)]],
        );
        let r = &decode(&t).unwrap().records[0];
        assert_eq!(r.subgroups.get("asian"), Some(&None));
        assert_eq!(r.subgroups.get("black"), Some(&None));
        assert_eq!(r.n_students, Some(12));
    }

    #[test]
    fn stamps_requested_year_when_column_absent() {
        let t = table(&["grade", "total"], vec![vec![json!("01"), json!(5)]]);
        let r = &decode(&t).unwrap().records[0];
        assert_eq!(r.end_year, 2024);
        assert!(r.is_state);
        assert_eq!(r.entity_type, EntityType::State);
    }

    #[test]
    fn empty_table_is_not_an_error() {
        let extract = decode(&ProviderTable::empty()).unwrap();
        assert!(extract.is_empty());

        let headed = table(&["grade_level", "n_students"], vec![]);
        assert!(decode(&headed).unwrap().is_empty());
    }

    #[test]
    fn missing_required_column_is_schema_mismatch() {
        let t = table(&["grade_level", "white"], vec![vec![json!("01"), json!(3)]]);
        match decode(&t) {
            Err(EnrollmentError::SchemaMismatch(msg)) => assert!(msg.contains("n_students")),
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
    }

    #[test]
    fn ragged_row_is_schema_mismatch() {
        let t = table(&["grade_level", "n_students"], vec![vec![json!("01")]]);
        assert!(matches!(decode(&t), Err(EnrollmentError::SchemaMismatch(_))));
    }

    #[test]
    fn negative_and_fractional_counts_are_rejected() {
        let t = table(&["grade_level", "n_students"], vec![vec![json!("01"), json!(-3)]]);
        assert!(decode(&t).is_err());
        let t = table(&["grade_level", "n_students"], vec![vec![json!("01"), json!(2.5)]]);
        assert!(decode(&t).is_err());
    }

    #[test]
    fn thousands_separators_and_whole_floats_are_counts() {
        let t = table(&["grade_level", "n_students", "male"], vec![vec![json!("TOTAL"), json!("94,012"), json!(48000.0)]]);
        let r = &decode(&t).unwrap().records[0];
        assert_eq!(r.n_students, Some(94_012));
        assert_eq!(r.subgroup("male"), Some(48_000));
    }

    #[test]
    fn unknown_columns_are_kept_raw() {
        let t = table(
            &["grade_level", "n_students", "male", "School Type", "Migrant"],
            vec![
                vec![json!("K"), json!(10), json!(5), json!("Charter"), json!("1,204")],
                vec![json!("01"), json!(12), json!(6), json!(null), json!("*")],
            ],
        );
        let extract = decode(&t).unwrap();
        assert_eq!(extract.subgroup_columns, vec!["male"]);
        assert_eq!(extract.passthrough_columns, vec!["school_type", "migrant"]);

        let first = &extract.records[0];
        assert_eq!(first.subgroup("male"), Some(5));
        assert_eq!(first.passthrough.get("school_type"), Some(&json!("Charter")));
        assert_eq!(first.passthrough.get("migrant"), Some(&json!("1,204")));
        assert_eq!(extract.records[1].passthrough.get("migrant"), Some(&json!("*")));
        assert_eq!(extract.records[1].passthrough.get("school_type"), Some(&Value::Null));
    }

    #[test]
    fn recognized_subgroup_with_text_is_rejected() {
        let t = table(&["grade_level", "n_students", "female"], vec![vec![json!("01"), json!(9), json!("Albany")]]);
        match decode(&t) {
            Err(EnrollmentError::SchemaMismatch(msg)) => assert!(msg.contains("female")),
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
    }

    #[test]
    fn counts_beyond_u64_are_rejected_not_saturated() {
        let t = table(&["grade_level", "n_students"], vec![vec![json!("01"), json!(1e30)]]);
        assert!(matches!(decode(&t), Err(EnrollmentError::SchemaMismatch(_))));
        let t = table(&["grade_level", "n_students"], vec![vec![json!("01"), json!("18446744073709551616")]]);
        assert!(matches!(decode(&t), Err(EnrollmentError::SchemaMismatch(_))));

        let t = table(&["grade_level", "n_students"], vec![vec![json!("01"), json!(u64::MAX)]]);
        assert_eq!(decode(&t).unwrap().records[0].n_students, Some(u64::MAX));
    }

    #[test]
    fn unknown_grade_is_schema_mismatch() {
        let t = table(&["grade_level", "n_students"], vec![vec![json!("13"), json!(1)]]);
        assert!(matches!(decode(&t), Err(EnrollmentError::SchemaMismatch(_))));
    }

    #[test]
    fn duplicate_mapping_is_schema_mismatch() {
        let t = table(&["grade", "grade_level", "n_students"], vec![]);
        assert!(matches!(decode(&t), Err(EnrollmentError::SchemaMismatch(_))));
    }
}
