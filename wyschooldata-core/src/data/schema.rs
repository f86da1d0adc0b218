//! Columnar view of extracts for downstream analysis.

use crate::domain::{TidyExtract, WideExtract};
use polars::prelude::*;
use serde_json::Value;
use std::collections::BTreeMap;

/// Names a passthrough column may not take in either frame.
static RESERVED_COLUMNS: [&str; 11] = [
    "end_year",
    "district_id",
    "school_id",
    "district_name",
    "school_name",
    "is_state",
    "entity_type",
    "grade_level",
    "subgroup",
    "n_students",
    "pct",
];

/// Expected schema for enrollment frames
pub struct EnrollmentSchema;

impl EnrollmentSchema {
    fn identifier_fields() -> Vec<Field> {
        vec![
            Field::new("end_year".into(), DataType::Int32),
            Field::new("district_id".into(), DataType::String),
            Field::new("school_id".into(), DataType::String),
            Field::new("district_name".into(), DataType::String),
            Field::new("school_name".into(), DataType::String),
            Field::new("is_state".into(), DataType::Boolean),
            Field::new("entity_type".into(), DataType::String),
            Field::new("grade_level".into(), DataType::String),
        ]
    }

    /// Wide schema: identifiers, `n_students`, one count column per subgroup,
    /// then one text column per passthrough column.
    pub fn wide_schema(subgroup_columns: &[String], passthrough_columns: &[String]) -> Schema {
        let mut fields = Self::identifier_fields();
        fields.push(Field::new("n_students".into(), DataType::UInt64));
        fields.extend(
            subgroup_columns
                .iter()
                .map(|c| Field::new(c.as_str().into(), DataType::UInt64)),
        );
        fields.extend(passthrough_fields(passthrough_columns, &RESERVED_COLUMNS));
        Schema::from_iter(fields)
    }

    /// Tidy schema: identifiers, `subgroup`, `n_students`, `pct`, then one text
    /// column per passthrough column.
    pub fn tidy_schema(passthrough_columns: &[String]) -> Schema {
        let mut fields = Self::identifier_fields();
        fields.push(Field::new("subgroup".into(), DataType::String));
        fields.push(Field::new("n_students".into(), DataType::UInt64));
        fields.push(Field::new("pct".into(), DataType::Float64));
        fields.extend(passthrough_fields(passthrough_columns, &RESERVED_COLUMNS));
        Schema::from_iter(fields)
    }
}

fn passthrough_fields<'a>(
    columns: &'a [String],
    taken: &'a [&'static str],
) -> impl Iterator<Item = Field> + 'a {
    columns
        .iter()
        .map(move |c| Field::new(frame_name(c, taken).into(), DataType::String))
}

/// Frame column name for a passthrough column; suffixed with `_raw` when it
/// would clash with a fixed column.
fn frame_name(column: &str, taken: &[&str]) -> String {
    if taken.contains(&column) {
        format!("{column}_raw")
    } else {
        column.to_string()
    }
}

/// Raw provider cell rendered as text; JSON null stays null.
fn raw_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn passthrough_column<'r>(
    column: &str,
    taken: &[&str],
    rows: impl Iterator<Item = &'r BTreeMap<String, Value>>,
) -> Column {
    Column::new(
        frame_name(column, taken).into(),
        rows.map(|p| raw_text(p.get(column))).collect::<Vec<Option<String>>>(),
    )
}

macro_rules! identifier_columns {
    ($records:expr) => {{
        let records = $records;
        vec![
            Column::new(
                "end_year".into(),
                records.iter().map(|r| r.end_year).collect::<Vec<i32>>(),
            ),
            Column::new(
                "district_id".into(),
                records.iter().map(|r| r.district_id.clone()).collect::<Vec<Option<String>>>(),
            ),
            Column::new(
                "school_id".into(),
                records.iter().map(|r| r.school_id.clone()).collect::<Vec<Option<String>>>(),
            ),
            Column::new(
                "district_name".into(),
                records.iter().map(|r| r.district_name.clone()).collect::<Vec<Option<String>>>(),
            ),
            Column::new(
                "school_name".into(),
                records.iter().map(|r| r.school_name.clone()).collect::<Vec<Option<String>>>(),
            ),
            Column::new(
                "is_state".into(),
                records.iter().map(|r| r.is_state).collect::<Vec<bool>>(),
            ),
            Column::new(
                "entity_type".into(),
                records.iter().map(|r| r.entity_type.as_str()).collect::<Vec<&str>>(),
            ),
            Column::new(
                "grade_level".into(),
                records.iter().map(|r| r.grade_level.label()).collect::<Vec<String>>(),
            ),
        ]
    }};
}

/// Build a wide `DataFrame`; suppressed counts become nulls and passthrough
/// cells are kept as text.
pub fn wide_to_dataframe(extract: &WideExtract) -> PolarsResult<DataFrame> {
    let records = &extract.records;
    let mut columns = identifier_columns!(records);
    columns.push(Column::new(
        "n_students".into(),
        records.iter().map(|r| r.n_students).collect::<Vec<Option<u64>>>(),
    ));
    for name in &extract.subgroup_columns {
        columns.push(Column::new(
            name.as_str().into(),
            records.iter().map(|r| r.subgroup(name)).collect::<Vec<Option<u64>>>(),
        ));
    }
    for name in &extract.passthrough_columns {
        columns.push(passthrough_column(
            name,
            &RESERVED_COLUMNS,
            records.iter().map(|r| &r.passthrough),
        ));
    }
    DataFrame::new(columns)
}

/// Build a tidy `DataFrame`. Every unrecognized column becomes a trailing text
/// column holding the raw provider cell.
pub fn tidy_to_dataframe(extract: &TidyExtract) -> PolarsResult<DataFrame> {
    let records = &extract.records;
    let mut columns = identifier_columns!(records);
    columns.push(Column::new(
        "subgroup".into(),
        records.iter().map(|r| r.subgroup.as_str()).collect::<Vec<&str>>(),
    ));
    columns.push(Column::new(
        "n_students".into(),
        records.iter().map(|r| r.n_students).collect::<Vec<Option<u64>>>(),
    ));
    columns.push(Column::new(
        "pct".into(),
        records.iter().map(|r| r.pct).collect::<Vec<Option<f64>>>(),
    ));
    for name in extract.unrecognized_columns() {
        columns.push(passthrough_column(
            name,
            &RESERVED_COLUMNS,
            records.iter().map(|r| &r.passthrough),
        ));
    }
    DataFrame::new(columns)
}
