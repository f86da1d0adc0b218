//! Deterministic synthetic extracts for development and tests.
//!
//! Produces a provider-native table shaped like a real publication: a state
//! row, district rows and school rows for every grade plus the `TOTAL`
//! sentinel. Race and gender counts always add up to the row total, and cells
//! below 10 are suppressed with `*` the way the data owner does it. The data
//! is fake and must never be mistaken for published figures.

use super::memory::MemoryProvider;
use super::provider::ProviderTable;
use serde_json::{json, Value};

/// Provider column names emitted by the generator.
pub const SYNTHETIC_COLUMNS: [&str; 16] = [
    "end_year",
    "District ID",
    "District Name",
    "School ID",
    "School Name",
    "Grade",
    "Row Total",
    "White",
    "Black",
    "Hispanic",
    "Asian",
    "American Indian",
    "Pacific Islander",
    "Two or More Races",
    "Male",
    "Female",
];

const GRADES: [&str; 6] = ["K", "01", "02", "03", "04", "05"];
const SUPPRESSION_THRESHOLD: u64 = 10;

#[derive(Debug, Clone, Copy, Default)]
struct Counts {
    total: u64,
    race: [u64; 7],
    male: u64,
}

impl Counts {
    fn for_school(year: i32, school: usize, grade: usize) -> Self {
        let seed = year as u64 * 31 + school as u64 * 7 + grade as u64 * 3;
        let total = 20 + seed % 40;
        let white = total * 70 / 100;
        let black = total / 100;
        let hispanic = total * 15 / 100;
        let asian = total * 2 / 100;
        let native = total * 4 / 100;
        let pacific = 0;
        let multi = total - white - black - hispanic - asian - native - pacific;
        Self {
            total,
            race: [white, black, hispanic, asian, native, pacific, multi],
            male: total / 2 + total % 2,
        }
    }

    fn add(&mut self, other: &Counts) {
        self.total += other.total;
        for (a, b) in self.race.iter_mut().zip(other.race.iter()) {
            *a += b;
        }
        self.male += other.male;
    }

    fn cells(&self) -> Vec<Value> {
        let mut cells = vec![json!(self.total)];
        cells.extend(self.race.iter().map(|&n| suppress(n)));
        cells.push(suppress(self.male));
        cells.push(suppress(self.total - self.male));
        cells
    }
}

fn suppress(n: u64) -> Value {
    if n > 0 && n < SUPPRESSION_THRESHOLD {
        json!("*")
    } else {
        json!(n)
    }
}

fn id_cells(
    year: i32,
    district: Option<usize>,
    school: Option<(usize, usize)>,
    grade: &str,
) -> Vec<Value> {
    let district_id = district.map(|d| format!("{:02}01000", d + 1));
    let district_name = district.map(|d| format!("Synthetic District #{}", d + 1));
    let school_id = school.map(|(d, s)| format!("{:02}01{:03}", d + 1, s + 1));
    let school_name = school.map(|(d, s)| format!("Synthetic School {}-{}", d + 1, s + 1));
    vec![
        json!(year),
        json!(district_id),
        json!(district_name),
        json!(school_id),
        json!(school_name),
        json!(grade),
    ]
}

/// One year's table with `districts` districts of `schools_per_district` schools.
///
/// Row count is `(1 + districts + districts * schools_per_district) * 7`.
pub fn synthetic_table(year: i32, districts: usize, schools_per_district: usize) -> ProviderTable {
    let mut rows = Vec::new();
    let grade_count = GRADES.len() + 1;
    let mut state = vec![Counts::default(); grade_count];

    for d in 0..districts {
        let mut district = vec![Counts::default(); grade_count];
        for s in 0..schools_per_district {
            let school_index = d * schools_per_district + s;
            let mut school_total = Counts::default();
            for (g, grade) in GRADES.iter().enumerate() {
                let counts = Counts::for_school(year, school_index, g);
                school_total.add(&counts);
                district[g].add(&counts);
                let mut row = id_cells(year, Some(d), Some((d, s)), grade);
                row.extend(counts.cells());
                rows.push(row);
            }
            district[GRADES.len()].add(&school_total);
            let mut row = id_cells(year, Some(d), Some((d, s)), "TOTAL");
            row.extend(school_total.cells());
            rows.push(row);
        }
        for (g, counts) in district.iter().enumerate() {
            state[g].add(counts);
            let grade = GRADES.get(g).copied().unwrap_or("TOTAL");
            let mut row = id_cells(year, Some(d), None, grade);
            row.extend(counts.cells());
            rows.push(row);
        }
    }

    for (g, counts) in state.iter().enumerate() {
        let grade = GRADES.get(g).copied().unwrap_or("TOTAL");
        let mut row = id_cells(year, None, None, grade);
        row.extend(counts.cells());
        rows.push(row);
    }

    ProviderTable::new(
        SYNTHETIC_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows,
    )
}

/// Provider serving a synthetic table for every year in the bounds.
///
/// The number of schools varies with the year so per-year row counts differ.
pub fn synthetic_provider(min_year: i32, max_year: i32) -> MemoryProvider {
    (min_year..=max_year).fold(MemoryProvider::new(min_year, max_year), |p, year| {
        let schools = 2 + year.rem_euclid(3) as usize;
        p.with_table(year, synthetic_table(year, 2, schools))
    })
}
