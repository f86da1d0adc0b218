//! Single-year retrieval and normalization.

use crate::data::{decode_table, ColumnMap, SubgroupCatalog};
use crate::domain::WideExtract;
use crate::error::EnrollmentError;
use crate::upstream::Upstream;
use crate::years::YearRangeValidator;
use tracing::debug;

/// Fetches one year's extract and decodes it into the canonical wide schema.
pub struct SingleYearFetcher<'a> {
    upstream: &'a Upstream,
    columns: &'a ColumnMap,
    catalog: &'a SubgroupCatalog,
}

impl<'a> SingleYearFetcher<'a> {
    pub fn new(upstream: &'a Upstream, columns: &'a ColumnMap, catalog: &'a SubgroupCatalog) -> Self {
        Self {
            upstream,
            columns,
            catalog,
        }
    }

    /// Validate `year`, then fetch and decode it.
    ///
    /// No extract is requested for a year outside the published bounds.
    pub fn fetch(&self, year: i32) -> Result<WideExtract, EnrollmentError> {
        YearRangeValidator::new(self.upstream).validate(year)?;
        self.fetch_validated(year)
    }

    /// Fetch a year the caller has already validated.
    pub(crate) fn fetch_validated(&self, year: i32) -> Result<WideExtract, EnrollmentError> {
        let table = self.upstream.year_extract(year)?;
        let extract = decode_table(&table, year, self.columns, self.catalog)?;
        ensure_end_year(&extract, year)?;
        debug!(
            year,
            rows = extract.len(),
            columns = extract.subgroup_columns.len(),
            "fetched enrollment extract"
        );
        Ok(extract)
    }
}

/// Every record must belong to the requested year.
fn ensure_end_year(extract: &WideExtract, year: i32) -> Result<(), EnrollmentError> {
    match extract.records.iter().position(|r| r.end_year != year) {
        None => Ok(()),
        Some(idx) => Err(EnrollmentError::SchemaMismatch(format!(
            "extract for {year} contains row {idx} with end_year {}",
            extract.records[idx].end_year
        ))),
    }
}
