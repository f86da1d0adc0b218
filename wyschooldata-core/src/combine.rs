//! Multi-year batches with all-or-nothing semantics.

use crate::data::{ColumnMap, SubgroupCatalog};
use crate::domain::WideExtract;
use crate::error::EnrollmentError;
use crate::fetch::SingleYearFetcher;
use crate::upstream::Upstream;
use crate::years::YearRangeValidator;
use rayon::prelude::*;
use std::collections::BTreeSet;
use tracing::info;

/// Fetches several years and concatenates them into one extract.
///
/// Years are deduplicated and validated as a set before any extract is read.
/// Distinct years run on a private rayon pool of `max_workers` threads; the
/// output is always ordered by year ascending regardless of completion order.
pub struct MultiYearCombiner<'a> {
    upstream: &'a Upstream,
    fetcher: SingleYearFetcher<'a>,
    max_workers: usize,
}

impl<'a> MultiYearCombiner<'a> {
    pub fn new(
        upstream: &'a Upstream,
        columns: &'a ColumnMap,
        catalog: &'a SubgroupCatalog,
        max_workers: usize,
    ) -> Self {
        Self {
            upstream,
            fetcher: SingleYearFetcher::new(upstream, columns, catalog),
            max_workers,
        }
    }

    pub fn fetch_many(&self, years: &[i32]) -> Result<WideExtract, EnrollmentError> {
        if years.is_empty() {
            return Err(EnrollmentError::EmptyRequest);
        }
        let distinct: Vec<i32> = years.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        let range = YearRangeValidator::new(self.upstream).validate_many(distinct.iter().copied())?;

        info!(
            years = distinct.len(),
            workers = self.max_workers,
            %range,
            "fetching multi-year batch"
        );

        let results = self.fetch_all(&distinct)?;

        // Results are in ascending year order; the first error is the lowest failing year's.
        let mut extracts = Vec::with_capacity(results.len());
        for result in results {
            extracts.push(result?);
        }

        let combined = concat(extracts);
        info!(
            years = distinct.len(),
            rows = combined.len(),
            "multi-year batch complete"
        );
        Ok(combined)
    }

    fn fetch_all(&self, years: &[i32]) -> Result<Vec<Result<WideExtract, EnrollmentError>>, EnrollmentError> {
        if self.max_workers <= 1 || years.len() == 1 {
            return Ok(years.iter().map(|&y| self.fetcher.fetch_validated(y)).collect());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers.min(years.len()))
            .thread_name(|i| format!("wyschooldata-fetch-{i}"))
            .build()
            .map_err(|e| EnrollmentError::UpstreamUnavailable(format!("worker pool: {e}")))?;

        // `collect` on an indexed parallel iterator preserves input order.
        Ok(pool.install(|| {
            years
                .par_iter()
                .map(|&y| self.fetcher.fetch_validated(y))
                .collect()
        }))
    }
}

/// Concatenate per-year extracts; both headers are the union of the per-year
/// headers in first-seen order.
fn concat(extracts: Vec<WideExtract>) -> WideExtract {
    let mut header: Vec<String> = Vec::new();
    let mut passthrough: Vec<String> = Vec::new();
    let mut records = Vec::with_capacity(extracts.iter().map(WideExtract::len).sum());
    for extract in extracts {
        union_into(&mut header, extract.subgroup_columns);
        union_into(&mut passthrough, extract.passthrough_columns);
        records.extend(extract.records);
    }
    WideExtract::new(header, records).with_passthrough_columns(passthrough)
}

fn union_into(header: &mut Vec<String>, columns: Vec<String>) {
    for column in columns {
        if !header.contains(&column) {
            header.push(column);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{synthetic_provider, ProviderError, ProviderTable, UpstreamProvider};
    use std::sync::Arc;
    use std::time::Duration;

    fn combine(provider: Arc<dyn UpstreamProvider>, years: &[i32], workers: usize) -> Result<WideExtract, EnrollmentError> {
        let upstream = Upstream::with_provider(provider, Duration::from_secs(5));
        let columns = ColumnMap::v1();
        let catalog = SubgroupCatalog::v1();
        MultiYearCombiner::new(&upstream, &columns, &catalog, workers).fetch_many(years)
    }

    /// Synthetic data that fails for chosen years.
    struct FailingYears {
        inner: crate::data::MemoryProvider,
        unavailable: Vec<i32>,
        malformed: Vec<i32>,
    }

    impl UpstreamProvider for FailingYears {
        fn name(&self) -> &str {
            "failing"
        }

        fn get_year_bounds(&self) -> Result<(i32, i32), ProviderError> {
            self.inner.get_year_bounds()
        }

        fn fetch_year_extract(&self, year: i32) -> Result<ProviderTable, ProviderError> {
            if self.unavailable.contains(&year) {
                return Err(ProviderError::Unavailable(format!("{year} down")));
            }
            if self.malformed.contains(&year) {
                return Err(ProviderError::Malformed(format!("{year} garbled")));
            }
            self.inner.fetch_year_extract(year)
        }
    }

    #[test]
    fn empty_request_is_rejected() {
        let err = combine(Arc::new(synthetic_provider(2000, 2024)), &[], 4).unwrap_err();
        assert_eq!(err, EnrollmentError::EmptyRequest);
    }

    #[test]
    fn rows_ordered_by_year_regardless_of_input_order() {
        let provider: Arc<dyn UpstreamProvider> = Arc::new(synthetic_provider(2000, 2024));
        let out = combine(Arc::clone(&provider), &[2024, 2022, 2023, 2022], 4).unwrap();

        let years: Vec<i32> = out.iter().map(|r| r.end_year).collect();
        let mut sorted = years.clone();
        sorted.sort();
        assert_eq!(years, sorted);
        assert_eq!(out.end_years().into_iter().collect::<Vec<_>>(), vec![2022, 2023, 2024]);

        let sequential = combine(provider, &[2022, 2023, 2024], 1).unwrap();
        assert_eq!(out, sequential);
    }

    #[test]
    fn every_invalid_year_reported_before_any_extract() {
        let provider = Arc::new(synthetic_provider(2000, 2024));
        let err = combine(provider.clone(), &[1800, 2020, 2099, 1800], 4).unwrap_err();
        assert_eq!(err.invalid_years(), &[1800, 2099]);
        assert_eq!(provider.extract_calls(), 0);
    }

    #[test]
    fn one_unavailable_year_aborts_batch() {
        let provider = FailingYears {
            inner: synthetic_provider(2000, 2024),
            unavailable: vec![2023],
            malformed: vec![],
        };
        let err = combine(Arc::new(provider), &[2022, 2023, 2024], 4).unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn lowest_failing_year_is_reported() {
        let provider = FailingYears {
            inner: synthetic_provider(2000, 2024),
            unavailable: vec![2024],
            malformed: vec![2021],
        };
        let err = combine(Arc::new(provider), &[2024, 2021, 2020], 4).unwrap_err();
        assert_eq!(err, EnrollmentError::SchemaMismatch("2021 garbled".into()));
    }

    #[test]
    fn header_is_union_in_first_seen_order() {
        let a = WideExtract::new(vec!["white".into(), "black".into()], vec![])
            .with_passthrough_columns(vec!["homeless".into()]);
        let b = WideExtract::new(vec!["black".into(), "lep".into()], vec![])
            .with_passthrough_columns(vec!["school_type".into(), "homeless".into()]);
        let out = concat(vec![a, b]);
        assert_eq!(out.subgroup_columns, vec!["white", "black", "lep"]);
        assert_eq!(out.passthrough_columns, vec!["homeless", "school_type"]);
    }
}
