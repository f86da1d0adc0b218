//! Year-range validation against the provider's published bounds.

use crate::domain::YearRange;
use crate::error::EnrollmentError;
use crate::upstream::Upstream;
use std::collections::BTreeSet;
use tracing::debug;

/// Validates requested years against currently published bounds.
///
/// Bounds are re-read from the provider on every call so a newly published
/// year is picked up without rebuilding the client.
pub struct YearRangeValidator<'a> {
    upstream: &'a Upstream,
}

impl<'a> YearRangeValidator<'a> {
    pub fn new(upstream: &'a Upstream) -> Self {
        Self { upstream }
    }

    /// Currently published bounds.
    pub fn get_available_years(&self) -> Result<YearRange, EnrollmentError> {
        let (min_year, max_year) = self.upstream.year_bounds()?;
        let range = YearRange::new(min_year, max_year)?;
        debug!(%range, "published year bounds");
        Ok(range)
    }

    /// Check a single year; returns the bounds it was checked against.
    pub fn validate(&self, year: i32) -> Result<YearRange, EnrollmentError> {
        let range = self.get_available_years()?;
        check_years(&range, [year])?;
        Ok(range)
    }

    /// Check a set of years, reporting every invalid one.
    pub fn validate_many<I>(&self, years: I) -> Result<YearRange, EnrollmentError>
    where
        I: IntoIterator<Item = i32>,
    {
        let years: BTreeSet<i32> = years.into_iter().collect();
        if years.is_empty() {
            return Err(EnrollmentError::EmptyRequest);
        }
        let range = self.get_available_years()?;
        check_years(&range, years)?;
        Ok(range)
    }
}

/// Fail with `OutOfRangeYear` listing every year outside `range`, ascending
/// and without repeats.
pub fn check_years<I>(range: &YearRange, years: I) -> Result<(), EnrollmentError>
where
    I: IntoIterator<Item = i32>,
{
    let invalid: BTreeSet<i32> = years.into_iter().filter(|y| !range.contains(*y)).collect();
    if invalid.is_empty() {
        Ok(())
    } else {
        Err(EnrollmentError::OutOfRangeYear {
            years: invalid.into_iter().collect(),
            range: *range,
        })
    }
}
