//! Error taxonomy shared by every operation of the core.
//!
//! Validation failures (`EmptyRequest`, `OutOfRangeYear`) are raised before any
//! extract is requested from the provider. `UpstreamUnavailable` is the only
//! retryable variant; the core itself never retries.

use crate::domain::YearRange;
use thiserror::Error;

/// Errors returned by the public surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnrollmentError {
    #[error("no years requested")]
    EmptyRequest,

    #[error("year(s) {} outside published range {range}", join_years(.years))]
    OutOfRangeYear { years: Vec<i32>, range: YearRange },

    #[error("upstream provider unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("upstream schema mismatch: {0}")]
    SchemaMismatch(String),
}

impl EnrollmentError {
    /// True for transient failures a caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EnrollmentError::UpstreamUnavailable(_))
    }

    /// The offending years for `OutOfRangeYear`, empty otherwise.
    pub fn invalid_years(&self) -> &[i32] {
        match self {
            EnrollmentError::OutOfRangeYear { years, .. } => years,
            _ => &[],
        }
    }
}

fn join_years(years: &[i32]) -> String {
    years
        .iter()
        .map(|y| y.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unavailable_is_retryable() {
        assert!(EnrollmentError::UpstreamUnavailable("timeout".into()).is_retryable());
        assert!(!EnrollmentError::SchemaMismatch("x".into()).is_retryable());
        assert!(!EnrollmentError::EmptyRequest.is_retryable());
    }

    #[test]
    fn out_of_range_lists_every_year() {
        let err = EnrollmentError::OutOfRangeYear {
            years: vec![1800, 2099],
            range: YearRange::new(2000, 2024).unwrap(),
        };
        let msg = err.to_string();
        assert!(msg.contains("1800, 2099"), "got: {msg}");
        assert!(msg.contains("2000-2024"), "got: {msg}");
        assert_eq!(err.invalid_years(), &[1800, 2099]);
    }
}
