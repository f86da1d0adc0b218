//! Published year bounds.

use crate::error::EnrollmentError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive bounds of currently published data.
///
/// Construction enforces `min_year < max_year`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawYearRange")]
pub struct YearRange {
    min_year: i32,
    max_year: i32,
}

#[derive(Deserialize)]
struct RawYearRange {
    min_year: i32,
    max_year: i32,
}

impl TryFrom<RawYearRange> for YearRange {
    type Error = EnrollmentError;

    fn try_from(raw: RawYearRange) -> Result<Self, Self::Error> {
        YearRange::new(raw.min_year, raw.max_year)
    }
}

impl YearRange {
    /// Build a range from provider-reported bounds.
    pub fn new(min_year: i32, max_year: i32) -> Result<Self, EnrollmentError> {
        if min_year >= max_year {
            return Err(EnrollmentError::SchemaMismatch(format!(
                "year bounds must satisfy min < max, got {min_year}..{max_year}"
            )));
        }
        Ok(Self { min_year, max_year })
    }

    pub fn min_year(&self) -> i32 {
        self.min_year
    }

    pub fn max_year(&self) -> i32 {
        self.max_year
    }

    pub fn contains(&self, year: i32) -> bool {
        year >= self.min_year && year <= self.max_year
    }

    /// Every published year, ascending.
    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.min_year..=self.max_year
    }

    /// Number of published years.
    pub fn len(&self) -> usize {
        (self.max_year - self.min_year) as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min_year, self.max_year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_inverted_or_equal_bounds() {
        assert!(YearRange::new(2024, 2000).is_err());
        assert!(YearRange::new(2024, 2024).is_err());
    }

    #[test]
    fn contains_is_inclusive() {
        let r = YearRange::new(2000, 2024).unwrap();
        assert!(r.contains(2000));
        assert!(r.contains(2024));
        assert!(!r.contains(1999));
        assert!(!r.contains(2025));
        assert_eq!(r.len(), 25);
    }

    #[test]
    fn serializes_with_named_bounds() {
        let r = YearRange::new(2000, 2024).unwrap();
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#"{"min_year":2000,"max_year":2024}"#);
        let back: YearRange = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn deserializing_inverted_bounds_fails() {
        let parsed: Result<YearRange, _> = serde_json::from_str(r#"{"min_year":5,"max_year":1}"#);
        assert!(parsed.is_err());
    }
}
