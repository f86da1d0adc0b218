//! Grade levels as published in enrollment extracts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Grade level of an enrollment row. `Total` is the all-grades sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum GradeLevel {
    PreK,
    Kindergarten,
    /// Grades 1 through 12.
    Grade(u8),
    Ungraded,
    Total,
}

impl GradeLevel {
    /// Canonical label (`PK`, `K`, `01`..`12`, `UG`, `TOTAL`).
    pub fn label(&self) -> String {
        match self {
            GradeLevel::PreK => "PK".into(),
            GradeLevel::Kindergarten => "K".into(),
            GradeLevel::Grade(g) => format!("{g:02}"),
            GradeLevel::Ungraded => "UG".into(),
            GradeLevel::Total => "TOTAL".into(),
        }
    }

    pub fn is_total(&self) -> bool {
        matches!(self, GradeLevel::Total)
    }
}

/// Unrecognized grade label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown grade level '{0}'")]
pub struct GradeParseError(pub String);

impl FromStr for GradeLevel {
    type Err = GradeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_uppercase();
        let norm = norm
            .strip_prefix("GRADE")
            .map(str::trim)
            .unwrap_or(norm.as_str());
        match norm {
            "PK" | "PREK" | "PRE-K" | "PRE-KINDERGARTEN" => Ok(GradeLevel::PreK),
            "K" | "KG" | "KINDERGARTEN" => Ok(GradeLevel::Kindergarten),
            "UG" | "UNGRADED" => Ok(GradeLevel::Ungraded),
            "TOTAL" | "ALL" | "ALL GRADES" => Ok(GradeLevel::Total),
            other => match other.parse::<u8>() {
                Ok(g) if (1..=12).contains(&g) => Ok(GradeLevel::Grade(g)),
                _ => Err(GradeParseError(s.to_string())),
            },
        }
    }
}

impl TryFrom<String> for GradeLevel {
    type Error = GradeParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<GradeLevel> for String {
    fn from(g: GradeLevel) -> Self {
        g.label()
    }
}

impl fmt::Display for GradeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_spellings() {
        assert_eq!("pk".parse::<GradeLevel>().unwrap(), GradeLevel::PreK);
        assert_eq!("KG".parse::<GradeLevel>().unwrap(), GradeLevel::Kindergarten);
        assert_eq!("01".parse::<GradeLevel>().unwrap(), GradeLevel::Grade(1));
        assert_eq!("Grade 12".parse::<GradeLevel>().unwrap(), GradeLevel::Grade(12));
        assert_eq!(" total ".parse::<GradeLevel>().unwrap(), GradeLevel::Total);
    }

    #[test]
    fn rejects_out_of_range_grades() {
        assert!("13".parse::<GradeLevel>().is_err());
        assert!("0".parse::<GradeLevel>().is_err());
        assert!("senior".parse::<GradeLevel>().is_err());
    }

    #[test]
    fn labels_are_zero_padded() {
        assert_eq!(GradeLevel::Grade(3).label(), "03");
        assert_eq!(GradeLevel::Total.to_string(), "TOTAL");
    }

    #[test]
    fn total_sorts_last() {
        let mut grades = vec![GradeLevel::Total, GradeLevel::Grade(2), GradeLevel::PreK];
        grades.sort();
        assert_eq!(grades, vec![GradeLevel::PreK, GradeLevel::Grade(2), GradeLevel::Total]);
    }
}
