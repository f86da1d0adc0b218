//! Domain types for enrollment extracts

pub mod extract;
pub mod grade;
pub mod record;
pub mod years;

pub use extract::{TidyDiagnostic, TidyExtract, WideExtract};
pub use grade::{GradeLevel, GradeParseError};
pub use record::{EnrollmentRecord, EntityType, TidyRecord};
pub use years::YearRange;
