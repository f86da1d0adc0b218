//! Upstream provider trait and the provider-native extract schema.
//!
//! The UpstreamProvider trait abstracts over data sources (an HTTP endpoint,
//! an in-memory fixture) so we can swap implementations and mock for tests.
//! Providers know nothing about the canonical schema; `decode` owns that mapping.

use crate::error::EnrollmentError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One year's extract in the provider's own column naming.
///
/// Documented provider schema: `columns` names every cell position and each
/// row carries exactly `columns.len()` JSON scalars (number, string, bool or
/// null).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderTable {
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

impl ProviderTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// A table with no columns and no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Failures a provider implementation can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Network, timeout or service-side failure; worth retrying later.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The response could not be read as the documented schema.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<ProviderError> for EnrollmentError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Unavailable(msg) => EnrollmentError::UpstreamUnavailable(msg),
            ProviderError::Malformed(msg) => EnrollmentError::SchemaMismatch(msg),
        }
    }
}

/// Trait for upstream providers.
///
/// Both calls are blocking reads with no side effects, so implementations must
/// tolerate being called from several worker threads at once.
pub trait UpstreamProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Inclusive `(min_year, max_year)` of currently published data.
    fn get_year_bounds(&self) -> Result<(i32, i32), ProviderError>;

    /// Raw extract for one school year, identified by its ending calendar year.
    fn fetch_year_extract(&self, year: i32) -> Result<ProviderTable, ProviderError>;
}
