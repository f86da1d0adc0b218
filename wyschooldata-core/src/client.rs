//! The public entry point tying configuration, provider and operations together.

use crate::combine::MultiYearCombiner;
use crate::config::{ClientConfig, ConfigError};
use crate::data::{HttpProvider, UpstreamProvider};
use crate::domain::{TidyExtract, WideExtract, YearRange};
use crate::error::EnrollmentError;
use crate::fetch::SingleYearFetcher;
use crate::tidy::TidyTransformer;
use crate::upstream::Upstream;
use crate::years::YearRangeValidator;
use std::sync::Arc;

/// Enrollment data client.
///
/// Owns the upstream handle and the versioned column and subgroup tables. All
/// operations borrow the client, so one client can be shared across threads.
#[derive(Debug)]
pub struct EnrollmentClient {
    config: ClientConfig,
    upstream: Upstream,
}

impl EnrollmentClient {
    pub fn new(config: ClientConfig, upstream: Upstream) -> Self {
        Self { config, upstream }
    }

    /// Client over an already constructed provider.
    pub fn with_provider(config: ClientConfig, provider: Arc<dyn UpstreamProvider>) -> Self {
        let upstream = Upstream::with_provider(provider, config.timeout());
        Self::new(config, upstream)
    }

    /// Client over the HTTP provider named in `config.upstream.base_url`.
    ///
    /// The HTTP client itself is built on first use.
    pub fn from_config(config: ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let base_url = config
            .upstream
            .base_url
            .clone()
            .ok_or_else(|| ConfigError::Invalid("upstream.base_url is not set".into()))?;
        let timeout = config.timeout();
        let upstream = Upstream::lazy(
            move || {
                let provider = HttpProvider::new(base_url.clone(), timeout)?;
                Ok(Arc::new(provider) as Arc<dyn UpstreamProvider>)
            },
            timeout,
        );
        Ok(Self::new(config, upstream))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn upstream(&self) -> &Upstream {
        &self.upstream
    }

    pub fn get_available_years(&self) -> Result<YearRange, EnrollmentError> {
        YearRangeValidator::new(&self.upstream).get_available_years()
    }

    pub fn validate(&self, year: i32) -> Result<YearRange, EnrollmentError> {
        YearRangeValidator::new(&self.upstream).validate(year)
    }

    pub fn validate_many(&self, years: &[i32]) -> Result<YearRange, EnrollmentError> {
        YearRangeValidator::new(&self.upstream).validate_many(years.iter().copied())
    }

    /// One year in the canonical wide schema.
    pub fn fetch(&self, year: i32) -> Result<WideExtract, EnrollmentError> {
        SingleYearFetcher::new(&self.upstream, &self.config.columns, &self.config.subgroups)
            .fetch(year)
    }

    /// Several years concatenated, ordered by year. Fails as a whole if any year fails.
    pub fn fetch_many(&self, years: &[i32]) -> Result<WideExtract, EnrollmentError> {
        MultiYearCombiner::new(
            &self.upstream,
            &self.config.columns,
            &self.config.subgroups,
            self.config.fetch.max_workers,
        )
        .fetch_many(years)
    }

    pub fn tidy(&self, extract: WideExtract) -> TidyExtract {
        TidyTransformer::new(&self.config.subgroups).tidy(extract)
    }
}
