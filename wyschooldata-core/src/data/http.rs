//! HTTP provider for a JSON enrollment endpoint.
//!
//! Endpoints:
//! - `GET {base_url}/years` → `{"min_year": 2000, "max_year": 2024}`
//! - `GET {base_url}/enrollment/{year}` → a `ProviderTable`
//!
//! Connect failures, timeouts, 429 and 5xx are reported as unavailable. Any
//! other non-success status or an undecodable body means the endpoint no
//! longer speaks the documented schema. There are no retries here; callers
//! decide.

use super::provider::{ProviderError, ProviderTable, UpstreamProvider};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct YearsResponse {
    min_year: i32,
    max_year: i32,
}

/// Blocking HTTP provider.
pub struct HttpProvider {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpProvider {
    /// Build a provider; `timeout` bounds every request.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("wyschooldata/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn years_url(&self) -> String {
        format!("{}/years", self.base_url)
    }

    fn extract_url(&self, year: i32) -> String {
        format!("{}/enrollment/{year}", self.base_url)
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ProviderError> {
        debug!(url, "GET");
        let resp = self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                ProviderError::Unavailable(format!("timed out: {url}"))
            } else {
                ProviderError::Unavailable(format!("{url}: {e}"))
            }
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(ProviderError::Unavailable(format!("HTTP {status} for {url}")));
        }
        if !status.is_success() {
            return Err(ProviderError::Malformed(format!("HTTP {status} for {url}")));
        }

        resp.json::<T>().map_err(|e| {
            if e.is_timeout() {
                ProviderError::Unavailable(format!("timed out reading body: {url}"))
            } else {
                ProviderError::Malformed(format!("failed to parse response from {url}: {e}"))
            }
        })
    }
}

impl UpstreamProvider for HttpProvider {
    fn name(&self) -> &str {
        "http"
    }

    fn get_year_bounds(&self) -> Result<(i32, i32), ProviderError> {
        let years: YearsResponse = self.get_json(&self.years_url())?;
        Ok((years.min_year, years.max_year))
    }

    fn fetch_year_extract(&self, year: i32) -> Result<ProviderTable, ProviderError> {
        self.get_json(&self.extract_url(year))
    }
}
