//! Shared, lazily-initialized handle to the upstream provider.
//!
//! The handle is constructed explicitly and owned by the client; there is no
//! global. The provider is built on first use, at most once even when several
//! workers race for it, and every read is bounded by the configured timeout.

use crate::data::{ProviderError, ProviderTable, UpstreamProvider};
use crate::error::EnrollmentError;
use once_cell::sync::OnceCell;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

type ProviderFactory =
    Box<dyn Fn() -> Result<Arc<dyn UpstreamProvider>, ProviderError> + Send + Sync>;

/// Upstream provider handle with initialize-once semantics and per-call timeout.
pub struct Upstream {
    /// `None` when the provider was supplied up front.
    factory: Option<ProviderFactory>,
    provider: OnceCell<Arc<dyn UpstreamProvider>>,
    timeout: Duration,
}

impl Upstream {
    /// Defer building the provider until the first read.
    ///
    /// A failed build surfaces as `UpstreamUnavailable` and is attempted again
    /// on the next read; a successful one is never repeated.
    pub fn lazy<F>(factory: F, timeout: Duration) -> Self
    where
        F: Fn() -> Result<Arc<dyn UpstreamProvider>, ProviderError> + Send + Sync + 'static,
    {
        Self {
            factory: Some(Box::new(factory)),
            provider: OnceCell::new(),
            timeout,
        }
    }

    /// Wrap an already constructed provider.
    pub fn with_provider(provider: Arc<dyn UpstreamProvider>, timeout: Duration) -> Self {
        Self {
            factory: None,
            provider: OnceCell::with_value(provider),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_initialized(&self) -> bool {
        self.provider.get().is_some()
    }

    /// The provider, building it if this is the first use.
    pub fn provider(&self) -> Result<Arc<dyn UpstreamProvider>, EnrollmentError> {
        self.provider
            .get_or_try_init(|| {
                let factory = self
                    .factory
                    .as_ref()
                    .ok_or_else(|| ProviderError::Unavailable("no provider factory".into()))?;
                let provider = factory()?;
                info!(provider = provider.name(), "upstream provider initialized");
                Ok::<_, ProviderError>(provider)
            })
            .map(Arc::clone)
            .map_err(|e| EnrollmentError::UpstreamUnavailable(format!("provider init failed: {e}")))
    }

    /// `(min_year, max_year)` as reported by the provider.
    pub fn year_bounds(&self) -> Result<(i32, i32), EnrollmentError> {
        self.call("year bounds".into(), |p| p.get_year_bounds())
    }

    /// Raw extract for one year.
    pub fn year_extract(&self, year: i32) -> Result<ProviderTable, EnrollmentError> {
        self.call(format!("extract for {year}"), move |p| p.fetch_year_extract(year))
    }

    /// Run one provider read on its own thread and give up after the timeout.
    ///
    /// A timed-out read is abandoned, not cancelled; its result is discarded.
    fn call<T, F>(&self, what: String, read: F) -> Result<T, EnrollmentError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn UpstreamProvider) -> Result<T, ProviderError> + Send + 'static,
    {
        let provider = self.provider()?;
        let (tx, rx) = mpsc::sync_channel(1);

        thread::Builder::new()
            .name("wyschooldata-upstream".into())
            .spawn(move || {
                let _ = tx.send(read(provider.as_ref()));
            })
            .map_err(|e| EnrollmentError::UpstreamUnavailable(format!("{what}: {e}")))?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result.map_err(EnrollmentError::from),
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    what = what.as_str(),
                    timeout = ?self.timeout,
                    "upstream read timed out; abandoning reader thread"
                );
                Err(EnrollmentError::UpstreamUnavailable(format!(
                    "{what} exceeded timeout of {:?}",
                    self.timeout
                )))
            }
            Err(RecvTimeoutError::Disconnected) => Err(EnrollmentError::UpstreamUnavailable(
                format!("{what}: provider read aborted"),
            )),
        }
    }
}

impl std::fmt::Debug for Upstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upstream")
            .field("initialized", &self.is_initialized())
            .field("timeout", &self.timeout)
            .finish()
    }
}
