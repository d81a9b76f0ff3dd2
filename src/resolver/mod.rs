pub mod dns;
pub mod fixed;
pub mod ip;
pub mod uds;

use crate::{backoff::BackoffConfig, lookup::Lookup, Error, Result};
use std::{sync::Arc, time::Duration};
use tokio::runtime::Handle;

/// A resolver watching one target.
///
/// Outcomes are reported to the listener given at construction. Dropping a
/// resolver destroys it.
pub trait Resolver: Send + Sync {
    /// Starts a resolution pass unless one is already pending. Returns
    /// immediately.
    fn update_resolution(&self);

    /// Cancels pending work. Once this returns the listener is never called
    /// again.
    fn destroy(&self);
}

#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Replaces the naming primitives a resolver would pick for itself.
    pub lookup: Option<Arc<dyn Lookup>>,
    /// Whether DNS resolvers look for a service config in TXT records.
    pub service_config: bool,
    pub query_timeout: Duration,
    pub backoff: BackoffConfig,
    /// Runtime running resolution passes, the current one when unset.
    pub runtime: Option<Handle>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            lookup: None,
            service_config: true,
            query_timeout: Duration::from_secs(5),
            backoff: BackoffConfig::default(),
            runtime: None,
        }
    }
}

impl ResolverOptions {
    pub fn with_lookup(mut self, lookup: Arc<dyn Lookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn with_service_config(mut self, enabled: bool) -> Self {
        self.service_config = enabled;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub(crate) fn runtime_handle(&self) -> Result<Handle> {
        self.runtime
            .clone()
            .or_else(|| Handle::try_current().ok())
            .ok_or(Error::NoRuntime)
    }
}
