//! # Directory resolution
//!
//! Backends register their current address with an external directory
//! service; this module is the narrow read-side contract the gateway consumes
//! it through. Reads tolerate slightly stale answers (the channel cache's
//! health checks, not read freshness, catch dead backends) but never wait
//! unbounded.
use crate::BoxError;
use crate::error::GatewayError;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Default bound on a single directory lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Read-side contract of the external directory service.
#[async_trait::async_trait]
pub trait Directory: Send + Sync + 'static {
    /// Returns the address currently registered for a backend service, or
    /// `None` when the directory holds no record. A relaxed, slightly stale
    /// read is acceptable.
    async fn get(&self, service: &str) -> Result<Option<String>, BoxError>;
}

/// In-memory directory fed from configuration.
///
/// Stands in for the external registry in deployments that pin backend
/// addresses, and in tests. Mutable so records can be dropped or repointed at
/// runtime.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    records: RwLock<HashMap<String, String>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, service: impl Into<String>, addr: impl Into<String>) {
        self.records
            .write()
            .expect("directory lock poisoned")
            .insert(service.into(), addr.into());
    }

    pub fn remove(&self, service: &str) {
        self.records
            .write()
            .expect("directory lock poisoned")
            .remove(service);
    }
}

#[async_trait::async_trait]
impl Directory for StaticDirectory {
    async fn get(&self, service: &str) -> Result<Option<String>, BoxError> {
        Ok(self
            .records
            .read()
            .expect("directory lock poisoned")
            .get(service)
            .cloned())
    }
}

/// Bounded-timeout lookup wrapper over a [`Directory`].
///
/// Absent record, transport failure, and timeout all surface as
/// [`GatewayError::Discovery`]; retry policy lives one level up, in the
/// invoker, not here.
#[derive(Clone)]
pub struct DirectoryResolver {
    directory: Arc<dyn Directory>,
    timeout: Duration,
}

impl DirectoryResolver {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self {
            directory,
            timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn resolve(&self, service: &str) -> Result<String, GatewayError> {
        match tokio::time::timeout(self.timeout, self.directory.get(service)).await {
            Ok(Ok(Some(addr))) => {
                tracing::debug!(service, addr = %addr, "resolved backend address");
                Ok(addr)
            }
            Ok(Ok(None)) => Err(GatewayError::Discovery(format!(
                "service {service} not found"
            ))),
            Ok(Err(err)) => Err(GatewayError::Discovery(format!(
                "directory lookup for {service} failed: {err}"
            ))),
            Err(_) => Err(GatewayError::Discovery(format!(
                "directory lookup for {service} timed out after {:?}",
                self.timeout
            ))),
        }
    }
}
