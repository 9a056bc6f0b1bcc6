//! # Channel cache
//!
//! Owns the set of live RPC channels, one per backend service name. A channel
//! enters the cache only after a successful dial *and* liveness probe; it
//! leaves on reactive eviction or shutdown. There is no stored "unhealthy"
//! state; anything suspect is removed and rebuilt on the next acquire.
//!
//! Creation is serialized per key: concurrent first-time callers for the same
//! backend share a single dial-and-probe instead of storming it with N
//! connections.
use crate::BoxError;
use crate::directory::DirectoryResolver;
use crate::error::GatewayError;
use crate::health::HealthProber;
use http_body::Body as HttpBody;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tonic::client::GrpcService;
use tonic::transport::Channel;

/// Default bound on establishing a TCP/TLS connection to a backend.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens an RPC channel to a resolved backend address.
///
/// The associated channel type is the seam that lets tests exercise the cache
/// and invoker against in-process services; production uses [`TonicDialer`].
#[async_trait::async_trait]
pub trait Dialer: Send + Sync + 'static
where
    <Self::Channel as GrpcService<tonic::body::Body>>::Error: Into<BoxError>,
    <Self::Channel as GrpcService<tonic::body::Body>>::Future: Send,
    <Self::Channel as GrpcService<tonic::body::Body>>::ResponseBody:
        HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <<Self::Channel as GrpcService<tonic::body::Body>>::ResponseBody as HttpBody>::Error:
        Into<BoxError> + Send,
{
    type Channel: GrpcService<tonic::body::Body> + Clone + Send + Sync + 'static;

    async fn dial(&self, addr: &str) -> Result<Self::Channel, BoxError>;
}

/// Production dialer producing real `tonic` transport channels. Transport
/// security negotiation aside, no credentials are validated at dial time.
#[derive(Debug, Clone)]
pub struct TonicDialer {
    connect_timeout: Duration,
}

impl Default for TonicDialer {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

impl TonicDialer {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait::async_trait]
impl Dialer for TonicDialer {
    type Channel = Channel;

    async fn dial(&self, addr: &str) -> Result<Channel, BoxError> {
        let uri = if addr.contains("://") {
            addr.to_string()
        } else {
            format!("http://{addr}")
        };
        let endpoint = Channel::from_shared(uri)?.connect_timeout(self.connect_timeout);
        Ok(endpoint.connect().await?)
    }
}

/// Cache of live channels keyed by backend service name.
pub struct ChannelCache<D: Dialer> {
    dialer: D,
    resolver: DirectoryResolver,
    prober: HealthProber,
    entries: tokio::sync::RwLock<HashMap<String, D::Channel>>,
    // Per-key creation locks. The key space is bounded by the route table, so
    // locks are kept for the process lifetime rather than reclaimed.
    creation: StdMutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    closed: AtomicBool,
}

impl<D: Dialer> ChannelCache<D> {
    pub fn new(dialer: D, resolver: DirectoryResolver, prober: HealthProber) -> Self {
        Self {
            dialer,
            resolver,
            prober,
            entries: tokio::sync::RwLock::new(HashMap::new()),
            creation: StdMutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns a ready channel for the backend, building one on a miss.
    ///
    /// A cached entry is returned as-is, without a probe; reuse is optimistic
    /// and a dead channel is caught by the invoker's reactive eviction. A
    /// miss resolves the address, dials, and probes before the entry becomes
    /// visible, so an unhealthy channel is never cached.
    pub async fn acquire(&self, service: &str) -> Result<D::Channel, GatewayError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(GatewayError::Connection(
                "channel cache is shut down".to_string(),
            ));
        }

        if let Some(channel) = self.entries.read().await.get(service) {
            return Ok(channel.clone());
        }

        let lock = self.creation_lock(service);
        let _guard = lock.lock().await;

        // A concurrent caller may have finished the build while we waited.
        if let Some(channel) = self.entries.read().await.get(service) {
            return Ok(channel.clone());
        }
        if self.closed.load(Ordering::Acquire) {
            return Err(GatewayError::Connection(
                "channel cache is shut down".to_string(),
            ));
        }

        let addr = self.resolver.resolve(service).await?;
        let channel = self.dialer.dial(&addr).await.map_err(|err| {
            GatewayError::Connection(format!("failed to dial {addr} for {service}: {err}"))
        })?;

        if !self.prober.probe(channel.clone()).await {
            // Dropping the channel closes it; a failed probe is never cached.
            return Err(GatewayError::Connection(format!(
                "backend {service} at {addr} failed its liveness probe"
            )));
        }

        // Shutdown may have completed while the dial and probe were in
        // flight. The re-check holds the entries lock so the insert cannot
        // slip past the shutdown's clear; a closed cache drops the channel
        // instead of handing it out.
        let mut entries = self.entries.write().await;
        if self.closed.load(Ordering::Acquire) {
            return Err(GatewayError::Connection(
                "channel cache is shut down".to_string(),
            ));
        }
        entries.insert(service.to_owned(), channel.clone());
        drop(entries);
        tracing::debug!(service, addr = %addr, "cached fresh channel");
        Ok(channel)
    }

    /// Drops the entry for a backend, forcing a full dial-and-probe on the
    /// next acquire. Called by the invoker when an invocation reports a
    /// transport-class failure.
    pub async fn evict(&self, service: &str) {
        if self.entries.write().await.remove(service).is_some() {
            tracing::debug!(service, "evicted channel");
        }
    }

    /// Closes every cached channel exactly once. Idempotent; subsequent
    /// `acquire` calls fail fast.
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.entries.write().await.clear();
        tracing::debug!("channel cache shut down");
    }

    fn creation_lock(&self, service: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.creation.lock().expect("creation lock map poisoned");
        locks.entry(service.to_owned()).or_default().clone()
    }
}
