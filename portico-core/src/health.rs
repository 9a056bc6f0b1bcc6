//! # Liveness probing
//!
//! One bounded `grpc.health.v1.Health/Check` call against a channel. The
//! prober never lets a failure escape its boundary: timeout, transport error,
//! and a non-SERVING answer all fold into `false`.
//!
//! It runs exactly once after every fresh dial, before the channel becomes
//! visible in the cache. Cache hits are served without a probe: reuse is
//! optimistic, and a dead cached channel is caught by the invoker's reactive
//! eviction instead.
use crate::BoxError;
use http_body::Body as HttpBody;
use std::time::Duration;
use tonic::client::GrpcService;
use tonic_health::pb::HealthCheckRequest;
use tonic_health::pb::health_check_response::ServingStatus;
use tonic_health::pb::health_client::HealthClient;

/// Default bound on a single liveness check.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct HealthProber {
    timeout: Duration,
}

impl Default for HealthProber {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

impl HealthProber {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Checks whether the channel leads to a serving backend.
    pub async fn probe<C>(&self, channel: C) -> bool
    where
        C: GrpcService<tonic::body::Body>,
        C::Error: Into<BoxError>,
        C::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
        <C::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
    {
        let mut client = HealthClient::new(channel);
        let request = HealthCheckRequest {
            service: String::new(),
        };
        match tokio::time::timeout(self.timeout, client.check(request)).await {
            Ok(Ok(response)) => {
                let status = response.into_inner().status;
                if status == ServingStatus::Serving as i32 {
                    true
                } else {
                    tracing::debug!(status, "liveness probe returned non-serving status");
                    false
                }
            }
            Ok(Err(status)) => {
                tracing::debug!(code = ?status.code(), "liveness probe failed");
                false
            }
            Err(_) => {
                tracing::debug!(timeout = ?self.timeout, "liveness probe timed out");
                false
            }
        }
    }
}
