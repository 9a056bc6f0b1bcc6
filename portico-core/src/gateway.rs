//! # Dynamic invoker
//!
//! The heart of the gateway: given a route's endpoint descriptor and the raw
//! request bytes, derive the wire message types by naming convention, acquire
//! a cached channel, perform the generic unary call, and hand back either the
//! serialized response or a translated failure.
//!
//! The only retry in the system lives here: a transport-class status
//! (`Unavailable`, `Internal`) marks the cached channel suspect, evicts it,
//! and triggers exactly one rebuild-and-reinvoke cycle. A second failure of
//! any kind surfaces as-is. Business-logic rejections never retry.
use crate::catalog::{self, MessageCatalog};
use crate::channel::{ChannelCache, Dialer};
use crate::error::{ErrorEnvelope, GatewayError, is_transport_class};
use crate::grpc::client::{GrpcClient, call_path};
use crate::route::Endpoint;
use http::StatusCode;
use prost::Message;
use prost_reflect::DynamicMessage;
use std::time::{Duration, Instant};
use tonic::Status;

/// Default bound on the end-to-end backend call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Per-request invocation state: the absolute deadline plus a correlation id
/// carried through log events. Created when a request arrives, discarded once
/// the response is written.
#[derive(Debug, Clone)]
pub struct CallContext {
    deadline: Instant,
    request_id: String,
}

impl CallContext {
    pub fn new(timeout: Duration) -> Self {
        Self::with_request_id(timeout, uuid::Uuid::new_v4().to_string())
    }

    pub fn with_request_id(timeout: Duration, request_id: impl Into<String>) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            request_id: request_id.into(),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Time left before the deadline, or `None` once it has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.checked_duration_since(Instant::now())
    }
}

/// The gateway core: descriptor catalog plus channel cache, exposed to the
/// HTTP adapter through [`Gateway::handle`].
pub struct Gateway<D: Dialer> {
    catalog: MessageCatalog,
    channels: ChannelCache<D>,
}

impl<D: Dialer> Gateway<D> {
    pub fn new(catalog: MessageCatalog, channels: ChannelCache<D>) -> Self {
        Self { catalog, channels }
    }

    /// Entry point for the HTTP adapter.
    ///
    /// Success yields 200 plus the serialized response message; any failure
    /// yields its mapped HTTP status plus the JSON error envelope. Nothing is
    /// allowed to escape as a panic or an unformatted error.
    pub async fn handle(
        &self,
        endpoint: &Endpoint,
        body: &[u8],
        ctx: &CallContext,
    ) -> (StatusCode, Vec<u8>) {
        match self.invoke(endpoint, body, ctx).await {
            Ok(bytes) => (StatusCode::OK, bytes),
            Err(err) => {
                let status = err.http_status();
                tracing::warn!(
                    request_id = %ctx.request_id(),
                    path = %endpoint.path,
                    service = %endpoint.grpc_service,
                    %err,
                    "request failed"
                );
                (status, ErrorEnvelope::new(status, err.to_string()).to_bytes())
            }
        }
    }

    /// Performs the dynamic dispatch for one request.
    pub async fn invoke(
        &self,
        endpoint: &Endpoint,
        body: &[u8],
        ctx: &CallContext,
    ) -> Result<Vec<u8>, GatewayError> {
        let service = endpoint.grpc_service.as_str();
        let method = endpoint.grpc_method.as_str();

        // An already-expired deadline must fail before any dial happens.
        let Some(remaining) = ctx.remaining() else {
            return Err(GatewayError::Invocation(Status::deadline_exceeded(
                "deadline expired before dispatch",
            )));
        };

        let request_desc = self
            .catalog
            .request_message(service, method)
            .ok_or_else(|| {
                GatewayError::TypeResolution(catalog::request_type_name(service, method))
            })?;
        let response_desc = self
            .catalog
            .response_message(service, method)
            .ok_or_else(|| {
                GatewayError::TypeResolution(catalog::response_type_name(service, method))
            })?;

        let request = DynamicMessage::decode(request_desc, body)
            .map_err(|err| GatewayError::Deserialization(err.to_string()))?;

        let path = call_path(service, method).map_err(|err| {
            GatewayError::Invocation(Status::internal(format!("invalid call path: {err}")))
        })?;

        let channel = self.channels.acquire(service).await?;
        let mut client = GrpcClient::new(channel);
        let response = match client
            .unary(response_desc.clone(), path.clone(), request.clone(), remaining)
            .await
        {
            Ok(response) => response,
            Err(status) if is_transport_class(status.code()) => {
                tracing::warn!(
                    request_id = %ctx.request_id(),
                    service,
                    code = ?status.code(),
                    "transport failure, rebuilding channel for one retry"
                );
                self.channels.evict(service).await;
                let channel = self.channels.acquire(service).await?;
                let remaining = ctx.remaining().ok_or_else(|| {
                    GatewayError::Invocation(Status::deadline_exceeded(
                        "deadline expired during retry",
                    ))
                })?;
                let mut client = GrpcClient::new(channel);
                client
                    .unary(response_desc, path, request, remaining)
                    .await
                    .map_err(GatewayError::Invocation)?
            }
            Err(status) => return Err(GatewayError::Invocation(status)),
        };

        Ok(response.encode_to_vec())
    }

    /// Closes the channel cache. Idempotent.
    pub async fn shutdown(&self) {
        self.channels.shutdown().await;
    }
}
