//! # Generic gRPC Client
//!
//! Wraps a standard `tonic` client to provide a unary call interface that is
//! agnostic to the specific Protobuf messages being exchanged.
//!
//! ## How it works
//!
//! The [`GrpcClient`] uses [`super::codec::DynamicCodec`] for serialization.
//! It does not need compile-time knowledge of the message structure; the
//! caller supplies the response descriptor and the runtime-built HTTP/2 path
//! (e.g. `/orders.OrderService/GetOrder`).
//!
//! Transport-level conditions the underlying service reports outside the
//! status-code channel (the channel never becoming ready, the local deadline
//! firing) are folded into a `tonic::Status`, so callers classify a single
//! failure domain when deciding whether to retry.
use super::codec::DynamicCodec;
use crate::BoxError;
use http::uri::{InvalidUri, PathAndQuery};
use http_body::Body as HttpBody;
use prost_reflect::{DynamicMessage, MessageDescriptor};
use std::str::FromStr;
use std::time::Duration;
use tonic::client::GrpcService;
use tonic::transport::Channel;
use tonic::{Request, Status};

/// Builds the HTTP/2 path for a fully-qualified service/method pair.
pub fn call_path(service: &str, method: &str) -> Result<PathAndQuery, InvalidUri> {
    PathAndQuery::from_str(&format!("/{service}/{method}"))
}

/// A generic unary client over any `GrpcService`.
pub struct GrpcClient<C = Channel> {
    inner: tonic::client::Grpc<C>,
}

impl<C> GrpcClient<C>
where
    C: GrpcService<tonic::body::Body> + Send,
    C::Error: Into<BoxError>,
    C::Future: Send,
    C::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <C::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    pub fn new(channel: C) -> Self {
        Self {
            inner: tonic::client::Grpc::new(channel),
        }
    }

    /// Performs a unary call (single request -> single response).
    ///
    /// The remaining deadline is propagated to the backend as gRPC timeout
    /// metadata and enforced locally as well, so a hung transport cannot hold
    /// the request past its bound.
    pub async fn unary(
        &mut self,
        response_desc: MessageDescriptor,
        path: PathAndQuery,
        message: DynamicMessage,
        timeout: Duration,
    ) -> Result<DynamicMessage, Status> {
        let codec = DynamicCodec::new(response_desc);
        let mut request = Request::new(message);
        request.set_timeout(timeout);

        // Waiting for readiness is a suspension point too: a channel stuck in
        // reconnect backoff must not hold the request past its bound, so the
        // whole ready-then-call step runs under the one timeout.
        let call = async {
            if let Err(err) = self.inner.ready().await {
                let err: BoxError = err.into();
                return Err(Status::unavailable(format!("channel not ready: {err}")));
            }
            self.inner.unary(request, path, codec).await
        };

        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(response)) => Ok(response.into_inner()),
            Ok(Err(status)) => Err(status),
            Err(_) => Err(Status::deadline_exceeded(format!(
                "backend call exceeded {timeout:?}"
            ))),
        }
    }
}
