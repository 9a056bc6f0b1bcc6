//! HTTP adapter: mounts the configured route table on an axum router and
//! bridges each request into the gateway core.
use anyhow::Context;
use axum::Router;
use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodFilter, on};
use portico_core::channel::Dialer;
use portico_core::gateway::{CallContext, Gateway};
use portico_core::route::Endpoint;
use std::sync::Arc;
use std::time::Duration;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Builds the router, one literal route per configured endpoint. A method
/// the adapter cannot mount is a wiring error and refuses startup rather
/// than silently remapping the route.
pub fn router<D: Dialer>(
    gateway: Arc<Gateway<D>>,
    endpoints: &[Endpoint],
    request_timeout: Duration,
) -> anyhow::Result<Router> {
    let mut router = Router::new();
    for endpoint in endpoints {
        tracing::info!(
            method = %endpoint.method,
            path = %endpoint.path,
            service = %endpoint.grpc_service,
            rpc = %endpoint.grpc_method,
            "mounting route"
        );
        let filter = method_filter(&endpoint.method).with_context(|| {
            format!(
                "unsupported HTTP method {:?} for route {}",
                endpoint.method, endpoint.path
            )
        })?;
        let path = endpoint.path.clone();
        let endpoint = endpoint.clone();
        let gateway = Arc::clone(&gateway);
        let handler = move |headers: HeaderMap, body: Bytes| {
            let gateway = Arc::clone(&gateway);
            let endpoint = endpoint.clone();
            async move { dispatch(gateway, endpoint, headers, body, request_timeout).await }
        };
        router = router.route(&path, on(filter, handler));
    }
    Ok(router)
}

async fn dispatch<D: Dialer>(
    gateway: Arc<Gateway<D>>,
    endpoint: Endpoint,
    headers: HeaderMap,
    body: Bytes,
    request_timeout: Duration,
) -> Response {
    let ctx = match headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        Some(id) => CallContext::with_request_id(request_timeout, id),
        None => CallContext::new(request_timeout),
    };
    tracing::debug!(
        request_id = %ctx.request_id(),
        path = %endpoint.path,
        service = %endpoint.grpc_service,
        method = %endpoint.grpc_method,
        "dispatching request"
    );

    let (status, bytes) = gateway.handle(&endpoint, &body, &ctx).await;
    let content_type = if status == StatusCode::OK {
        "application/x-protobuf"
    } else {
        "application/json"
    };
    (
        status,
        [
            ("content-type", content_type.to_string()),
            (REQUEST_ID_HEADER, ctx.request_id().to_string()),
        ],
        bytes,
    )
        .into_response()
}

fn method_filter(method: &str) -> Option<MethodFilter> {
    match method.to_uppercase().as_str() {
        "GET" => Some(MethodFilter::GET),
        "POST" => Some(MethodFilter::POST),
        "PUT" => Some(MethodFilter::PUT),
        "DELETE" => Some(MethodFilter::DELETE),
        "PATCH" => Some(MethodFilter::PATCH),
        _ => None,
    }
}

/// Resolves once the process receives an interrupt.
pub async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to install shutdown signal handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
