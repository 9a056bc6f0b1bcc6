//! Shared fixtures for the integration tests: a descriptor pool built in
//! memory, an in-process backend speaking the dynamic codec, and a dialer
//! that hands the backend out instead of opening sockets.
#![allow(dead_code)]

use portico_core::catalog::MessageCatalog;
use portico_core::channel::Dialer;
use portico_core::grpc::codec::DynamicCodec;
use portico_core::route::Endpoint;
use portico_core::BoxError;
use prost::Message;
use prost_reflect::{DescriptorPool, DynamicMessage, MessageDescriptor, Value};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, FileDescriptorSet,
};
use std::collections::{HashMap, VecDeque};
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tonic::codegen::{BoxFuture, Service};
use tonic::{Code, Status};

pub const SERVING: i32 = 1;
pub const NOT_SERVING: i32 = 2;

fn string_field(name: &str, number: i32) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(Type::String as i32),
        ..Default::default()
    }
}

/// Builds the descriptor pool the tests run against: an `orders` package with
/// conventionally named request/response pairs, plus the health protocol
/// messages the probe needs.
pub fn test_pool() -> DescriptorPool {
    let orders = FileDescriptorProto {
        name: Some("orders.proto".to_string()),
        package: Some("orders".to_string()),
        syntax: Some("proto3".to_string()),
        message_type: vec![
            DescriptorProto {
                name: Some("GetOrderRequest".to_string()),
                field: vec![string_field("id", 1)],
                ..Default::default()
            },
            DescriptorProto {
                name: Some("GetOrderResponse".to_string()),
                field: vec![string_field("id", 1), string_field("status", 2)],
                ..Default::default()
            },
        ],
        ..Default::default()
    };

    let health = FileDescriptorProto {
        name: Some("health.proto".to_string()),
        package: Some("grpc.health.v1".to_string()),
        syntax: Some("proto3".to_string()),
        message_type: vec![
            DescriptorProto {
                name: Some("HealthCheckRequest".to_string()),
                field: vec![string_field("service", 1)],
                ..Default::default()
            },
            DescriptorProto {
                name: Some("HealthCheckResponse".to_string()),
                field: vec![FieldDescriptorProto {
                    name: Some("status".to_string()),
                    number: Some(1),
                    label: Some(Label::Optional as i32),
                    r#type: Some(Type::Enum as i32),
                    type_name: Some(
                        ".grpc.health.v1.HealthCheckResponse.ServingStatus".to_string(),
                    ),
                    ..Default::default()
                }],
                enum_type: vec![EnumDescriptorProto {
                    name: Some("ServingStatus".to_string()),
                    value: vec![
                        EnumValueDescriptorProto {
                            name: Some("UNKNOWN".to_string()),
                            number: Some(0),
                            ..Default::default()
                        },
                        EnumValueDescriptorProto {
                            name: Some("SERVING".to_string()),
                            number: Some(SERVING),
                            ..Default::default()
                        },
                        EnumValueDescriptorProto {
                            name: Some("NOT_SERVING".to_string()),
                            number: Some(NOT_SERVING),
                            ..Default::default()
                        },
                    ],
                    ..Default::default()
                }],
                ..Default::default()
            },
        ],
        ..Default::default()
    };

    DescriptorPool::from_file_descriptor_set(FileDescriptorSet {
        file: vec![orders, health],
    })
    .expect("test descriptor set must assemble")
}

pub fn test_catalog() -> MessageCatalog {
    MessageCatalog::from_pool(test_pool())
}

pub fn get_order_endpoint() -> Endpoint {
    Endpoint {
        method: "POST".to_string(),
        path: "/v1/orders/get".to_string(),
        grpc_service: "orders.OrderService".to_string(),
        grpc_method: "GetOrder".to_string(),
        auth_required: false,
        skip_refresh: false,
    }
}

/// Encodes a `orders.GetOrderRequest` with the given id.
pub fn encode_get_order_request(pool: &DescriptorPool, id: &str) -> Vec<u8> {
    let desc = pool
        .get_message_by_name("orders.GetOrderRequest")
        .expect("request descriptor present");
    let mut msg = DynamicMessage::new(desc);
    msg.set_field_by_name("id", Value::String(id.to_string()));
    msg.encode_to_vec()
}

pub fn decode_get_order_response(pool: &DescriptorPool, bytes: &[u8]) -> DynamicMessage {
    let desc = pool
        .get_message_by_name("orders.GetOrderResponse")
        .expect("response descriptor present");
    DynamicMessage::decode(desc, bytes).expect("response bytes must decode")
}

/// Observable per-backend state shared between a test and the backend the
/// dialer hands out.
#[derive(Debug, Default)]
pub struct BackendState {
    /// Unary calls served (health checks excluded).
    pub calls: AtomicUsize,
    /// Health checks served.
    pub health_checks: AtomicUsize,
    /// Statuses to fail the next unary calls with, consumed front to back.
    pub fail_queue: Mutex<VecDeque<Status>>,
    /// Health answer, as a `ServingStatus` number.
    pub health_status: std::sync::atomic::AtomicI32,
}

impl BackendState {
    pub fn serving() -> Arc<Self> {
        let state = Self::default();
        state.health_status.store(SERVING, Ordering::SeqCst);
        Arc::new(state)
    }

    pub fn fail_next(&self, code: Code, message: &str) {
        self.fail_queue
            .lock()
            .expect("fail queue lock poisoned")
            .push_back(Status::new(code, message.to_string()));
    }

    pub fn unary_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn health_check_count(&self) -> usize {
        self.health_checks.load(Ordering::SeqCst)
    }

    pub fn set_health(&self, status: i32) {
        self.health_status.store(status, Ordering::SeqCst);
    }
}

/// In-process backend implementing the gRPC http interface directly, routing
/// on the request path and serving every method through the dynamic codec.
#[derive(Clone, Debug)]
pub struct TestBackend {
    pool: DescriptorPool,
    state: Arc<BackendState>,
}

impl TestBackend {
    pub fn new(pool: DescriptorPool, state: Arc<BackendState>) -> Self {
        Self { pool, state }
    }

    fn descriptor(&self, name: &str) -> MessageDescriptor {
        self.pool
            .get_message_by_name(name)
            .expect("backend descriptor present")
    }

    async fn dispatch(
        self,
        req: http::Request<tonic::body::Body>,
    ) -> http::Response<tonic::body::Body> {
        let path = req.uri().path().to_string();
        match path.as_str() {
            "/grpc.health.v1.Health/Check" => {
                self.state.health_checks.fetch_add(1, Ordering::SeqCst);
                let request_desc = self.descriptor("grpc.health.v1.HealthCheckRequest");
                let response_desc = self.descriptor("grpc.health.v1.HealthCheckResponse");
                let status = self.state.health_status.load(Ordering::SeqCst);
                self.serve_unary(request_desc, req, move |_request| {
                    let mut response = DynamicMessage::new(response_desc.clone());
                    response.set_field_by_name("status", Value::EnumNumber(status));
                    Ok(response)
                })
                .await
            }
            "/orders.OrderService/GetOrder" => {
                self.state.calls.fetch_add(1, Ordering::SeqCst);
                let request_desc = self.descriptor("orders.GetOrderRequest");
                let response_desc = self.descriptor("orders.GetOrderResponse");
                let mut scripted = self
                    .state
                    .fail_queue
                    .lock()
                    .expect("fail queue lock poisoned")
                    .pop_front();
                self.serve_unary(request_desc, req, move |request| {
                    if let Some(status) = scripted.take() {
                        return Err(status);
                    }
                    let id = request
                        .get_field_by_name("id")
                        .map(|v| v.as_str().unwrap_or_default().to_string())
                        .unwrap_or_default();
                    let mut response = DynamicMessage::new(response_desc.clone());
                    response.set_field_by_name("id", Value::String(id));
                    response.set_field_by_name("status", Value::String("SHIPPED".to_string()));
                    Ok(response)
                })
                .await
            }
            other => {
                let request_desc = self.descriptor("orders.GetOrderRequest");
                let message = format!("unknown method {other}");
                self.serve_unary(request_desc, req, move |_request| {
                    Err(Status::unimplemented(message.clone()))
                })
                .await
            }
        }
    }

    async fn serve_unary<F>(
        &self,
        request_desc: MessageDescriptor,
        req: http::Request<tonic::body::Body>,
        handler: F,
    ) -> http::Response<tonic::body::Body>
    where
        F: FnMut(DynamicMessage) -> Result<DynamicMessage, Status> + Send + 'static,
    {
        let codec = DynamicCodec::new(request_desc);
        let mut grpc = tonic::server::Grpc::new(codec);
        grpc.unary(HandlerUnary(handler), req).await
    }
}

struct HandlerUnary<F>(F);

impl<F> tonic::server::UnaryService<DynamicMessage> for HandlerUnary<F>
where
    F: FnMut(DynamicMessage) -> Result<DynamicMessage, Status> + Send + 'static,
{
    type Response = DynamicMessage;
    type Future = std::future::Ready<Result<tonic::Response<DynamicMessage>, Status>>;

    fn call(&mut self, request: tonic::Request<DynamicMessage>) -> Self::Future {
        std::future::ready((self.0)(request.into_inner()).map(tonic::Response::new))
    }
}

impl Service<http::Request<tonic::body::Body>> for TestBackend {
    type Response = http::Response<tonic::body::Body>;
    type Error = Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<tonic::body::Body>) -> Self::Future {
        let this = self.clone();
        Box::pin(async move { Ok(this.dispatch(req).await) })
    }
}

/// Dialer handing out in-process backends by address, with an observable dial
/// count and an optional artificial dial latency. Clones share state, so a
/// test can keep one handle while the cache owns another.
#[derive(Clone, Default)]
pub struct FakeDialer {
    inner: Arc<DialerInner>,
    dial_delay: Option<Duration>,
}

#[derive(Default)]
struct DialerInner {
    backends: Mutex<HashMap<String, TestBackend>>,
    dials: AtomicUsize,
}

impl FakeDialer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dial_delay(mut self, delay: Duration) -> Self {
        self.dial_delay = Some(delay);
        self
    }

    pub fn register(&self, addr: impl Into<String>, backend: TestBackend) {
        self.inner
            .backends
            .lock()
            .expect("backend map lock poisoned")
            .insert(addr.into(), backend);
    }

    pub fn dial_count(&self) -> usize {
        self.inner.dials.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Dialer for FakeDialer {
    type Channel = TestBackend;

    async fn dial(&self, addr: &str) -> Result<TestBackend, BoxError> {
        self.inner.dials.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.dial_delay {
            tokio::time::sleep(delay).await;
        }
        let backend = self
            .inner
            .backends
            .lock()
            .expect("backend map lock poisoned")
            .get(addr)
            .cloned();
        backend.ok_or_else(|| format!("connection refused: {addr}").into())
    }
}
