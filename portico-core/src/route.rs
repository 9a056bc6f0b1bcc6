//! Static route descriptors binding HTTP routes to backend gRPC methods.
use serde::{Deserialize, Serialize};

/// Binding between one HTTP route and one backend method.
///
/// Loaded once at startup from the gateway configuration and never mutated
/// afterwards. `auth_required` and `skip_refresh` are consumed by middleware
/// layered in front of the core; they are carried through here untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    /// HTTP method the route answers to (`GET`, `POST`, ...).
    pub method: String,
    /// HTTP path the route is mounted at.
    pub path: String,
    /// Fully-qualified backend service name, e.g. `orders.OrderService`.
    pub grpc_service: String,
    /// Backend method name, e.g. `GetOrder`.
    pub grpc_method: String,
    #[serde(default)]
    pub auth_required: bool,
    #[serde(default)]
    pub skip_refresh: bool,
}
