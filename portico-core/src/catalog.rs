//! # Message Descriptor Catalog
//!
//! The catalog is the process-wide mapping from fully-qualified message names
//! to descriptors. It is populated exactly once at startup, either from a
//! compiled `FileDescriptorSet` blob or from an already assembled pool, and
//! is read-only afterwards, so concurrent lookups need no synchronization.
//!
//! The gateway has no per-route stubs: the request and response message types
//! for a call are derived from the endpoint's service and method names by a
//! fixed naming convention (see [`request_type_name`]).
use prost_reflect::{DescriptorError, DescriptorPool, MessageDescriptor};

/// Startup-built, read-only message type catalog.
#[derive(Debug, Clone)]
pub struct MessageCatalog {
    pool: DescriptorPool,
}

impl MessageCatalog {
    /// Builds the catalog from an encoded `FileDescriptorSet`, the artifact a
    /// protobuf compiler emits for the set of messages the gateway is built
    /// against.
    pub fn from_descriptor_set(bytes: &[u8]) -> Result<Self, DescriptorError> {
        Ok(Self {
            pool: DescriptorPool::decode(bytes)?,
        })
    }

    pub fn from_pool(pool: DescriptorPool) -> Self {
        Self { pool }
    }

    /// True when the catalog knows no message types at all. A gateway in that
    /// state cannot serve anything and should refuse to start.
    pub fn is_empty(&self) -> bool {
        self.pool.all_messages().next().is_none()
    }

    /// Descriptor of the request message for a service/method pair, derived
    /// by the naming convention.
    pub fn request_message(&self, service: &str, method: &str) -> Option<MessageDescriptor> {
        self.pool.get_message_by_name(&request_type_name(service, method))
    }

    /// Descriptor of the response message for a service/method pair.
    pub fn response_message(&self, service: &str, method: &str) -> Option<MessageDescriptor> {
        self.pool.get_message_by_name(&response_type_name(service, method))
    }

    pub fn pool(&self) -> &DescriptorPool {
        &self.pool
    }
}

/// Derives the fully-qualified request message name for a call.
///
/// The rule: keep the service's package, drop the service's own name, append
/// the method name and the fixed `Request` suffix.
///
/// * `orders.OrderService` + `GetOrder` → `orders.GetOrderRequest`
/// * `acme.billing.v1.InvoiceService` + `Issue` → `acme.billing.v1.IssueRequest`
/// * `Standalone` + `Do` → `DoRequest`
pub fn request_type_name(service: &str, method: &str) -> String {
    qualified_message_name(service, method, "Request")
}

/// Derives the fully-qualified response message name for a call. Same rule as
/// [`request_type_name`] with a `Response` suffix.
pub fn response_type_name(service: &str, method: &str) -> String {
    qualified_message_name(service, method, "Response")
}

fn qualified_message_name(service: &str, method: &str, suffix: &str) -> String {
    match service.rsplit_once('.') {
        Some((package, _service_name)) => format!("{package}.{method}{suffix}"),
        None => format!("{method}{suffix}"),
    }
}
