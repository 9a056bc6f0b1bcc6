//! # Portico Core
//!
//! `portico_core` is the foundational library powering the Portico gateway.
//! It translates inbound HTTP requests into gRPC calls against backends it
//! has no compile-time stubs for: the wire message types are resolved at
//! runtime from a descriptor catalog, and every backend method is invoked
//! through one generic unary client.
//!
//! ## Key Components
//!
//! * **[`gateway::Gateway`]:** The main entry point. The HTTP adapter hands it
//!   a [`route::Endpoint`] plus the raw request body; it resolves message
//!   types, acquires a channel, invokes the backend, and returns either the
//!   serialized response or a uniform error envelope.
//! * **[`catalog::MessageCatalog`]:** Startup-built, read-only mapping from
//!   fully-qualified message names to descriptors, with the naming convention
//!   that derives request/response types from a service/method pair.
//! * **[`directory::DirectoryResolver`]:** Bounded lookup of a backend's
//!   current address through the external directory service.
//! * **[`channel::ChannelCache`]:** Owns the live channels, one per backend
//!   service. Creation is serialized per key, reuse is optimistic, and
//!   anything unhealthy is evicted rather than stored.
//! * **[`health::HealthProber`]:** Bounded `grpc.health.v1` liveness check,
//!   run once after every fresh dial.
//! * **[`error::GatewayError`]:** The failure taxonomy and its total mapping
//!   onto HTTP statuses.
//!
//! ## Re-exports
//!
//! This crate re-exports `prost`, `prost-reflect`, and `tonic` to ensure that
//! consumers use compatible versions of these underlying dependencies.
pub mod catalog;
pub mod channel;
pub mod directory;
pub mod error;
pub mod gateway;
pub mod grpc;
pub mod health;
pub mod route;

// Re-exports
pub use prost;
pub use prost_reflect;
pub use tonic;

/// Type alias for the standard boxed error used in generic bounds and at the
/// external-collaborator seams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
