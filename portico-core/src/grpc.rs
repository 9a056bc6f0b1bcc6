//! # Generic gRPC Transport
//!
//! Low-level building blocks for performing gRPC calls with message types
//! resolved at runtime.
//!
//! Unlike standard `tonic` clients, which are strongly typed against
//! generated structs, the components here move `prost_reflect::DynamicMessage`
//! values whose schema is supplied per call by the descriptor catalog.
pub mod client;
pub mod codec;
