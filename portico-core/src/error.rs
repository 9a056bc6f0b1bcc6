//! # Failure taxonomy & RPC-to-HTTP translation
//!
//! Every failure in the dispatch path collapses into [`GatewayError`], which
//! knows its gRPC status code, and from there into an HTTP status plus the
//! uniform `{statusCode, errors}` envelope the adapter writes back. The
//! mapping is total: a status code this module has never heard of lands on
//! 500, never in a panic.
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tonic::Code;

/// Failures that can occur while dispatching a request to a backend.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Directory unreachable, lookup timed out, or no record for the service.
    #[error("service discovery failed: {0}")]
    Discovery(String),

    /// Dial or post-dial liveness probe failure; also raised once the channel
    /// cache has been shut down.
    #[error("backend connection failed: {0}")]
    Connection(String),

    /// The naming convention produced a message type the catalog does not
    /// know.
    #[error("failed to find request type: {0}")]
    TypeResolution(String),

    /// The request bytes do not decode as the resolved message type.
    #[error("failed to unmarshal request: {0}")]
    Deserialization(String),

    /// Status reported by the backend, or synthesized for conditions such as
    /// an expired deadline.
    #[error("rpc failed: {0}")]
    Invocation(#[from] tonic::Status),

    /// The response message could not be turned back into bytes.
    #[error("failed to serialize response: {0}")]
    Serialization(String),
}

impl GatewayError {
    /// The gRPC status code this failure translates through.
    pub fn code(&self) -> Code {
        match self {
            GatewayError::Discovery(_) => Code::Unavailable,
            GatewayError::Connection(_) => Code::Unavailable,
            GatewayError::TypeResolution(_) => Code::Unimplemented,
            GatewayError::Deserialization(_) => Code::InvalidArgument,
            GatewayError::Invocation(status) => status.code(),
            GatewayError::Serialization(_) => Code::Internal,
        }
    }

    pub fn http_status(&self) -> StatusCode {
        http_status(self.code())
    }
}

/// Total mapping from a gRPC status code to the HTTP status served to the
/// caller. Unrecognized codes fall through to 500.
pub fn http_status(code: Code) -> StatusCode {
    match code {
        Code::Ok => StatusCode::OK,
        Code::InvalidArgument | Code::FailedPrecondition => StatusCode::BAD_REQUEST,
        Code::Unauthenticated => StatusCode::UNAUTHORIZED,
        Code::PermissionDenied => StatusCode::FORBIDDEN,
        Code::NotFound => StatusCode::NOT_FOUND,
        Code::AlreadyExists => StatusCode::CONFLICT,
        Code::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
        Code::Internal | Code::DataLoss => StatusCode::INTERNAL_SERVER_ERROR,
        Code::Unimplemented => StatusCode::NOT_IMPLEMENTED,
        Code::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Whether a status indicates the channel or backend process itself is gone,
/// as opposed to a business-logic rejection. Only these outcomes make the
/// invoker rebuild the channel and retry.
pub fn is_transport_class(code: Code) -> bool {
    matches!(code, Code::Unavailable | Code::Internal)
}

/// Uniform error body: every failure yields an HTTP status plus a non-empty
/// list of messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub status_code: u16,
    pub errors: Vec<String>,
}

impl ErrorEnvelope {
    pub fn new(status: StatusCode, message: String) -> Self {
        Self {
            status_code: status.as_u16(),
            errors: vec![message],
        }
    }

    /// Serializes the envelope to JSON. Encoding the envelope itself failing
    /// is an unexpected internal condition; it is logged and replaced with a
    /// generic body rather than surfaced to the caller.
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_else(|err| {
            tracing::error!(%err, "failed to serialize error envelope");
            br#"{"statusCode":500,"errors":["internal error"]}"#.to_vec()
        })
    }
}
