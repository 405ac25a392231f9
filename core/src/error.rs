//! Error taxonomy for classified calls.
//!
//! # Design
//! The set is closed and flat: every failure a caller can see is one of these
//! kinds, and no transport or decoder error type leaks through. Decode
//! failures collapse into a single `Decode` kind; the structural detail
//! (failure kind, location, serde message) is logged where it happens and
//! dropped from the returned value.

use thiserror::Error;

use crate::transport::TransportFailure;

/// Result shape of every call made through the controller.
pub type ClassifiedResult<T> = Result<T, NetworkError>;

/// Message carried by `NetworkError::Decode`.
pub const DECODE_ERROR_MESSAGE: &str = "decoding error";

/// Fallback for `ServerError` when the error envelope has no message.
pub const DEFAULT_ERROR_MESSAGE: &str = "default.error.message";

/// Message carried by `NoConnectivity`.
pub const DEFAULT_CONNECTION_ERROR_MESSAGE: &str = "default.connection.error.message";

/// Errors returned by `NetworkController` calls.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NetworkError {
    /// No URL was given, or it could not be parsed into an absolute URL.
    #[error("invalid URL")]
    InvalidUrl,

    /// The transport succeeded but produced nothing with a usable status.
    #[error("no response")]
    NoResponse,

    /// The device has no network connectivity.
    #[error("no connectivity: {0}")]
    NoConnectivity(String),

    /// Any other transport failure.
    #[error("transport error: {0}")]
    TransportError(TransportFailure),

    /// The server answered with a non-2xx status and a decodable error body.
    #[error("server error: {0}")]
    ServerError(String),

    /// The body could not be decoded into the expected type.
    #[error("decode error: {0}")]
    Decode(String),
}

impl NetworkError {
    /// Short label used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            NetworkError::InvalidUrl => "invalid_url",
            NetworkError::NoResponse => "no_response",
            NetworkError::NoConnectivity(_) => "no_connectivity",
            NetworkError::TransportError(_) => "transport_error",
            NetworkError::ServerError(_) => "server_error",
            NetworkError::Decode(_) => "decode_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportCause;

    #[test]
    fn display_includes_message() {
        let err = NetworkError::ServerError("not found".to_string());
        assert_eq!(err.to_string(), "server error: not found");
        assert_eq!(NetworkError::InvalidUrl.to_string(), "invalid URL");
    }

    #[test]
    fn kinds_are_distinct() {
        let all = [
            NetworkError::InvalidUrl,
            NetworkError::NoResponse,
            NetworkError::NoConnectivity(String::new()),
            NetworkError::TransportError(TransportFailure::new(TransportCause::Other, "x")),
            NetworkError::ServerError(String::new()),
            NetworkError::Decode(String::new()),
        ];
        let mut kinds: Vec<&str> = all.iter().map(NetworkError::kind).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), all.len());
    }
}
