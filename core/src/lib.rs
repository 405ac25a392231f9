//! Typed HTTP client core.
//!
//! # Overview
//! Builds requests from a method, URL, headers and params, hands them to an
//! injected [`Transport`], and classifies whatever comes back into exactly
//! one [`ClassifiedResult`]: a decoded value or one of the [`NetworkError`]
//! kinds. The core never opens sockets itself, so everything above the
//! transport is deterministic and testable.
//!
//! # Design
//! - `NetworkController` is stateless between calls; it holds only the
//!   transport, the decoder and the configuration.
//! - Each call is split into request building (`request::build`), the
//!   transport round-trip, and classification (`classify::classify`), so the
//!   I/O boundary is explicit.
//! - Whether a 2xx body is decoded is chosen by type: `request::<T>` decodes,
//!   `request_empty` never looks at the body.
//! - Every call is traced under an `http_call` span with a short correlation
//!   id.

pub mod classify;
pub mod client;
pub mod config;
pub mod decode;
pub mod endpoint;
pub mod error;
pub mod http;
pub(crate) mod instrument;
pub mod params;
pub mod request;
pub mod stream;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use client::NetworkController;
pub use config::{ConfigError, ControllerConfig, ErrorMessages};
pub use decode::{BodyExpectation, Decode, DecodeFailure, DecodeFailureKind, Decoder, JsonDecoder};
pub use endpoint::{Endpoint, EndpointResolver};
pub use error::{ClassifiedResult, NetworkError};
pub use http::{Headers, HttpMethod, HttpRequest, HttpResponse};
pub use params::{ParamMode, ParamValue, Params};
pub use stream::{CallEvent, CallPublisher, CallStream};
pub use transport::{Transport, TransportCause, TransportEvent, TransportFailure, TransportOutcome};
pub use types::{Empty, ErrorEnvelope};
