//! Injected transport abstraction.
//!
//! The core never opens sockets. A `Transport` receives a finished
//! `HttpRequest` and either returns the status and body or fails with a
//! `TransportFailure`. Redirects, TLS, pooling and timeouts are all the
//! transport's business.

use std::fmt;
use std::io;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::http::{HttpRequest, HttpResponse};

/// Why a transport call failed. A failure may carry several causes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportCause {
    /// No route to the network at all (offline, network unreachable).
    NotConnected,
    TimedOut,
    Cancelled,
    Tls,
    Protocol,
    Other,
}

impl fmt::Display for TransportCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportCause::NotConnected => "not connected",
            TransportCause::TimedOut => "timed out",
            TransportCause::Cancelled => "cancelled",
            TransportCause::Tls => "tls",
            TransportCause::Protocol => "protocol",
            TransportCause::Other => "other",
        };
        f.write_str(s)
    }
}

/// A failed transport call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportFailure {
    pub causes: Vec<TransportCause>,
    pub message: String,
}

impl TransportFailure {
    pub fn new(cause: TransportCause, message: impl Into<String>) -> Self {
        Self {
            causes: vec![cause],
            message: message.into(),
        }
    }

    pub fn with_cause(mut self, cause: TransportCause) -> Self {
        if !self.causes.contains(&cause) {
            self.causes.push(cause);
        }
        self
    }

    pub fn not_connected(message: impl Into<String>) -> Self {
        Self::new(TransportCause::NotConnected, message)
    }

    /// True when any cause says the network is unreachable.
    pub fn is_no_connectivity(&self) -> bool {
        self.causes.contains(&TransportCause::NotConnected)
    }

    /// Map an I/O error into a failure.
    ///
    /// Only a missing network is tagged `NotConnected`; a host that is
    /// reachable but refuses the connection is an ordinary failure.
    pub fn from_io(err: &io::Error) -> Self {
        let cause = match err.kind() {
            io::ErrorKind::NotConnected
            | io::ErrorKind::NetworkDown
            | io::ErrorKind::NetworkUnreachable
            | io::ErrorKind::HostUnreachable => TransportCause::NotConnected,
            io::ErrorKind::TimedOut => TransportCause::TimedOut,
            _ => TransportCause::Other,
        };
        Self::new(cause, err.to_string())
    }
}

/// Lifecycle signal emitted by [`Transport::subscribe`].
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Started,
    Output(HttpResponse),
    Completed,
    Failed(TransportFailure),
    Cancelled,
}

/// Raw result of one transport call, before classification.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportOutcome {
    Response(HttpResponse),
    Failure(TransportFailure),
    /// The transport finished without producing any response.
    Missing,
}

impl From<Result<HttpResponse, TransportFailure>> for TransportOutcome {
    fn from(result: Result<HttpResponse, TransportFailure>) -> Self {
        match result {
            Ok(response) => TransportOutcome::Response(response),
            Err(failure) => TransportOutcome::Failure(failure),
        }
    }
}

/// The capability the core needs from an HTTP client.
///
/// Implementations may reuse connections across calls but must treat each
/// request independently.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute `request` and wait for the full response.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportFailure>;

    /// Execute `request` as a stream of lifecycle events.
    ///
    /// The default wraps [`Transport::send`]: `Started`, then either
    /// `Output` followed by `Completed`, or a single `Failed`.
    fn subscribe(&self, request: HttpRequest) -> BoxStream<'_, TransportEvent> {
        Box::pin(async_stream::stream! {
            yield TransportEvent::Started;
            match self.send(request).await {
                Ok(response) => {
                    yield TransportEvent::Output(response);
                    yield TransportEvent::Completed;
                }
                Err(failure) => yield TransportEvent::Failed(failure),
            }
        })
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportFailure> {
        (**self).send(request).await
    }

    fn subscribe(&self, request: HttpRequest) -> BoxStream<'_, TransportEvent> {
        (**self).subscribe(request)
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;
    use crate::testing::{get_request, ScriptedTransport};

    #[test]
    fn connectivity_is_detected_among_other_causes() {
        let failure = TransportFailure::new(TransportCause::TimedOut, "offline")
            .with_cause(TransportCause::NotConnected);
        assert!(failure.is_no_connectivity());
        assert!(!TransportFailure::new(TransportCause::Tls, "bad cert").is_no_connectivity());
    }

    #[test]
    fn with_cause_does_not_duplicate() {
        let failure = TransportFailure::not_connected("x").with_cause(TransportCause::NotConnected);
        assert_eq!(failure.causes, vec![TransportCause::NotConnected]);
    }

    #[test]
    fn io_errors_map_to_causes() {
        let offline = io::Error::new(io::ErrorKind::NetworkUnreachable, "offline");
        assert!(TransportFailure::from_io(&offline).is_no_connectivity());

        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        let failure = TransportFailure::from_io(&refused);
        assert!(!failure.is_no_connectivity());
        assert_eq!(failure.causes, vec![TransportCause::Other]);

        let timeout = io::Error::new(io::ErrorKind::TimedOut, "slow");
        assert_eq!(TransportFailure::from_io(&timeout).causes, vec![TransportCause::TimedOut]);

        let other = io::Error::new(io::ErrorKind::InvalidData, "garbage");
        assert_eq!(TransportFailure::from_io(&other).causes, vec![TransportCause::Other]);
    }

    #[test]
    fn outcome_from_result() {
        let ok: TransportOutcome = Ok(HttpResponse::new(200, "{}")).into();
        assert!(matches!(ok, TransportOutcome::Response(_)));
        let err: TransportOutcome = Err(TransportFailure::not_connected("x")).into();
        assert!(matches!(err, TransportOutcome::Failure(_)));
    }

    #[tokio::test]
    async fn default_subscribe_emits_started_output_completed() {
        let transport = ScriptedTransport::respond(200, r#"{"id":1}"#);
        let events: Vec<TransportEvent> = transport.subscribe(get_request()).collect().await;
        assert_eq!(
            events,
            vec![
                TransportEvent::Started,
                TransportEvent::Output(HttpResponse::new(200, r#"{"id":1}"#)),
                TransportEvent::Completed,
            ]
        );
    }

    #[tokio::test]
    async fn default_subscribe_emits_single_failure() {
        let transport = ScriptedTransport::fail(TransportFailure::not_connected("offline"));
        let events: Vec<TransportEvent> = transport.subscribe(get_request()).collect().await;
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], TransportEvent::Failed(_)));
    }
}
