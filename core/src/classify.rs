//! Outcome classifier.
//!
//! # Design
//! `classify` maps one raw `TransportOutcome` to exactly one
//! `ClassifiedResult`. The order of checks is part of the contract because
//! callers depend on which error wins:
//!
//! 1. no-connectivity failure  -> `NoConnectivity`
//! 2. any other failure        -> `TransportError`
//! 3. no usable status         -> `NoResponse`
//! 4. status in `[200, 299)`   -> `Ok`, or `Decode` if the body does not fit
//! 5. any other status         -> `ServerError` from the error envelope, or
//!    `Decode` if the envelope does not fit
//!
//! Classification is pure apart from logging; events are emitted into
//! whatever span is current, so callers run it inside the call's span.

use std::any::type_name;

use tracing::{debug, warn};

use crate::config::ErrorMessages;
use crate::decode::{BodyExpectation, DecodeFailure, DecodeFailureKind, Decoder};
use crate::error::{ClassifiedResult, NetworkError, DECODE_ERROR_MESSAGE};
use crate::http::HttpResponse;
use crate::transport::TransportOutcome;
use crate::types::ErrorEnvelope;

/// Classify one transport outcome, applying the checks in the order listed
/// in the module docs.
pub fn classify<B, D>(
    outcome: TransportOutcome,
    decoder: &D,
    messages: &ErrorMessages,
) -> ClassifiedResult<B::Output>
where
    B: BodyExpectation,
    D: Decoder,
{
    match outcome {
        TransportOutcome::Failure(failure) if failure.is_no_connectivity() => {
            warn!(error = %failure, "no connectivity");
            Err(NetworkError::NoConnectivity(messages.no_connectivity.clone()))
        }
        TransportOutcome::Failure(failure) => {
            warn!(error = %failure, causes = ?failure.causes, "transport failure");
            Err(NetworkError::TransportError(failure))
        }
        TransportOutcome::Missing => {
            warn!("transport finished without a response");
            Err(NetworkError::NoResponse)
        }
        TransportOutcome::Response(response) if !response.has_valid_status() => {
            warn!(status = response.status, "response without a valid status");
            Err(NetworkError::NoResponse)
        }
        TransportOutcome::Response(response) if response.is_success() => {
            classify_success::<B, D>(&response, decoder)
        }
        TransportOutcome::Response(response) => classify_error(&response, decoder, messages),
    }
}

fn classify_success<B, D>(response: &HttpResponse, decoder: &D) -> ClassifiedResult<B::Output>
where
    B: BodyExpectation,
    D: Decoder,
{
    if !B::READS_BODY {
        debug!(status = response.status, parser = "empty", "body skipped");
    }
    match B::accept(decoder, &response.body) {
        Ok(value) => {
            if B::READS_BODY {
                debug!(status = response.status, parser = "ok", "body decoded");
            }
            Ok(value)
        }
        Err(failure) => Err(decode_error(&failure, type_name::<B::Output>())),
    }
}

fn classify_error<T, D: Decoder>(
    response: &HttpResponse,
    decoder: &D,
    messages: &ErrorMessages,
) -> ClassifiedResult<T> {
    match decoder.decode::<ErrorEnvelope>(&response.body) {
        Ok(envelope) => {
            warn!(
                status = response.status,
                code = ?envelope.code,
                description = ?envelope.description,
                "error response"
            );
            let message = envelope
                .into_message()
                .unwrap_or_else(|| messages.server_default.clone());
            Err(NetworkError::ServerError(message))
        }
        Err(failure) => Err(decode_error(&failure, type_name::<ErrorEnvelope>())),
    }
}

/// Log the full diagnostic and collapse it into the public kind.
fn decode_error(failure: &DecodeFailure, expected: &str) -> NetworkError {
    warn!(kind = %failure.kind, expected, detail = %failure.detail, "decoding error");
    if failure.kind != DecodeFailureKind::DataCorrupted {
        warn!(kind = %failure.kind, location = %failure.location, "decoding error location");
    }
    NetworkError::Decode(DECODE_ERROR_MESSAGE.to_string())
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use tracing_test::traced_test;

    use super::*;
    use crate::decode::{Decode, JsonDecoder};
    use crate::transport::{TransportCause, TransportFailure};
    use crate::types::Empty;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: i64,
        name: String,
    }

    fn respond(status: u16, body: &str) -> TransportOutcome {
        TransportOutcome::Response(HttpResponse::new(status, body))
    }

    fn as_user(outcome: TransportOutcome) -> ClassifiedResult<User> {
        classify::<Decode<User>, _>(outcome, &JsonDecoder, &ErrorMessages::default())
    }

    fn as_empty(outcome: TransportOutcome) -> ClassifiedResult<Empty> {
        classify::<Empty, _>(outcome, &JsonDecoder, &ErrorMessages::default())
    }

    fn ana() -> User {
        User {
            id: 1,
            name: "Ana".to_string(),
        }
    }

    #[test]
    fn success_statuses_decode_the_body() {
        for status in [200, 201, 204, 250, 298] {
            let result = as_user(respond(status, r#"{"id":1,"name":"Ana"}"#));
            assert_eq!(result, Ok(ana()), "status {status}");
        }
    }

    #[test]
    fn status_299_is_not_success() {
        let result = as_user(respond(299, r#"{"errorMessage":"edge"}"#));
        assert_eq!(result, Err(NetworkError::ServerError("edge".to_string())));
    }

    #[test]
    fn empty_expectation_accepts_any_body() {
        for body in ["not json", "", r#"{"id":1}"#, "\u{0}\u{1}"] {
            assert_eq!(as_empty(respond(204, body)), Ok(Empty), "{body:?}");
        }
        assert_eq!(as_empty(respond(200, "<html>")), Ok(Empty));
    }

    #[test]
    fn empty_expectation_still_classifies_errors() {
        let result = as_empty(respond(404, r#"{"errorMessage":"gone"}"#));
        assert_eq!(result, Err(NetworkError::ServerError("gone".to_string())));
    }

    #[test]
    fn malformed_success_body_is_decode_error() {
        for body in ["not json", r#"{"id":1}"#, r#"{"id":"1","name":"Ana"}"#, ""] {
            let result = as_user(respond(200, body));
            assert_eq!(
                result,
                Err(NetworkError::Decode("decoding error".to_string())),
                "{body:?}"
            );
        }
    }

    #[test]
    fn error_envelope_becomes_server_error() {
        let result = as_user(respond(404, r#"{"code":404,"errorMessage":"not found"}"#));
        assert_eq!(result, Err(NetworkError::ServerError("not found".to_string())));
    }

    #[test]
    fn envelope_with_both_message_keys_prefers_error_message() {
        let body = r#"{"code":400,"errorMessage":"bad input","message":"Bad Request"}"#;
        let result = classify::<Decode<serde_json::Value>, _>(
            respond(400, body),
            &JsonDecoder,
            &ErrorMessages::default(),
        );
        assert_eq!(result, Err(NetworkError::ServerError("bad input".to_string())));
    }

    #[test]
    fn plain_message_key_is_used_when_error_message_is_absent() {
        let result = as_empty(respond(400, r#"{"message":"Bad Request"}"#));
        assert_eq!(result, Err(NetworkError::ServerError("Bad Request".to_string())));
    }

    #[test]
    fn envelope_without_message_uses_default() {
        for status in [400, 401, 500, 503, 302, 100] {
            let result = as_user(respond(status, r#"{"code":1,"description":"x"}"#));
            assert_eq!(
                result,
                Err(NetworkError::ServerError("default.error.message".to_string())),
                "status {status}"
            );
        }
    }

    #[test]
    fn configured_default_message_is_used() {
        let messages = ErrorMessages {
            server_default: "something went wrong".to_string(),
            ..ErrorMessages::default()
        };
        let result = classify::<Decode<User>, _>(respond(500, "{}"), &JsonDecoder, &messages);
        assert_eq!(
            result,
            Err(NetworkError::ServerError("something went wrong".to_string()))
        );
    }

    #[test]
    fn undecodable_error_body_is_decode_error() {
        for body in ["<html>oops</html>", "", r#"{"code":"x"}"#] {
            let result = as_user(respond(500, body));
            assert!(matches!(result, Err(NetworkError::Decode(_))), "{body:?}");
        }
    }

    #[test]
    fn no_connectivity_wins_over_other_causes() {
        let failure = TransportFailure::new(TransportCause::TimedOut, "offline")
            .with_cause(TransportCause::Tls)
            .with_cause(TransportCause::NotConnected);
        let result = as_user(TransportOutcome::Failure(failure));
        assert_eq!(
            result,
            Err(NetworkError::NoConnectivity(
                "default.connection.error.message".to_string()
            ))
        );
    }

    #[test]
    fn other_failures_are_transport_errors() {
        let failure = TransportFailure::new(TransportCause::Tls, "bad certificate");
        let result = as_user(TransportOutcome::Failure(failure.clone()));
        assert_eq!(result, Err(NetworkError::TransportError(failure)));
    }

    #[test]
    fn invalid_status_is_no_response() {
        assert_eq!(as_user(respond(0, "")), Err(NetworkError::NoResponse));
        assert_eq!(as_empty(respond(999, "")), Err(NetworkError::NoResponse));
        assert_eq!(as_user(TransportOutcome::Missing), Err(NetworkError::NoResponse));
    }

    #[test]
    #[traced_test]
    fn decode_diagnostics_are_logged_not_returned() {
        let result = as_user(respond(200, r#"{"id":1}"#));
        let message = match result {
            Err(NetworkError::Decode(message)) => message,
            other => panic!("expected decode error, got {other:?}"),
        };
        assert!(!message.contains("name"));
        assert!(logs_contain("key_not_found"));
        assert!(logs_contain("missing field `name`"));
    }
}
