//! Caller-facing controller.
//!
//! # Design
//! `NetworkController` holds only shared, immutable pieces: the injected
//! transport, the decoder and the configuration. Every call builds its own
//! request and its own `CallContext`, so concurrent calls share no mutable
//! state and the controller is cheap to clone.
//!
//! A single-shot call is an `async fn`: dropping its future abandons the
//! in-flight transport call, skips classification and leaves a cancellation
//! record in the logs. Streaming calls go through [`CallPublisher`].

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{warn, Instrument};

use crate::classify::classify;
use crate::config::ControllerConfig;
use crate::decode::{BodyExpectation, Decode, Decoder, JsonDecoder};
use crate::endpoint::Endpoint;
use crate::error::ClassifiedResult;
use crate::http::{Headers, HttpMethod};
use crate::instrument::{CallContext, CallMode};
use crate::params::{ParamMode, Params};
use crate::request;
use crate::stream::CallPublisher;
use crate::transport::{Transport, TransportOutcome};
use crate::types::Empty;

/// Typed HTTP client over an injected [`Transport`].
pub struct NetworkController<T, D = JsonDecoder> {
    transport: Arc<T>,
    decoder: Arc<D>,
    config: Arc<ControllerConfig>,
}

impl<T, D> Clone for NetworkController<T, D> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            decoder: Arc::clone(&self.decoder),
            config: Arc::clone(&self.config),
        }
    }
}

impl<T: Transport> NetworkController<T> {
    pub fn new(transport: T) -> Self {
        Self::from_shared(Arc::new(transport))
    }

    /// Use a transport that is also held elsewhere.
    pub fn from_shared(transport: Arc<T>) -> Self {
        Self {
            transport,
            decoder: Arc::new(JsonDecoder),
            config: Arc::new(ControllerConfig::default()),
        }
    }
}

impl<T: Transport, D: Decoder> NetworkController<T, D> {
    pub fn with_decoder<D2: Decoder>(self, decoder: D2) -> NetworkController<T, D2> {
        NetworkController {
            transport: self.transport,
            decoder: Arc::new(decoder),
            config: self.config,
        }
    }

    pub fn with_config(mut self, config: ControllerConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Issue one request and decode a 2xx body as `R`.
    pub async fn request<R: DeserializeOwned>(
        &self,
        method: HttpMethod,
        url: Option<&str>,
        headers: &Headers,
        params: Option<&Params>,
        mode: ParamMode,
    ) -> ClassifiedResult<R> {
        self.execute::<Decode<R>>(method, url, headers, params, mode)
            .await
    }

    /// Issue one request whose 2xx body is ignored.
    pub async fn request_empty(
        &self,
        method: HttpMethod,
        url: Option<&str>,
        headers: &Headers,
        params: Option<&Params>,
        mode: ParamMode,
    ) -> ClassifiedResult<Empty> {
        self.execute::<Empty>(method, url, headers, params, mode)
            .await
    }

    /// Like [`request`](Self::request), but gives up when `token` fires.
    ///
    /// Returns `None` if the call was cancelled before it produced a result.
    pub async fn request_cancellable<R: DeserializeOwned>(
        &self,
        method: HttpMethod,
        url: Option<&str>,
        headers: &Headers,
        params: Option<&Params>,
        mode: ParamMode,
        token: &CancellationToken,
    ) -> Option<ClassifiedResult<R>> {
        tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = self.execute::<Decode<R>>(method, url, headers, params, mode) => Some(result),
        }
    }

    /// Resolve `endpoint` with the configured resolver, then call it.
    pub async fn request_endpoint<R: DeserializeOwned>(
        &self,
        method: HttpMethod,
        endpoint: &Endpoint,
        headers: &Headers,
        params: Option<&Params>,
        mode: ParamMode,
    ) -> ClassifiedResult<R> {
        let url = match self.config.resolver.resolve(endpoint) {
            Ok(url) => url,
            Err(err) => {
                let mut ctx = CallContext::new(CallMode::Single, &self.config);
                ctx.log_request(None, params, headers);
                warn!(
                    parent: ctx.span(),
                    path = %endpoint.path,
                    scheme = %self.config.resolver.scheme,
                    host = %self.config.resolver.host,
                    "endpoint not resolvable"
                );
                let result = Err(err);
                ctx.finish(&result);
                return result;
            }
        };
        self.request(method, Some(url.as_str()), headers, params, mode)
            .await
    }

    /// Streaming call decoding a 2xx body as `R`. Nothing is sent until the
    /// returned publisher is subscribed.
    pub fn request_stream<R: DeserializeOwned>(
        &self,
        method: HttpMethod,
        url: &str,
        headers: &Headers,
        params: Option<&Params>,
    ) -> CallPublisher<T, D, Decode<R>> {
        CallPublisher::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.decoder),
            Arc::clone(&self.config),
            method,
            url,
            headers,
            params,
        )
    }

    /// Streaming call whose 2xx body is ignored.
    pub fn request_stream_empty(
        &self,
        method: HttpMethod,
        url: &str,
        headers: &Headers,
        params: Option<&Params>,
    ) -> CallPublisher<T, D, Empty> {
        CallPublisher::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.decoder),
            Arc::clone(&self.config),
            method,
            url,
            headers,
            params,
        )
    }

    async fn execute<B: BodyExpectation>(
        &self,
        method: HttpMethod,
        url: Option<&str>,
        headers: &Headers,
        params: Option<&Params>,
        mode: ParamMode,
    ) -> ClassifiedResult<B::Output> {
        let mut ctx = CallContext::new(CallMode::Single, &self.config);
        ctx.log_request(url, params, headers);

        let request = match request::build(method, url, headers, params, mode) {
            Ok(request) => request,
            Err(err) => {
                let result = Err(err);
                ctx.finish(&result);
                return result;
            }
        };

        ctx.dispatched();
        let sent = self
            .transport
            .send(request)
            .instrument(ctx.span().clone())
            .await;
        let outcome = TransportOutcome::from(sent);
        if let TransportOutcome::Response(response) = &outcome {
            ctx.output(response);
        }

        let result = ctx
            .span()
            .in_scope(|| classify::<B, D>(outcome, &*self.decoder, &self.config.messages));
        ctx.finish(&result);
        result
    }
}
