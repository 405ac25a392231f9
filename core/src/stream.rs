//! Streaming call surface.
//!
//! A [`CallPublisher`] is cold: it holds a description of the call and sends
//! nothing until subscribed. Every subscription is an independent execution
//! with its own request and correlation id, and ends with exactly one
//! terminal event, either `Completed` or `Cancelled`.

use std::marker::PhantomData;
use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::classify::classify;
use crate::config::ControllerConfig;
use crate::decode::{BodyExpectation, Decoder};
use crate::error::ClassifiedResult;
use crate::http::{Headers, HttpMethod, HttpResponse};
use crate::instrument::{CallContext, CallMode};
use crate::params::{ParamMode, Params};
use crate::request;
use crate::transport::{Transport, TransportEvent, TransportOutcome};

/// One event of a streaming call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallEvent<R> {
    /// The transport started the request.
    Started,
    /// Raw status and body, before classification.
    Output { status: u16, body: Vec<u8> },
    Completed(ClassifiedResult<R>),
    Cancelled,
}

impl<R> CallEvent<R> {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallEvent::Completed(_) | CallEvent::Cancelled)
    }
}

pub type CallStream<R> = BoxStream<'static, CallEvent<R>>;

/// Deferred streaming call. See the module docs.
pub struct CallPublisher<T, D, B> {
    transport: Arc<T>,
    decoder: Arc<D>,
    config: Arc<ControllerConfig>,
    method: HttpMethod,
    url: String,
    headers: Headers,
    params: Option<Params>,
    mode: ParamMode,
    expectation: PhantomData<fn() -> B>,
}

impl<T, D, B> Clone for CallPublisher<T, D, B> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            decoder: Arc::clone(&self.decoder),
            config: Arc::clone(&self.config),
            method: self.method,
            url: self.url.clone(),
            headers: self.headers.clone(),
            params: self.params.clone(),
            mode: self.mode,
            expectation: PhantomData,
        }
    }
}

impl<T, D, B> CallPublisher<T, D, B> {
    pub(crate) fn new(
        transport: Arc<T>,
        decoder: Arc<D>,
        config: Arc<ControllerConfig>,
        method: HttpMethod,
        url: &str,
        headers: &Headers,
        params: Option<&Params>,
    ) -> Self {
        Self {
            transport,
            decoder,
            config,
            method,
            url: url.to_string(),
            headers: headers.clone(),
            params: params.cloned(),
            mode: ParamMode::Body,
            expectation: PhantomData,
        }
    }

    /// Params travel in the body unless changed here.
    pub fn with_param_mode(mut self, mode: ParamMode) -> Self {
        self.mode = mode;
        self
    }
}

impl<T, D, B> CallPublisher<T, D, B>
where
    T: Transport + 'static,
    D: Decoder + 'static,
    B: BodyExpectation + 'static,
    B::Output: Send + 'static,
{
    /// Start a new execution of the call.
    pub fn subscribe(&self) -> CallStream<B::Output> {
        self.subscribe_until(CancellationToken::new())
    }

    /// Start a new execution that ends with `Cancelled` once `token` fires.
    pub fn subscribe_until(&self, token: CancellationToken) -> CallStream<B::Output> {
        let publisher = self.clone();
        let events = async_stream::stream! {
            let CallPublisher { transport, decoder, config, method, url, headers, params, mode, .. } =
                publisher;
            let mut ctx = CallContext::new(CallMode::Stream, &config);
            ctx.log_request(Some(url.as_str()), params.as_ref(), &headers);

            let request = match request::build(method, Some(url.as_str()), &headers, params.as_ref(), mode) {
                Ok(request) => request,
                Err(err) => {
                    let result: ClassifiedResult<B::Output> = Err(err);
                    ctx.finish(&result);
                    yield CallEvent::Completed(result);
                    return;
                }
            };

            let mut upstream = transport.subscribe(request);
            let mut output: Option<HttpResponse> = None;
            let mut failure = None;
            loop {
                let next = tokio::select! {
                    biased;
                    _ = token.cancelled() => None,
                    event = upstream.next() => Some(event),
                };
                match next {
                    None | Some(Some(TransportEvent::Cancelled)) => {
                        ctx.cancelled();
                        yield CallEvent::Cancelled;
                        return;
                    }
                    Some(None) | Some(Some(TransportEvent::Completed)) => break,
                    Some(Some(TransportEvent::Started)) => {
                        ctx.dispatched();
                        yield CallEvent::Started;
                    }
                    Some(Some(TransportEvent::Output(response))) => {
                        ctx.output(&response);
                        yield CallEvent::Output {
                            status: response.status,
                            body: response.body.clone(),
                        };
                        output = Some(response);
                    }
                    Some(Some(TransportEvent::Failed(err))) => {
                        failure = Some(err);
                        break;
                    }
                }
            }

            let outcome = match (failure, output) {
                (Some(failure), _) => TransportOutcome::Failure(failure),
                (None, Some(response)) => TransportOutcome::Response(response),
                (None, None) => TransportOutcome::Missing,
            };
            let result = ctx
                .span()
                .in_scope(|| classify::<B, D>(outcome, &*decoder, &config.messages));
            ctx.finish(&result);
            yield CallEvent::Completed(result);
        };
        events.boxed()
    }
}
