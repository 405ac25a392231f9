//! In-memory transport used by unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;

use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::{Transport, TransportEvent, TransportFailure};

pub(crate) const USER_URL: &str = "https://api.example.com/users/1";

pub(crate) fn get_request() -> HttpRequest {
    HttpRequest {
        method: HttpMethod::Get,
        url: url::Url::parse(USER_URL).unwrap(),
        headers: Vec::new(),
        body: Vec::new(),
    }
}

enum Script {
    Respond(HttpResponse),
    Fail(TransportFailure),
    Pending,
    Events(Vec<TransportEvent>),
}

/// Sets its flag when dropped, so tests can see an abandoned future.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

pub(crate) struct ScriptedTransport {
    script: Script,
    calls: AtomicUsize,
    last_request: Mutex<Option<HttpRequest>>,
    abandoned: Arc<AtomicBool>,
}

impl ScriptedTransport {
    fn with_script(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
            abandoned: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn respond(status: u16, body: &str) -> Self {
        Self::with_script(Script::Respond(HttpResponse::new(status, body)))
    }

    pub(crate) fn fail(failure: TransportFailure) -> Self {
        Self::with_script(Script::Fail(failure))
    }

    /// Never completes.
    pub(crate) fn pending() -> Self {
        Self::with_script(Script::Pending)
    }

    /// `subscribe` replays exactly these events.
    pub(crate) fn events(events: Vec<TransportEvent>) -> Self {
        Self::with_script(Script::Events(events))
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_request(&self) -> Option<HttpRequest> {
        self.last_request.lock().unwrap().clone()
    }

    /// True once a pending `send` future has been dropped.
    pub(crate) fn was_abandoned(&self) -> bool {
        self.abandoned.load(Ordering::SeqCst)
    }

    fn record(&self, request: &HttpRequest) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportFailure> {
        self.record(&request);
        match &self.script {
            Script::Respond(response) => Ok(response.clone()),
            Script::Fail(failure) => Err(failure.clone()),
            Script::Pending => {
                let _flag = DropFlag(self.abandoned.clone());
                futures::future::pending().await
            }
            Script::Events(_) => panic!("events script only supports subscribe"),
        }
    }

    fn subscribe(&self, request: HttpRequest) -> BoxStream<'_, TransportEvent> {
        match &self.script {
            Script::Events(events) => {
                self.record(&request);
                futures::stream::iter(events.clone()).boxed()
            }
            _ => {
                let events = async_stream::stream! {
                    yield TransportEvent::Started;
                    match self.send(request).await {
                        Ok(response) => {
                            yield TransportEvent::Output(response);
                            yield TransportEvent::Completed;
                        }
                        Err(failure) => yield TransportEvent::Failed(failure),
                    }
                };
                events.boxed()
            }
        }
    }
}
