//! Per-call instrumentation.
//!
//! Every call, single-shot or streaming, owns one `CallContext`. It carries a
//! short random correlation id and a `tracing` span, records when the request
//! was dispatched, and logs exactly one terminal record: completion with the
//! classification, or cancellation. A context dropped before its terminal
//! record logs the cancellation itself, which is how an abandoned future is
//! reported.

use std::fmt;
use std::time::Instant;

use tracing::{debug, info, warn, Span};
use uuid::Uuid;

use crate::config::ControllerConfig;
use crate::error::ClassifiedResult;
use crate::http::{Headers, HttpResponse};
use crate::params::Params;

const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "proxy-authorization",
    "cookie",
    "set-cookie",
    "x-api-key",
    "api-key",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallMode {
    Single,
    Stream,
}

impl fmt::Display for CallMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallMode::Single => f.write_str("single"),
            CallMode::Stream => f.write_str("stream"),
        }
    }
}

pub(crate) struct CallContext {
    id: String,
    span: Span,
    created_at: Instant,
    dispatched_at: Option<Instant>,
    finished: bool,
    log_bodies: bool,
    max_logged_body_bytes: usize,
}

impl CallContext {
    pub(crate) fn new(mode: CallMode, config: &ControllerConfig) -> Self {
        let id = correlation_id();
        let span = tracing::info_span!("http_call", id = %id, mode = %mode);
        Self {
            id,
            span,
            created_at: Instant::now(),
            dispatched_at: None,
            finished: false,
            log_bodies: config.log_bodies,
            max_logged_body_bytes: config.max_logged_body_bytes,
        }
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn span(&self) -> &Span {
        &self.span
    }

    /// Milliseconds since dispatch, or since creation if never dispatched.
    pub(crate) fn elapsed_ms(&self) -> u64 {
        let since = self.dispatched_at.unwrap_or(self.created_at);
        u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    pub(crate) fn log_request(&self, url: Option<&str>, params: Option<&Params>, headers: &Headers) {
        let params = params.map(Params::encode).unwrap_or_default();
        let headers = masked_headers(headers);
        info!(parent: &self.span, url = url.unwrap_or("<none>"), %params, %headers, "request");
    }

    pub(crate) fn dispatched(&mut self) {
        self.dispatched_at = Some(Instant::now());
        debug!(parent: &self.span, "dispatched");
    }

    pub(crate) fn output(&self, response: &HttpResponse) {
        if self.log_bodies {
            let body = truncated_body(&response.body, self.max_logged_body_bytes);
            debug!(parent: &self.span, status = response.status, %body, "output");
        } else {
            debug!(parent: &self.span, status = response.status, bytes = response.body.len(), "output");
        }
    }

    pub(crate) fn finish<T>(&mut self, result: &ClassifiedResult<T>) {
        self.finished = true;
        let elapsed_ms = self.elapsed_ms();
        match result {
            Ok(_) => info!(parent: &self.span, elapsed_ms, outcome = "ok", "completed"),
            Err(err) => warn!(
                parent: &self.span,
                elapsed_ms,
                outcome = err.kind(),
                error = %err,
                "completed"
            ),
        }
    }

    pub(crate) fn cancelled(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        warn!(parent: &self.span, elapsed_ms = self.elapsed_ms(), "cancelled");
    }
}

impl Drop for CallContext {
    fn drop(&mut self) {
        self.cancelled();
    }
}

/// Eight hex digits from a v4 UUID. Collisions are tolerable.
fn correlation_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

fn truncated_body(body: &[u8], max: usize) -> String {
    let text = String::from_utf8_lossy(body);
    if text.len() <= max {
        return text.into_owned();
    }
    let mut cut = max;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...({} bytes)", &text[..cut], body.len())
}

/// Header list rendered for logs with credentials masked.
pub(crate) fn masked_headers(headers: &Headers) -> String {
    headers
        .iter()
        .map(|(k, v)| {
            let sensitive = SENSITIVE_HEADERS.iter().any(|s| k.eq_ignore_ascii_case(s));
            let v = if sensitive { mask_value(v) } else { v.clone() };
            format!("{k}: {v}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn mask_value(value: &str) -> String {
    if let Some(token) = value.strip_prefix("Bearer ") {
        if token.len() > 8 && token.is_ascii() {
            return format!("Bearer {}...{}", &token[..4], &token[token.len() - 4..]);
        }
        return "Bearer ***".to_string();
    }
    "***".to_string()
}
