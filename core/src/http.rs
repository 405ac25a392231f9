//! HTTP wire types exchanged with the transport.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The
//! builder produces an `HttpRequest`, an injected `Transport` executes it, and
//! the classifier consumes the resulting `HttpResponse`. Bodies are raw bytes
//! because the decoder, not the transport, decides what they mean.

use std::fmt;

use url::Url;

/// Ordered `(name, value)` header pairs. Values are opaque strings.
pub type Headers = Vec<(String, String)>;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully assembled request, ready for the wire.
///
/// Built once per call by [`crate::request::build`] and never mutated
/// afterwards; transports receive it by value.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// First header value matching `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response as returned by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Whether `status` is a code an HTTP response can actually carry.
    pub fn has_valid_status(&self) -> bool {
        (100..=599).contains(&self.status)
    }

    /// Success window used by the classifier. The upper bound is exclusive,
    /// so 299 is treated as an error status.
    pub fn is_success(&self) -> bool {
        (200..299).contains(&self.status)
    }
}
