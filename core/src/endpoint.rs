//! Endpoint paths and their resolution into absolute URLs.
//!
//! The scheme/host policy belongs to the caller's configuration: an
//! `EndpointResolver` is built once (usually through `from_env`) and turns
//! each `Endpoint` into the URL handed to the request builder.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::ConfigError;
use crate::error::NetworkError;
use crate::params::percent_encode;

/// A path plus ordered query items, relative to the resolver's host.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Endpoint {
    pub path: String,
    pub query_items: Vec<(String, String)>,
}

impl Endpoint {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query_items: Vec::new(),
        }
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_items.push((name.into(), value.into()));
        self
    }
}

/// Fixed scheme/host/port policy applied to every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointResolver {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
}

impl Default for EndpointResolver {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            host: "localhost".to_string(),
            port: None,
        }
    }
}

impl EndpointResolver {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            port: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Read `CORE_NETWORK_SCHEME`, `CORE_NETWORK_HOST` and
    /// `CORE_NETWORK_PORT`, falling back to the defaults for unset values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut resolver = Self::default();
        if let Some(scheme) = lookup("CORE_NETWORK_SCHEME") {
            resolver.scheme = scheme;
        }
        if let Some(host) = lookup("CORE_NETWORK_HOST") {
            resolver.host = host;
        }
        if let Some(port) = lookup("CORE_NETWORK_PORT") {
            let parsed = port
                .parse()
                .map_err(|_| ConfigError::InvalidPort(port.clone()))?;
            resolver.port = Some(parsed);
        }
        Ok(resolver)
    }

    /// Absolute URL for `endpoint`.
    pub fn resolve(&self, endpoint: &Endpoint) -> Result<Url, NetworkError> {
        let authority = match self.port {
            Some(port) => format!("{}:{port}", self.host),
            None => self.host.clone(),
        };
        let mut url = Url::parse(&format!("{}://{authority}/", self.scheme))
            .map_err(|_| NetworkError::InvalidUrl)?;
        if url.cannot_be_a_base() || url.host_str().map_or(true, str::is_empty) {
            return Err(NetworkError::InvalidUrl);
        }
        url.set_path(endpoint.path.trim_start_matches('/'));
        if !endpoint.query_items.is_empty() {
            let query = endpoint
                .query_items
                .iter()
                .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&query));
        }
        Ok(url)
    }
}
