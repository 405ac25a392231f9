//! Controller configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::endpoint::EndpointResolver;
use crate::error::{DEFAULT_CONNECTION_ERROR_MESSAGE, DEFAULT_ERROR_MESSAGE};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid port: {0}")]
    InvalidPort(String),
}

/// Messages placed in errors that carry no server-provided text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorMessages {
    /// Used for `ServerError` when the envelope has no message.
    pub server_default: String,
    /// Carried by every `NoConnectivity`.
    pub no_connectivity: String,
}

impl Default for ErrorMessages {
    fn default() -> Self {
        Self {
            server_default: DEFAULT_ERROR_MESSAGE.to_string(),
            no_connectivity: DEFAULT_CONNECTION_ERROR_MESSAGE.to_string(),
        }
    }
}

/// Everything a `NetworkController` can be tuned with.
///
/// Deserializable so it can live in the host application's config file;
/// every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub messages: ErrorMessages,
    /// Log raw response bodies at debug level.
    pub log_bodies: bool,
    /// Longer bodies are truncated in logs.
    pub max_logged_body_bytes: usize,
    pub resolver: EndpointResolver,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            messages: ErrorMessages::default(),
            log_bodies: true,
            max_logged_body_bytes: 2048,
            resolver: EndpointResolver::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_fixed_messages() {
        let config = ControllerConfig::default();
        assert_eq!(config.messages.server_default, "default.error.message");
        assert_eq!(
            config.messages.no_connectivity,
            "default.connection.error.message"
        );
        assert!(config.log_bodies);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: ControllerConfig = serde_json::from_str(
            r#"{"log_bodies":false,"resolver":{"host":"api.example.com","port":8080}}"#,
        )
        .unwrap();
        assert!(!config.log_bodies);
        assert_eq!(config.max_logged_body_bytes, 2048);
        assert_eq!(config.resolver.scheme, "https");
        assert_eq!(config.resolver.host, "api.example.com");
        assert_eq!(config.resolver.port, Some(8080));
        assert_eq!(config.messages, ErrorMessages::default());
    }
}
