//! Response payload types shared by every call.
//!
//! # Design
//! `Empty` is the marker a caller picks (through `request_empty`) when an
//! endpoint returns nothing useful on success. `ErrorEnvelope` is the body
//! shape expected on any non-2xx status.

use serde::{Deserialize, Serialize};

/// Successful response whose body is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Empty;

/// Error body returned by the server on non-2xx statuses.
///
/// All fields are optional, so `{}` is a valid envelope. `errorMessage` is
/// the message key; a plain `message` is only used when it is absent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(rename = "errorMessage")]
    pub error_message: Option<String>,
    pub message: Option<String>,
    pub description: Option<String>,
    pub code: Option<i64>,
}

impl ErrorEnvelope {
    /// Server-provided message, `errorMessage` first.
    pub fn into_message(self) -> Option<String> {
        self.error_message.or(self.message)
    }
}
