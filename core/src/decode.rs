//! Body decoding.
//!
//! # Design
//! A `Decoder` turns raw bytes into any `DeserializeOwned` type. The default
//! `JsonDecoder` uses `serde_json`; timestamps in target types are expected as
//! `chrono::DateTime<Utc>`, whose serde form is RFC 3339. Failures keep their
//! structural detail in `DecodeFailure` so it can be logged, but the
//! classifier reports all of them as one `NetworkError::Decode`.
//!
//! `BodyExpectation` is how a call states, at compile time, whether the body
//! is decoded (`Decode<T>`) or skipped (`Empty`).

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::error::Category;
use thiserror::Error;

use crate::types::Empty;

/// Structural reason a decode failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeFailureKind {
    /// Not valid input at all (syntax error, truncated, wrong encoding).
    DataCorrupted,
    /// A required field is missing.
    KeyNotFound,
    /// A required value is `null`.
    ValueNotFound,
    /// A value has the wrong type.
    TypeMismatch,
}

impl fmt::Display for DecodeFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DecodeFailureKind::DataCorrupted => "data_corrupted",
            DecodeFailureKind::KeyNotFound => "key_not_found",
            DecodeFailureKind::ValueNotFound => "value_not_found",
            DecodeFailureKind::TypeMismatch => "type_mismatch",
        };
        f.write_str(s)
    }
}

/// Full decode diagnostic. Logged, never returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at {location}: {detail}")]
pub struct DecodeFailure {
    pub kind: DecodeFailureKind,
    /// `line:column` for JSON input.
    pub location: String,
    pub detail: String,
}

/// Decoding strategy applied to response bodies.
pub trait Decoder: Send + Sync {
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, DecodeFailure>;
}

/// `serde_json` decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl Decoder for JsonDecoder {
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, DecodeFailure> {
        serde_json::from_slice(bytes).map_err(|e| failure_from_json(&e))
    }
}

fn failure_from_json(err: &serde_json::Error) -> DecodeFailure {
    let detail = err.to_string();
    let kind = match err.classify() {
        Category::Data if detail.starts_with("missing field") => DecodeFailureKind::KeyNotFound,
        Category::Data if detail.starts_with("invalid type: null") => {
            DecodeFailureKind::ValueNotFound
        }
        Category::Data => DecodeFailureKind::TypeMismatch,
        Category::Syntax | Category::Eof | Category::Io => DecodeFailureKind::DataCorrupted,
    };
    DecodeFailure {
        kind,
        location: format!("{}:{}", err.line(), err.column()),
        detail,
    }
}

/// What a call does with a 2xx body.
pub trait BodyExpectation {
    type Output;

    /// False when the body is never looked at.
    const READS_BODY: bool;

    fn accept<D: Decoder>(decoder: &D, body: &[u8]) -> Result<Self::Output, DecodeFailure>;
}

/// Decode the body as `T`.
pub struct Decode<T>(PhantomData<fn() -> T>);

impl<T: DeserializeOwned> BodyExpectation for Decode<T> {
    type Output = T;
    const READS_BODY: bool = true;

    fn accept<D: Decoder>(decoder: &D, body: &[u8]) -> Result<T, DecodeFailure> {
        decoder.decode(body)
    }
}

impl BodyExpectation for Empty {
    type Output = Empty;
    const READS_BODY: bool = false;

    fn accept<D: Decoder>(_decoder: &D, _body: &[u8]) -> Result<Empty, DecodeFailure> {
        Ok(Empty)
    }
}
