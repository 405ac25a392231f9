//! Request descriptor builder.
//!
//! # Design
//! `build` is a pure function of its inputs: it never touches the network and
//! never mutates what the caller passed in. It is the only place a URL is
//! parsed, so it is the only source of `NetworkError::InvalidUrl`.

use url::Url;

use crate::error::NetworkError;
use crate::http::{Headers, HttpMethod, HttpRequest};
use crate::params::{ParamMode, Params};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Assemble the wire request for one call.
///
/// In [`ParamMode::Query`] the encoded params are appended to any query the
/// URL already carries and the body stays empty. In [`ParamMode::Body`] they
/// become a form body and the URL is left as given.
pub fn build(
    method: HttpMethod,
    url: Option<&str>,
    headers: &Headers,
    params: Option<&Params>,
    mode: ParamMode,
) -> Result<HttpRequest, NetworkError> {
    let url = url.ok_or(NetworkError::InvalidUrl)?;
    let mut url = Url::parse(url).map_err(|_| NetworkError::InvalidUrl)?;
    if url.cannot_be_a_base() {
        return Err(NetworkError::InvalidUrl);
    }

    let mut headers = headers.clone();
    let mut body = Vec::new();

    match (mode, params.filter(|p| !p.is_empty())) {
        (_, None) => {}
        (ParamMode::Query, Some(params)) => {
            url = append_query(url, params)?;
        }
        (ParamMode::Body, Some(params)) => {
            body = params.encode().into_bytes();
            let has_content_type = headers
                .iter()
                .any(|(k, _)| k.eq_ignore_ascii_case("content-type"));
            if !has_content_type {
                headers.push(("content-type".to_string(), FORM_CONTENT_TYPE.to_string()));
            }
        }
    }

    Ok(HttpRequest {
        method,
        url,
        headers,
        body,
    })
}

fn append_query(mut url: Url, params: &Params) -> Result<Url, NetworkError> {
    let encoded = params.encode();
    let query = match url.query() {
        Some(existing) if !existing.is_empty() => format!("{existing}&{encoded}"),
        _ => encoded,
    };
    url.set_query(Some(&query));
    // Re-parse so a query that breaks the URL surfaces as InvalidUrl.
    Url::parse(url.as_str()).map_err(|_| NetworkError::InvalidUrl)
}
