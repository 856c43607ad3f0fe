//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. `Request::build` produces an
//! `HttpRequest`, some `Transport` executes it, and `Request::parse` consumes
//! the resulting `HttpResponse`. Keeping the round-trip outside the builder
//! lets the whole request/response pipeline be tested without a network.
//!
//! Header lists are `Vec<(String, String)>` in send order; lookups are
//! case-insensitive.

use std::fmt;

use serde_json::Value;

use crate::error::Error;

pub const JSON_MEDIA_TYPE: &str = "application/json";
pub const JSON_API_MEDIA_TYPE: &str = "application/vnd.api+json";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// GET and HEAD never carry a body.
    pub fn allows_body(&self) -> bool {
        !matches!(self, HttpMethod::Get | HttpMethod::Head)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the transport may answer from its cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    #[default]
    Default,
    NoCache,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedirectPolicy {
    #[default]
    Follow,
}

/// Which conventions a request and its response follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flavor {
    /// Plain JSON: snake_case outbound keys, `include[]` query entries,
    /// `{"errors": {field: messages}}` error bodies.
    #[default]
    Plain,
    /// JSON:API: kebab-case outbound keys, a single `include` query value,
    /// resource documents and `{"errors": [..]}` error bodies.
    JsonApi,
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub cache: CacheMode,
    pub redirect: RedirectPolicy,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            status_text: String::new(),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_status_text(mut self, text: impl Into<String>) -> Self {
        self.status_text = text.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn is_json(&self) -> bool {
        self.content_type()
            .is_some_and(|ct| ct.contains(JSON_MEDIA_TYPE) || ct.contains(JSON_API_MEDIA_TYPE))
    }

    pub fn is_json_api(&self) -> bool {
        self.content_type().is_some_and(|ct| ct.contains(JSON_API_MEDIA_TYPE))
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Decode a response body by its content type: JSON for `application/json`
/// and `application/vnd.api+json`, text otherwise. An empty body is `None`.
pub fn decode_body(response: &HttpResponse) -> Result<Option<Value>, Error> {
    if response.body.trim().is_empty() {
        return Ok(None);
    }
    if response.is_json() {
        serde_json::from_str(&response.body)
            .map(Some)
            .map_err(|e| Error::Deserialization(e.to_string()))
    } else {
        Ok(Some(Value::String(response.body.clone())))
    }
}

/// Like `decode_body`, but a JSON body that fails to parse falls back to its
/// text. Used for error responses, which must never fail to decode.
pub fn decode_body_lossy(response: &HttpResponse) -> Option<Value> {
    decode_body(response).unwrap_or_else(|_| Some(Value::String(response.body.clone())))
}
