//! Error types for the request builder.
//!
//! # Design
//! A non-2xx response is an `ApiError`: it keeps the raw `HttpResponse`, the
//! decoded body, and the field/general errors extracted from it, and displays
//! as a short title fit for showing to a user. Transport failures are not
//! wrapped in any extra context; the transport's own error is carried as-is.

use serde_json::Value;
use thiserror::Error;

use crate::fields::{ErrorBody, FieldErrors};
use crate::http::{decode_body_lossy, Flavor, HttpResponse};

/// The error a `Transport` reports when it could not complete a round-trip.
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by `Request::build`, `Request::parse`, and `Request::send`.
#[derive(Debug, Error)]
pub enum Error {
    /// The transport failed before a response arrived.
    #[error(transparent)]
    Transport(TransportError),

    /// The server answered with a non-2xx status.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The base URL or assembled request URL is invalid.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// Required configuration is missing.
    #[error("configuration error: {0}")]
    Config(String),

    /// The request body could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be decoded.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

impl Error {
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(api) => Some(api),
            _ => None,
        }
    }
}

/// A non-success HTTP response.
#[derive(Debug, Clone, Error)]
#[error("{title}")]
pub struct ApiError {
    response: HttpResponse,
    body: Option<Value>,
    shape: ErrorBody,
    title: String,
}

impl ApiError {
    /// Decode and classify `response`. Its own content type decides between
    /// the plain and JSON:API error shapes.
    pub fn new(response: HttpResponse) -> Self {
        let body = decode_body_lossy(&response);
        let flavor = if response.is_json_api() { Flavor::JsonApi } else { Flavor::Plain };
        let shape = ErrorBody::parse(body.as_ref(), flavor);
        let title = shape.title(response.status, &response.status_text);
        Self {
            response,
            body,
            shape,
            title,
        }
    }

    pub fn status(&self) -> u16 {
        self.response.status
    }

    pub fn status_code(&self) -> u16 {
        self.status()
    }

    pub fn status_text(&self) -> &str {
        &self.response.status_text
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn message(&self) -> &str {
        self.title()
    }

    pub fn fields(&self) -> FieldErrors {
        self.shape.fields()
    }

    pub fn errors(&self) -> Vec<String> {
        self.shape.errors()
    }

    /// How the error body was classified.
    pub fn shape(&self) -> &ErrorBody {
        &self.shape
    }

    /// The decoded body, exactly as the server sent it (keys untouched).
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn response(&self) -> &HttpResponse {
        &self.response
    }

    pub fn is_json_api(&self) -> bool {
        self.response.is_json_api()
    }
}
