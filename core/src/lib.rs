//! Fluent HTTP request builder with JSON:API response normalization.
//!
//! # Overview
//! A `Client` starts `Request`s; each request is configured through chained
//! setters (path, headers, token, query parameters, include paths, body) and
//! then sent. Successful responses come back with camel-cased keys, JSON:API
//! relationship graphs flattened according to the requested include paths,
//! and pagination read from response headers. Failed responses become an
//! `ApiError` carrying field-level validation errors and a short title.
//!
//! # Design
//! - Requests and responses are plain data (`HttpRequest`, `HttpResponse`);
//!   `Request::build` and `Request::parse` are pure, `Request::send` joins
//!   them through a pluggable `Transport`.
//! - `Request` owns its configuration; setters consume and return it.
//! - JSON:API documents are parsed into typed resources before normalization;
//!   error bodies are classified into an `ErrorBody` once, up front.

pub mod case;
pub mod client;
pub mod config;
pub mod error;
pub mod fields;
pub mod http;
pub mod include;
pub mod keys;
pub mod normalize;
pub mod resource;
pub mod transport;

pub use client::{Client, Output, Pagination, Request, Response};
pub use config::{ClientOptions, Token};
pub use error::{ApiError, Error, TransportError};
pub use fields::{ErrorBody, FieldErrors};
pub use http::{CacheMode, Flavor, HttpMethod, HttpRequest, HttpResponse, RedirectPolicy};
pub use include::{IncludePathSet, IncludeQuery, IncludeTree};
pub use normalize::normalize;
pub use resource::{Document, Linkage, PrimaryData, Relationship, Resource, ResourceIdentifier};
pub use transport::Transport;

#[cfg(feature = "reqwest")]
pub use transport::ReqwestTransport;
