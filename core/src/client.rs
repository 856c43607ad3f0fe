//! Fluent request builder and response parser.
//!
//! # Design
//! `Client` holds the options and transport shared by every request. Each
//! call to `get`/`post`/... starts a `Request`, a self-contained configuration
//! value whose setters consume and return it. Nothing is sent until `send`.
//!
//! The round-trip is split the same way as the transport types: `build`
//! produces an `HttpRequest`, `parse` consumes an `HttpResponse`, and `send`
//! runs one through the `Transport` and hands the result to the other. Both
//! halves are synchronous and deterministic, so tests can drive them without
//! a network.

use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::{debug, instrument, warn, Span};
use url::{form_urlencoded, Url};

use crate::case;
use crate::config::{ClientOptions, Token};
use crate::error::{ApiError, Error};
use crate::http::{
    decode_body, CacheMode, Flavor, HttpMethod, HttpRequest, HttpResponse, RedirectPolicy, JSON_API_MEDIA_TYPE,
    JSON_MEDIA_TYPE,
};
use crate::include::IncludePathSet;
use crate::keys::map_keys;
use crate::normalize::normalize;
use crate::resource::Document;
use crate::transport::Transport;

const PAGE_NUMBER_PARAMETER: &str = "page[number]";
const PAGE_SIZE_PARAMETER: &str = "page[size]";

/// Entry point: shared options plus a transport.
#[derive(Clone)]
pub struct Client {
    options: Arc<ClientOptions>,
    transport: Arc<dyn Transport>,
}

impl Client {
    pub fn new<T>(options: ClientOptions, transport: T) -> Self
    where
        T: Transport + 'static,
    {
        Self::with_transport(options, Arc::new(transport))
    }

    pub fn with_transport(options: ClientOptions, transport: Arc<dyn Transport>) -> Self {
        Self {
            options: Arc::new(options),
            transport,
        }
    }

    /// A client that sends requests with `reqwest`.
    #[cfg(feature = "reqwest")]
    pub fn with_reqwest(options: ClientOptions) -> Self {
        Self::new(options, crate::transport::ReqwestTransport::new())
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn request(&self, method: HttpMethod, path: &str) -> Request {
        Request::new(Arc::clone(&self.options), Arc::clone(&self.transport)).method(method, path)
    }

    pub fn get(&self, path: &str) -> Request {
        self.request(HttpMethod::Get, path)
    }

    pub fn head(&self, path: &str) -> Request {
        self.request(HttpMethod::Head, path)
    }

    pub fn post(&self, path: &str) -> Request {
        self.request(HttpMethod::Post, path)
    }

    pub fn put(&self, path: &str) -> Request {
        self.request(HttpMethod::Put, path)
    }

    pub fn patch(&self, path: &str) -> Request {
        self.request(HttpMethod::Patch, path)
    }

    pub fn delete(&self, path: &str) -> Request {
        self.request(HttpMethod::Delete, path)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum RequestBody {
    Raw(String),
    Json(Value),
}

/// One request's configuration.
#[derive(Clone)]
pub struct Request {
    options: Arc<ClientOptions>,
    transport: Arc<dyn Transport>,
    method: HttpMethod,
    path: String,
    headers: Vec<(String, String)>,
    token: Option<Token>,
    parameters: Vec<(String, String)>,
    includes: IncludePathSet,
    cache: bool,
    flavor: Flavor,
    body: Option<RequestBody>,
    body_error: Option<String>,
    flatten: bool,
}

impl Request {
    fn new(options: Arc<ClientOptions>, transport: Arc<dyn Transport>) -> Self {
        let headers = vec![
            ("Accept".to_string(), JSON_MEDIA_TYPE.to_string()),
            ("Content-Type".to_string(), JSON_MEDIA_TYPE.to_string()),
            ("User-Agent".to_string(), options.user_agent.clone()),
        ];
        let token = options.token.clone();
        Self {
            options,
            transport,
            method: HttpMethod::Get,
            path: "/".to_string(),
            headers,
            token,
            parameters: Vec::new(),
            includes: IncludePathSet::new(),
            cache: true,
            flavor: Flavor::Plain,
            body: None,
            body_error: None,
            flatten: false,
        }
    }

    pub fn method(mut self, method: HttpMethod, path: &str) -> Self {
        self.method = method;
        self.path = path.to_string();
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        set_header(&mut self.headers, name, value.into());
        self
    }

    pub fn unset_header(mut self, name: &str) -> Self {
        self.headers.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        self
    }

    /// Replace the client's token for this request. The value is sent as the
    /// `authorization` header exactly as given; no scheme is prepended.
    pub fn token(mut self, token: impl Into<Token>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Send no `authorization` header, even when the client has a token.
    pub fn without_token(mut self) -> Self {
        self.token = None;
        self
    }

    pub fn parameter(mut self, key: &str, value: impl ToString) -> Self {
        set_pair(&mut self.parameters, key, value.to_string());
        self
    }

    /// Send `key` with an empty value.
    pub fn blank_parameter(self, key: &str) -> Self {
        self.parameter(key, "")
    }

    pub fn unset_parameter(mut self, key: &str) -> Self {
        self.parameters.retain(|(existing, _)| existing != key);
        self
    }

    pub fn page(self, number: u64) -> Self {
        self.parameter(PAGE_NUMBER_PARAMETER, number)
    }

    pub fn size(self, size: u64) -> Self {
        self.parameter(PAGE_SIZE_PARAMETER, size)
    }

    pub fn include(mut self, path: &str) -> Self {
        self.includes.add(path);
        self
    }

    pub fn includes(&self) -> &IncludePathSet {
        &self.includes
    }

    /// `false` asks the transport to bypass its cache.
    pub fn cache(mut self, enabled: bool) -> Self {
        self.cache = enabled;
        self
    }

    pub fn json_api(mut self, enabled: bool) -> Self {
        self.flavor = if enabled { Flavor::JsonApi } else { Flavor::Plain };
        self
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    /// Resolve to the response's `data` alone instead of the full envelope.
    pub fn flatten(mut self, enabled: bool) -> Self {
        self.flatten = enabled;
        self
    }

    /// A body sent exactly as given.
    pub fn body(mut self, raw: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Raw(raw.into()));
        self.body_error = None;
        self
    }

    /// A structured body. Its keys are kebab-cased for JSON:API and
    /// snake_cased otherwise when the request is built.
    pub fn json<T>(mut self, value: &T) -> Self
    where
        T: Serialize + ?Sized,
    {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.body = Some(RequestBody::Json(value));
                self.body_error = None;
            }
            Err(e) => {
                self.body = None;
                self.body_error = Some(e.to_string());
            }
        }
        self
    }

    /// The full request URL: base path and request path joined, then the
    /// include paths, then any query written inline in the path, then
    /// explicit parameters (which win on collisions).
    pub fn url(&self) -> Result<Url, Error> {
        let (path, inline_query) = match self.path.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (self.path.as_str(), None),
        };

        let mut url = self.options.base_url.clone();
        let path = combine_paths(&[url.path(), path]);
        url.set_path(&path);
        url.set_query(None);
        url.set_fragment(None);

        let pairs = self.query_pairs(inline_query);
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        Ok(url)
    }

    fn query_pairs(&self, inline_query: Option<&str>) -> Vec<(String, String)> {
        let mut pairs = if self.includes.is_empty() {
            Vec::new()
        } else {
            self.includes.to_query_value(self.flavor).into_pairs()
        };
        if let Some(query) = inline_query {
            pairs.extend(
                form_urlencoded::parse(query.as_bytes()).map(|(key, value)| (key.into_owned(), value.into_owned())),
            );
        }
        for (key, value) in &self.parameters {
            set_pair(&mut pairs, key, value.clone());
        }
        pairs
    }

    fn assembled_headers(&self) -> Vec<(String, String)> {
        let mut headers = self.headers.clone();
        if let Some(token) = self.token.as_ref().and_then(Token::resolve) {
            set_header(&mut headers, "authorization", token);
        }
        if self.flavor == Flavor::JsonApi {
            set_header(&mut headers, "accept", JSON_API_MEDIA_TYPE.to_string());
            set_header(&mut headers, "content-type", JSON_API_MEDIA_TYPE.to_string());
        }
        headers
    }

    fn encoded_body(&self) -> Result<Option<String>, Error> {
        if let Some(message) = &self.body_error {
            return Err(Error::Serialization(message.clone()));
        }
        match &self.body {
            None => Ok(None),
            Some(RequestBody::Raw(raw)) => Ok(Some(raw.clone())),
            Some(RequestBody::Json(value)) => {
                let mapped = match self.flavor {
                    Flavor::JsonApi => map_keys(value, case::kebab),
                    Flavor::Plain => map_keys(value, case::snake),
                };
                serde_json::to_string(&mapped)
                    .map(Some)
                    .map_err(|e| Error::Serialization(e.to_string()))
            }
        }
    }

    /// Assemble the plain-data request. A token resolver runs on every call.
    pub fn build(&self) -> Result<HttpRequest, Error> {
        let body = if self.method.allows_body() {
            self.encoded_body()?
        } else {
            None
        };
        Ok(HttpRequest {
            method: self.method,
            url: self.url()?.to_string(),
            headers: self.assembled_headers(),
            cache: if self.cache { CacheMode::Default } else { CacheMode::NoCache },
            redirect: RedirectPolicy::Follow,
            body,
        })
    }

    /// Turn a response into the envelope (or just its data when flattened).
    /// Non-2xx statuses become `Error::Api`.
    pub fn parse(&self, response: HttpResponse) -> Result<Output, Error> {
        if !response.is_success() {
            let error = ApiError::new(response);
            warn!(status = error.status(), title = error.title(), "request failed");
            return Err(error.into());
        }

        let pagination = Pagination::from_response(&response);
        let body = decode_body(&response)?.map(|body| map_keys(&body, case::camel));
        let envelope = match self.flavor {
            Flavor::Plain => Response {
                data: body.unwrap_or(Value::Null),
                pagination,
                raw: None,
                meta: None,
                links: None,
            },
            Flavor::JsonApi => self.normalize_document(body, pagination)?,
        };

        Ok(if self.flatten {
            Output::Data(envelope.data)
        } else {
            Output::Envelope(envelope)
        })
    }

    fn normalize_document(&self, body: Option<Value>, pagination: Pagination) -> Result<Response, Error> {
        let Some(body) = body else {
            return Ok(Response {
                data: Value::Null,
                pagination,
                raw: Some(Value::Null),
                meta: None,
                links: None,
            });
        };

        let raw = body.get("data").cloned().unwrap_or(Value::Null);
        let document: Document = serde_json::from_value(body).map_err(|e| Error::Deserialization(e.to_string()))?;
        let tree = self.includes.to_tree().map_names(case::camel);
        debug!(
            included = document.included.len(),
            includes = ?self.includes.paths(),
            "normalizing document"
        );

        Ok(Response {
            data: normalize(document.data.as_ref(), &document.included, &tree),
            pagination,
            raw: Some(raw),
            meta: document.meta,
            links: document.links,
        })
    }

    /// Build, send through the client's transport, and parse.
    #[instrument(
        name = "api_request",
        skip(self),
        fields(
            http.method = %self.method,
            http.url = tracing::field::Empty,
            http.status_code = tracing::field::Empty,
        )
    )]
    pub async fn send(&self) -> Result<Output, Error> {
        let request = self.build()?;
        Span::current().record("http.url", request.url.as_str());
        debug!("dispatching request");

        let response = self.transport.send(request).await.map_err(|e| {
            warn!(error = %e, "transport failed");
            Error::Transport(e)
        })?;
        Span::current().record("http.status_code", response.status);

        self.parse(response)
    }
}

/// Join path pieces, collapsing slashes where they meet.
pub fn combine_paths(paths: &[&str]) -> String {
    let last = paths.len().saturating_sub(1);
    paths
        .iter()
        .map(|path| path.trim())
        .enumerate()
        .map(|(i, path)| {
            let path = if i != 0 { path.trim_start_matches('/') } else { path };
            if i != last {
                path.trim_end_matches('/')
            } else {
                path
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: String) {
    match headers.iter().position(|(key, _)| key.eq_ignore_ascii_case(name)) {
        Some(index) => {
            headers[index].1 = value;
            let mut i = index + 1;
            while i < headers.len() {
                if headers[i].0.eq_ignore_ascii_case(name) {
                    headers.remove(i);
                } else {
                    i += 1;
                }
            }
        }
        None => headers.push((name.to_string(), value)),
    }
}

/// Set `key` in place at its first occurrence, dropping any later
/// duplicates; append it if absent.
fn set_pair(pairs: &mut Vec<(String, String)>, key: &str, value: String) {
    match pairs.iter().position(|(existing, _)| existing == key) {
        Some(index) => {
            pairs[index].1 = value;
            let mut i = index + 1;
            while i < pairs.len() {
                if pairs[i].0 == key {
                    pairs.remove(i);
                } else {
                    i += 1;
                }
            }
        }
        None => pairs.push((key.to_string(), value)),
    }
}

/// Pagination read from the `page-number`, `per-page`, `total`, and
/// `total-pages` response headers. Each defaults to 1 when absent or not a
/// number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn from_response(response: &HttpResponse) -> Self {
        let number = |name: &str| {
            response
                .header(name)
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or(1)
        };
        Self {
            page: number("page-number"),
            per_page: number("per-page"),
            total: number("total"),
            total_pages: number("total-pages"),
        }
    }
}

/// A successful response with camel-cased keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub data: Value,
    pub pagination: Pagination,
    /// The primary data before normalization. JSON:API only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Value>,
}

/// What `send` and `parse` resolve to.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Envelope(Response),
    /// The envelope's `data`, when the request was flattened.
    Data(Value),
}

impl Output {
    pub fn data(&self) -> &Value {
        match self {
            Output::Envelope(response) => &response.data,
            Output::Data(data) => data,
        }
    }

    pub fn into_data(self) -> Value {
        match self {
            Output::Envelope(response) => response.data,
            Output::Data(data) => data,
        }
    }

    pub fn envelope(&self) -> Option<&Response> {
        match self {
            Output::Envelope(response) => Some(response),
            Output::Data(_) => None,
        }
    }

    pub fn into_envelope(self) -> Option<Response> {
        match self {
            Output::Envelope(response) => Some(response),
            Output::Data(_) => None,
        }
    }
}

impl Serialize for Output {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Output::Envelope(response) => response.serialize(serializer),
            Output::Data(data) => data.serialize(serializer),
        }
    }
}
