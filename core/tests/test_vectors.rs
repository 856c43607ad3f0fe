//! Verify build/parse against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs and the expected outcome. Comparing
//! parsed JSON (not raw strings) avoids false negatives from field-ordering
//! differences.

use jsonapi_client::http::{JSON_API_MEDIA_TYPE, JSON_MEDIA_TYPE};
use jsonapi_client::{ApiError, Client, ClientOptions, HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
use serde_json::Value;

/// Vectors never reach the network.
struct Unreachable;

#[async_trait::async_trait]
impl Transport for Unreachable {
    async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
        Err("test vectors do not send".into())
    }
}

fn client(base_url: &str) -> Client {
    Client::new(ClientOptions::builder(base_url).build().unwrap(), Unreachable)
}

fn load(raw: &str) -> Vec<Value> {
    let vectors: Value = serde_json::from_str(raw).unwrap();
    vectors["cases"].as_array().unwrap().clone()
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "HEAD" => HttpMethod::Head,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "PATCH" => HttpMethod::Patch,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn strings(value: &Value) -> Vec<&str> {
    value.as_array().unwrap().iter().map(|v| v.as_str().unwrap()).collect()
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[test]
fn request_test_vectors() {
    for case in load(include_str!("../../test-vectors/requests.json")) {
        let name = case["name"].as_str().unwrap();
        let expected = &case["expected"];

        let mut request = client(case["base_url"].as_str().unwrap())
            .request(parse_method(case["method"].as_str().unwrap()), case["path"].as_str().unwrap())
            .json_api(case["json_api"].as_bool().unwrap());
        for path in strings(&case["includes"]) {
            request = request.include(path);
        }
        for pair in case["parameters"].as_array().unwrap() {
            request = request.parameter(pair[0].as_str().unwrap(), pair[1].as_str().unwrap());
        }
        if !case["body"].is_null() {
            request = request.json(&case["body"]);
        }

        let built = request.build().unwrap();
        assert_eq!(built.url, expected["url"].as_str().unwrap(), "{name}: url");
        assert_eq!(built.header("accept"), expected["accept"].as_str(), "{name}: accept");

        let body: Value = match built.body.as_deref() {
            Some(raw) => serde_json::from_str(raw).unwrap(),
            None => Value::Null,
        };
        assert_eq!(body, expected["body"], "{name}: body");
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

#[test]
fn normalize_test_vectors() {
    for case in load(include_str!("../../test-vectors/normalize.json")) {
        let name = case["name"].as_str().unwrap();

        let mut request = client("http://localhost:3000").get("/").json_api(true).flatten(true);
        for path in strings(&case["includes"]) {
            request = request.include(path);
        }

        let response =
            HttpResponse::new(200, case["document"].to_string()).with_header("content-type", JSON_API_MEDIA_TYPE);
        let data = request.parse(response).unwrap().into_data();
        assert_eq!(data, case["expected"], "{name}");
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn error_test_vectors() {
    for case in load(include_str!("../../test-vectors/errors.json")) {
        let name = case["name"].as_str().unwrap();
        let expected = &case["expected"];

        let body = match &case["body"] {
            Value::Null => String::new(),
            Value::String(raw) => raw.clone(),
            other => other.to_string(),
        };
        let mut response = HttpResponse::new(case["status"].as_u64().unwrap() as u16, body)
            .with_status_text(case["status_text"].as_str().unwrap());
        if let Some(content_type) = case["content_type"].as_str() {
            response = response.with_header("content-type", content_type);
        }

        let error = ApiError::new(response);
        assert_eq!(error.title(), expected["title"].as_str().unwrap(), "{name}: title");
        assert_eq!(error.to_string(), error.title(), "{name}: display");
        assert_eq!(serde_json::to_value(error.fields()).unwrap(), expected["fields"], "{name}: fields");
        assert_eq!(error.errors(), strings(&expected["errors"]), "{name}: errors");
    }
}

#[test]
fn parse_rejects_with_the_classified_error() {
    let response = HttpResponse::new(409, r#"{"errors":{"slug":["is taken"]}}"#)
        .with_status_text("Conflict")
        .with_header("content-type", JSON_MEDIA_TYPE);
    let err = client("http://localhost:3000").post("/posts").parse(response).unwrap_err();
    let api = err.as_api().expect("api error");
    assert_eq!(api.status(), 409);
    assert_eq!(api.title(), "slug is taken");
}
