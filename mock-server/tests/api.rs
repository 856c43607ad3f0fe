use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, JSON_API};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

fn json_request(method: &str, uri: &str, content_type: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, content_type)
        .body(body.to_string())
        .unwrap()
}

fn header<'a>(response: &'a axum::response::Response, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

// --- JSON:API users ---

#[tokio::test]
async fn list_users_is_a_json_api_collection() {
    let resp = app().oneshot(get("/users")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header(&resp, "content-type"), Some(JSON_API));
    assert_eq!(header(&resp, "total"), Some("2"));
    let doc = body_json(resp).await;
    assert_eq!(doc["data"].as_array().unwrap().len(), 2);
    assert_eq!(doc["data"][0]["attributes"]["first-name"], "Ada");
    assert!(doc["included"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn list_users_pages_with_headers() {
    let resp = app()
        .oneshot(get("/users?page%5Bnumber%5D=2&page%5Bsize%5D=1"))
        .await
        .unwrap();

    assert_eq!(header(&resp, "page-number"), Some("2"));
    assert_eq!(header(&resp, "per-page"), Some("1"));
    assert_eq!(header(&resp, "total-pages"), Some("2"));
    let doc = body_json(resp).await;
    assert_eq!(doc["data"][0]["id"], "2");
}

#[tokio::test]
async fn get_user_side_loads_nested_includes() {
    let resp = app()
        .oneshot(get("/users/2?include=manager.company"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let doc = body_json(resp).await;
    let included = doc["included"].as_array().unwrap();
    let kinds: Vec<&str> = included.iter().map(|r| r["type"].as_str().unwrap()).collect();
    assert_eq!(kinds, ["users", "companies"]);
    assert_eq!(doc["data"]["relationships"]["manager"]["data"]["id"], "1");
}

#[tokio::test]
async fn get_user_not_found_is_a_json_api_error() {
    let resp = app().oneshot(get("/users/404")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let doc = body_json(resp).await;
    assert_eq!(doc["errors"][0]["title"], "Record not found");
}

#[tokio::test]
async fn create_user_returns_201() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/users",
            JSON_API,
            r#"{"data":{"type":"users","attributes":{"first-name":"Hedy","email":"hedy@example.com"}}}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let doc = body_json(resp).await;
    assert_eq!(doc["data"]["attributes"]["first-name"], "Hedy");
}

#[tokio::test]
async fn create_user_reports_pointer_errors() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/users",
            JSON_API,
            r#"{"data":{"type":"users","attributes":{"first-name":"","email":"ada@example.com"}}}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let doc = body_json(resp).await;
    assert_eq!(doc["errors"][0]["source"]["pointer"], "/data/attributes/first-name");
    assert_eq!(doc["errors"][1]["title"], "has already been taken");
}

// --- plain JSON users ---

#[tokio::test]
async fn plain_users_are_snake_case_json() {
    let resp = app().oneshot(get("/plain/users")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header(&resp, "content-type"), Some("application/json"));
    let users = body_json(resp).await;
    assert_eq!(users[1]["first_name"], "Grace");
    assert_eq!(users[1]["company_name"], "Analytical Engines");
}

#[tokio::test]
async fn create_plain_user_reports_field_map_errors() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/plain/users",
            "application/json",
            r#"{"first_name":"Ada","email":"ada@example.com"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(resp).await;
    assert_eq!(body["errors"]["email"][0], "has already been taken");
}

// --- misc ---

#[tokio::test]
async fn jobs_are_accepted_without_a_body() {
    let resp = app()
        .oneshot(json_request("POST", "/jobs", "application/json", "{}"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    assert!(body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn failure_is_a_bare_500() {
    let resp = app().oneshot(get("/failure")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn whoami_echoes_or_rejects() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/whoami")
                .header(http::header::AUTHORIZATION, "Token abc")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["authorization"], "Token abc");

    let resp = app().oneshot(get("/whoami")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["errors"]["detail"], "Unauthorized");
}

#[tokio::test]
async fn echo_reflects_query_and_body() {
    let resp = app()
        .oneshot(json_request("PATCH", "/echo?include=a.b", "application/json", r#"{"first_name":"Ada"}"#))
        .await
        .unwrap();

    let echoed = body_json(resp).await;
    assert_eq!(echoed["method"], "PATCH");
    assert_eq!(echoed["query"], "include=a.b");
    assert_eq!(echoed["body"]["first_name"], "Ada");
}

#[tokio::test]
async fn echo_wraps_json_api_requests_in_a_resource() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/echo?include=owner")
                .header(http::header::ACCEPT, JSON_API)
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(header(&resp, "content-type"), Some(JSON_API));
    let doc = body_json(resp).await;
    assert_eq!(doc["data"]["type"], "echoes");
    assert_eq!(doc["data"]["attributes"]["query"], "include=owner");
}
