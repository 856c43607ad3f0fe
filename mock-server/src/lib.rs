use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, Query, RawQuery, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

pub const JSON_API: &str = "application/vnd.api+json";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub email: String,
    pub company_id: Option<String>,
    pub manager_id: Option<String>,
}

#[derive(Debug, Default)]
pub struct Store {
    pub companies: Vec<Company>,
    pub users: Vec<User>,
}

impl Store {
    /// Two users at one company; Grace reports to Ada.
    pub fn seeded() -> Self {
        Self {
            companies: vec![Company {
                id: "10".to_string(),
                name: "Analytical Engines".to_string(),
            }],
            users: vec![
                User {
                    id: "1".to_string(),
                    first_name: "Ada".to_string(),
                    email: "ada@example.com".to_string(),
                    company_id: Some("10".to_string()),
                    manager_id: None,
                },
                User {
                    id: "2".to_string(),
                    first_name: "Grace".to_string(),
                    email: "grace@example.com".to_string(),
                    company_id: Some("10".to_string()),
                    manager_id: Some("1".to_string()),
                },
            ],
        }
    }

    fn company(&self, id: &str) -> Option<&Company> {
        self.companies.iter().find(|c| c.id == id)
    }

    fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::seeded()));
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", get(get_user))
        .route("/plain/users", get(list_plain_users).post(create_plain_user))
        .route("/jobs", post(enqueue_job))
        .route("/failure", get(failure))
        .route("/whoami", get(whoami))
        .route("/echo", get(echo).post(echo).patch(echo).put(echo).delete(echo))
        .layer(TraceLayer::new_for_http())
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn json_api(status: StatusCode, body: Value) -> Response {
    (status, [(header::CONTENT_TYPE, JSON_API)], body.to_string()).into_response()
}

fn json_api_error(status: StatusCode, title: &str) -> Response {
    json_api(status, json!({ "errors": [{ "status": status.as_u16().to_string(), "title": title }] }))
}

fn user_resource(user: &User) -> Value {
    let company = user
        .company_id
        .as_ref()
        .map(|id| json!({ "id": id, "type": "companies" }));
    let manager = user
        .manager_id
        .as_ref()
        .map(|id| json!({ "id": id, "type": "users" }));
    json!({
        "id": user.id,
        "type": "users",
        "attributes": { "first-name": user.first_name, "email": user.email },
        "relationships": {
            "company": { "data": company },
            "manager": { "data": manager }
        }
    })
}

fn company_resource(company: &Company) -> Value {
    json!({ "id": company.id, "type": "companies", "attributes": { "name": company.name } })
}

/// Follow one dotted include path from `user`, pushing every resource on the
/// way into `included` once.
fn collect_included(store: &Store, user: &User, segments: &[&str], included: &mut Vec<Value>) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    let mut push = |resource: Value| {
        if !included
            .iter()
            .any(|r| r["id"] == resource["id"] && r["type"] == resource["type"])
        {
            included.push(resource);
        }
    };
    match *first {
        "company" => {
            if let Some(company) = user.company_id.as_deref().and_then(|id| store.company(id)) {
                push(company_resource(company));
            }
        }
        "manager" => {
            if let Some(manager) = user.manager_id.as_deref().and_then(|id| store.user(id)) {
                push(user_resource(manager));
                collect_included(store, manager, rest, included);
            }
        }
        _ => {}
    }
}

fn included_for<'a>(store: &Store, users: impl IntoIterator<Item = &'a User>, include: Option<&String>) -> Vec<Value> {
    let mut included = Vec::new();
    let paths: Vec<&str> = include
        .map(|raw| raw.split(',').filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();
    for user in users {
        for path in &paths {
            let segments: Vec<&str> = path.split('.').collect();
            collect_included(store, user, &segments, &mut included);
        }
    }
    included
}

/// Apply `page[number]`/`page[size]` and return the page plus the
/// pagination headers describing it.
fn paginate<T: Clone>(items: &[T], params: &HashMap<String, String>) -> (Vec<T>, [(&'static str, String); 4]) {
    let size = params
        .get("page[size]")
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|s| *s > 0)
        .unwrap_or(25);
    let number = params
        .get("page[number]")
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(1);
    let total = items.len();
    let total_pages = total.div_ceil(size).max(1);
    let page = items.iter().skip((number - 1) * size).take(size).cloned().collect();
    let headers = [
        ("page-number", number.to_string()),
        ("per-page", size.to_string()),
        ("total", total.to_string()),
        ("total-pages", total_pages.to_string()),
    ];
    (page, headers)
}

fn with_headers(mut response: Response, headers: [(&'static str, String); 4]) -> Response {
    for (name, value) in headers {
        if let Ok(value) = HeaderValue::from_str(&value) {
            response.headers_mut().insert(name, value);
        }
    }
    response
}

async fn list_users(State(db): State<Db>, Query(params): Query<HashMap<String, String>>) -> Response {
    let store = db.read().await;
    let (page, headers) = paginate(&store.users, &params);
    let included = included_for(&store, &page, params.get("include"));
    let data: Vec<Value> = page.iter().map(user_resource).collect();
    with_headers(
        json_api(StatusCode::OK, json!({ "data": data, "included": included })),
        headers,
    )
}

async fn get_user(
    State(db): State<Db>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let store = db.read().await;
    let Some(user) = store.user(&id) else {
        return json_api_error(StatusCode::NOT_FOUND, "Record not found");
    };
    let included = included_for(&store, [user], params.get("include"));
    json_api(
        StatusCode::OK,
        json!({ "data": user_resource(user), "included": included, "meta": { "request-id": Uuid::new_v4() } }),
    )
}

#[derive(Deserialize)]
struct NewUserDocument {
    data: NewUserResource,
}

#[derive(Deserialize)]
struct NewUserResource {
    #[serde(default)]
    attributes: NewUserAttributes,
}

#[derive(Deserialize, Default)]
struct NewUserAttributes {
    #[serde(rename = "first-name", default)]
    first_name: String,
    #[serde(default)]
    email: String,
}

fn validate(store: &Store, first_name: &str, email: &str) -> Vec<(&'static str, &'static str)> {
    let mut errors = Vec::new();
    if first_name.trim().is_empty() {
        errors.push(("first_name", "can't be blank"));
    }
    if store.users.iter().any(|u| u.email == email) {
        errors.push(("email", "has already been taken"));
    }
    errors
}

fn insert_user(store: &mut Store, first_name: String, email: String) -> User {
    let user = User {
        id: Uuid::new_v4().to_string(),
        first_name,
        email,
        company_id: None,
        manager_id: None,
    };
    store.users.push(user.clone());
    user
}

async fn create_user(State(db): State<Db>, body: Bytes) -> Response {
    let Ok(document) = serde_json::from_slice::<NewUserDocument>(&body) else {
        return json_api_error(StatusCode::BAD_REQUEST, "Malformed document");
    };
    let NewUserAttributes { first_name, email } = document.data.attributes;

    let mut store = db.write().await;
    let problems = validate(&store, &first_name, &email);
    if !problems.is_empty() {
        let errors: Vec<Value> = problems
            .iter()
            .map(|(field, title)| {
                json!({
                    "title": title,
                    "source": { "pointer": format!("/data/attributes/{}", field.replace('_', "-")) }
                })
            })
            .collect();
        return json_api(StatusCode::UNPROCESSABLE_ENTITY, json!({ "errors": errors }));
    }

    let user = insert_user(&mut store, first_name, email);
    json_api(StatusCode::CREATED, json!({ "data": user_resource(&user) }))
}

#[derive(Serialize)]
struct PlainUser {
    id: String,
    first_name: String,
    email: String,
    company_name: Option<String>,
}

#[derive(Deserialize)]
struct NewPlainUser {
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    email: String,
}

fn plain_user(store: &Store, user: &User) -> PlainUser {
    PlainUser {
        id: user.id.clone(),
        first_name: user.first_name.clone(),
        email: user.email.clone(),
        company_name: user
            .company_id
            .as_deref()
            .and_then(|id| store.company(id))
            .map(|c| c.name.clone()),
    }
}

async fn list_plain_users(State(db): State<Db>, Query(params): Query<HashMap<String, String>>) -> Response {
    let store = db.read().await;
    let (page, headers) = paginate(&store.users, &params);
    let users: Vec<PlainUser> = page.iter().map(|u| plain_user(&store, u)).collect();
    with_headers(Json(users).into_response(), headers)
}

async fn create_plain_user(State(db): State<Db>, body: Bytes) -> Response {
    let Ok(input) = serde_json::from_slice::<NewPlainUser>(&body) else {
        return (StatusCode::BAD_REQUEST, Json(json!({ "errors": { "base": ["malformed body"] } }))).into_response();
    };

    let mut store = db.write().await;
    let problems = validate(&store, &input.first_name, &input.email);
    if !problems.is_empty() {
        let mut errors: serde_json::Map<String, Value> = serde_json::Map::new();
        for (field, message) in problems {
            errors.insert(field.to_string(), json!([message]));
        }
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "errors": errors }))).into_response();
    }

    let user = insert_user(&mut store, input.first_name, input.email);
    (StatusCode::CREATED, Json(plain_user(&store, &user))).into_response()
}

async fn enqueue_job() -> StatusCode {
    StatusCode::ACCEPTED
}

async fn failure() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn whoami(headers: HeaderMap) -> Response {
    match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(token) => Json(json!({ "authorization": token })).into_response(),
        None => json_api(
            StatusCode::UNAUTHORIZED,
            json!({ "errors": { "detail": "Unauthorized" } }),
        ),
    }
}

/// Reflect the request back. Clients that accept JSON:API get the echo as a
/// single `echoes` resource.
async fn echo(method: Method, headers: HeaderMap, RawQuery(query): RawQuery, body: Bytes) -> Response {
    let header_value = |name: header::HeaderName| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()))
    };
    let accept = header_value(header::ACCEPT);
    let echoed = json!({
        "method": method.as_str(),
        "query": query,
        "accept": accept,
        "content_type": header_value(header::CONTENT_TYPE),
        "cache_control": header_value(header::CACHE_CONTROL),
        "body": body,
    });
    if accept.as_deref() == Some(JSON_API) {
        json_api(
            StatusCode::OK,
            json!({ "data": { "id": "echo", "type": "echoes", "attributes": echoed } }),
        )
    } else {
        Json(echoed).into_response()
    }
}
