#![allow(dead_code)]

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use folio_client::FolioClient;
use folio_client::adapters::http::ReqwestTransport;
use folio_client::storage::{MemorySessionStore, SessionStore};
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

static INIT: Once = Once::new();

pub fn setup_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn".into())
            .add_directive("folio_client=debug".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap());

        tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().init();
    });
}

pub const PASSWORD: &str = "password123";

/// Server-side view of the stand-in API, shared with the test body.
#[derive(Debug, Default)]
pub struct ApiState {
    valid_tokens: Mutex<HashSet<String>>,
    /// refresh token -> still usable
    refresh_tokens: Mutex<HashSet<String>>,
    issued: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    refresh_delay_ms: AtomicU64,
    /// (path, x-request-id, bearer) of every request, in arrival order.
    log: Mutex<Vec<(String, Option<String>, Option<String>)>>,
    projects: Mutex<HashMap<String, Value>>,
}

impl ApiState {
    /// Invalidates every access token issued so far, as if they all expired.
    pub fn expire_access_tokens(&self) {
        self.valid_tokens.lock().unwrap().clear();
    }

    pub fn revoke_refresh_tokens(&self) {
        self.refresh_tokens.lock().unwrap().clear();
    }

    pub fn delay_refresh(&self, delay: Duration) {
        self.refresh_delay_ms.store(u64::try_from(delay.as_millis()).unwrap(), Ordering::SeqCst);
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn requests_to(&self, path: &str) -> Vec<(Option<String>, Option<String>)> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _, _)| p == path)
            .map(|(_, id, bearer)| (id.clone(), bearer.clone()))
            .collect()
    }

    fn issue_access_token(&self) -> String {
        let token = format!("A{}", self.issued.fetch_add(1, Ordering::SeqCst) + 1);
        self.valid_tokens.lock().unwrap().insert(token.clone());
        token
    }

    fn record(&self, path: &str, headers: &HeaderMap) {
        let id = headers.get("x-request-id").and_then(|v| v.to_str().ok()).map(str::to_string);
        self.log.lock().unwrap().push((path.to_string(), id, bearer(headers)));
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        bearer(headers).is_some_and(|t| self.valid_tokens.lock().unwrap().contains(&t))
    }
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"success": false, "message": "Invalid or expired token. Please log in again."})),
    )
        .into_response()
}

fn user() -> Value {
    json!({"_id": "u1", "name": "Ada", "email": "ada@example.com", "role": "creator"})
}

type Shared = State<Arc<ApiState>>;

async fn login(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.record("/api/users/login", &headers);
    if body["password"] != PASSWORD {
        return (StatusCode::UNAUTHORIZED, Json(json!({"success": false, "message": "Invalid credentials"})))
            .into_response();
    }
    let token = state.issue_access_token();
    state.refresh_tokens.lock().unwrap().insert("R1".into());
    Json(json!({"success": true, "token": token, "refreshToken": "R1", "user": user()})).into_response()
}

async fn refresh(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.record("/api/users/refresh-token", &headers);
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let delay = state.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let presented = body["refreshToken"].as_str().unwrap_or_default();
    if !state.refresh_tokens.lock().unwrap().contains(presented) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"success": false, "message": "Invalid refresh token"})))
            .into_response();
    }
    Json(json!({"success": true, "token": state.issue_access_token()})).into_response()
}

async fn me(State(state): Shared, headers: HeaderMap) -> Response {
    state.record("/api/users/me", &headers);
    if !state.authorized(&headers) {
        return unauthorized();
    }
    Json(user()).into_response()
}

async fn list_projects(State(state): Shared, headers: HeaderMap) -> Response {
    state.record("/api/projects", &headers);
    if !state.authorized(&headers) {
        return unauthorized();
    }
    let projects: Vec<Value> = state.projects.lock().unwrap().values().cloned().collect();
    Json(json!({"success": true, "count": projects.len(), "data": projects})).into_response()
}

async fn get_project(State(state): Shared, headers: HeaderMap, Path(id): Path<String>) -> Response {
    state.record(&format!("/api/projects/{id}"), &headers);
    match state.projects.lock().unwrap().get(&id) {
        Some(project) => Json(json!({"success": true, "data": project})).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"success": false, "message": format!("Project not found with id of {id}")})),
        )
            .into_response(),
    }
}

async fn delete_project(State(state): Shared, headers: HeaderMap, Path(id): Path<String>) -> Response {
    state.record(&format!("/api/projects/{id}"), &headers);
    if !state.authorized(&headers) {
        return unauthorized();
    }
    if state.projects.lock().unwrap().remove(&id).is_none() {
        return (StatusCode::NOT_FOUND, Json(json!({"success": false, "message": "Project not found"}))).into_response();
    }
    Json(json!({"success": true, "data": {}})).into_response()
}

async fn toggle_publish(State(state): Shared, headers: HeaderMap, Path(id): Path<String>) -> Response {
    state.record(&format!("/api/projects/{id}/publish"), &headers);
    if !state.authorized(&headers) {
        return unauthorized();
    }
    let mut projects = state.projects.lock().unwrap();
    let Some(project) = projects.get_mut(&id) else {
        return (StatusCode::NOT_FOUND, Json(json!({"success": false, "message": "Project not found"}))).into_response();
    };
    let published = project["published"].as_bool().unwrap_or(false);
    project["published"] = Value::Bool(!published);
    Json(json!({"success": true, "data": project.clone()})).into_response()
}

async fn list_notifications(State(state): Shared, headers: HeaderMap) -> Response {
    state.record("/api/notifications", &headers);
    if !state.authorized(&headers) {
        return unauthorized();
    }
    let data = json!([
        {"_id": "n1", "type": "comment", "message": "New comment on Folio", "read": false},
        {"_id": "n2", "type": "publish", "message": "Folio was published", "read": true}
    ]);
    Json(json!({"success": true, "count": 2, "data": data})).into_response()
}

async fn record_view(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.record("/api/analytics/view", &headers);
    if body["refId"].as_str().is_none_or(str::is_empty) {
        return (StatusCode::BAD_REQUEST, Json(json!({"success": false, "message": "refId is required"})))
            .into_response();
    }
    (StatusCode::CREATED, Json(json!({"success": true}))).into_response()
}

async fn list_case_studies(
    State(state): Shared,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.record("/api/case-studies", &headers);
    let page: u32 = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let limit: u32 = query.get("limit").and_then(|l| l.parse().ok()).unwrap_or(10);
    let total = 25;
    let start = (page - 1) * limit;
    let end = (start + limit).min(total);

    let data: Vec<Value> = (start..end)
        .map(|i| json!({"_id": format!("c{i}"), "title": format!("Study {i}"), "projectOverview": "o", "project": "p1"}))
        .collect();
    let mut pagination = serde_json::Map::new();
    if end < total {
        pagination.insert("next".into(), json!({"page": page + 1, "limit": limit}));
    }
    if start > 0 {
        pagination.insert("prev".into(), json!({"page": page - 1, "limit": limit}));
    }
    Json(json!({"success": true, "count": data.len(), "pagination": pagination, "data": data})).into_response()
}

pub struct TestApp {
    pub base_url: String,
    pub state: Arc<ApiState>,
    pub store: Arc<MemorySessionStore>,
    pub client: FolioClient,
}

impl TestApp {
    pub async fn spawn() -> Self {
        setup_tracing();
        let state = Arc::new(ApiState::default());
        state.projects.lock().unwrap().insert(
            "p1".into(),
            json!({"_id": "p1", "title": "Folio", "description": "Portfolio site", "published": false, "user": "u1"}),
        );

        let router = Router::new()
            .route("/api/users/login", post(login))
            .route("/api/users/refresh-token", post(refresh))
            .route("/api/users/me", get(me))
            .route("/api/projects", get(list_projects))
            .route("/api/projects/{id}", get(get_project).delete(delete_project))
            .route("/api/projects/{id}/publish", put(toggle_publish))
            .route("/api/case-studies", get(list_case_studies))
            .route("/api/notifications", get(list_notifications))
            .route("/api/analytics/view", post(record_view))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let store = Arc::new(MemorySessionStore::new());
        let client = Self::client_for(&base_url, store.clone());
        Self { base_url, state, store, client }
    }

    /// Another client against the same server, with its own store.
    pub fn client_for(base_url: &str, store: Arc<dyn SessionStore>) -> FolioClient {
        let transport = ReqwestTransport::with_client(reqwest::Client::new(), base_url).unwrap();
        FolioClient::builder().with_transport(Arc::new(transport)).with_store(store).build().unwrap()
    }

    pub async fn login(&self) {
        let credentials = folio_client::domain::user::Credentials::new("ada@example.com", PASSWORD);
        self.client.identity.login(&credentials).await.unwrap();
    }
}
