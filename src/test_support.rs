//! In-process stand-in for the identity service and resource API.

use crate::adapters::http::Transport;
use crate::domain::request::{ApiRequest, ApiResponse};
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

pub(crate) const REFRESH_PATH: &str = "/api/users/refresh-token";

#[derive(Debug, Clone)]
struct Route {
    status: StatusCode,
    body: Value,
    protected: bool,
}

#[derive(Debug, Default)]
struct State {
    valid_tokens: HashSet<String>,
    /// refresh token -> access token it is exchanged for
    refresh_grants: HashMap<String, String>,
    routes: HashMap<(Method, String), Route>,
    log: Vec<ApiRequest>,
}

#[derive(Debug, Default)]
pub(crate) struct FakeServer {
    state: Mutex<State>,
    refresh_calls: AtomicUsize,
    refresh_delay: Mutex<Option<Duration>>,
    refresh_hangs: AtomicBool,
    offline: AtomicBool,
}

impl FakeServer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub(crate) fn accept_token(&self, token: &str) -> &Self {
        self.state().valid_tokens.insert(token.to_string());
        self
    }

    /// Refreshing with `refresh_token` yields `access_token`, which then becomes valid.
    pub(crate) fn grant_refresh(&self, refresh_token: &str, access_token: &str) -> &Self {
        self.state().refresh_grants.insert(refresh_token.to_string(), access_token.to_string());
        self
    }

    pub(crate) fn route(&self, method: Method, path: &str, status: StatusCode, body: Value, protected: bool) -> &Self {
        self.state().routes.insert((method, path.to_string()), Route { status, body, protected });
        self
    }

    pub(crate) fn delay_refresh(&self, delay: Duration) -> &Self {
        *self.refresh_delay.lock().unwrap() = Some(delay);
        self
    }

    pub(crate) fn hang_refresh(&self) -> &Self {
        self.refresh_hangs.store(true, Ordering::SeqCst);
        self
    }

    pub(crate) fn go_offline(&self) -> &Self {
        self.offline.store(true, Ordering::SeqCst);
        self
    }

    pub(crate) fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Every request received, refresh calls included.
    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.state().log.clone()
    }

    /// Requests to `path`, in arrival order.
    pub(crate) fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
        self.requests().into_iter().filter(|r| r.path() == path).collect()
    }

    async fn refresh(&self, request: &ApiRequest) -> ApiResponse {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.refresh_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.refresh_hangs.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        let presented = request
            .body()
            .and_then(|b| serde_json::from_slice::<Value>(b).ok())
            .and_then(|v| v.get("refreshToken").and_then(Value::as_str).map(str::to_string));

        let mut state = self.state();
        let granted = presented.and_then(|r| state.refresh_grants.get(&r).cloned());
        match granted {
            Some(access) => {
                state.valid_tokens.insert(access.clone());
                ApiResponse::from_json(StatusCode::OK, &json!({ "token": access }))
            }
            None => ApiResponse::from_json(
                StatusCode::UNAUTHORIZED,
                &json!({ "success": false, "message": "Invalid refresh token" }),
            ),
        }
    }
}

#[async_trait]
impl Transport for FakeServer {
    async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse> {
        tokio::task::yield_now().await;
        if self.offline.load(Ordering::SeqCst) {
            return Err(GatewayError::Network("connection refused".into()));
        }
        self.state().log.push(request.clone());

        if request.path() == REFRESH_PATH {
            return Ok(self.refresh(request).await);
        }

        let state = self.state();
        let Some(route) = state.routes.get(&(request.method().clone(), request.path().to_string())) else {
            return Ok(ApiResponse::from_json(
                StatusCode::NOT_FOUND,
                &json!({ "success": false, "message": "Route not found" }),
            ));
        };

        if route.protected && !request.bearer().is_some_and(|t| state.valid_tokens.contains(t)) {
            return Ok(ApiResponse::from_json(
                StatusCode::UNAUTHORIZED,
                &json!({ "success": false, "message": "Invalid or expired token. Please log in again." }),
            ));
        }

        Ok(ApiResponse::from_json(route.status, &route.body))
    }
}
