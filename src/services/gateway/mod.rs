pub mod coordinator;

use crate::adapters::http::Transport;
use crate::config::GatewayConfig;
use crate::domain::request::{ApiRequest, ApiResponse};
use crate::domain::session::{AccessToken, SessionKey};
use crate::domain::user::{RefreshPayload, RefreshRequest};
use crate::error::{GatewayError, Result};
use crate::services::gateway::coordinator::{Entry, RefreshCoordinator, RefreshOutcome};
use crate::storage::SessionStore;
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use reqwest::StatusCode;
use std::sync::Arc;
use tracing::Instrument;

pub use coordinator::RefreshFailure;

#[derive(Clone)]
pub(crate) struct Metrics {
    pub(crate) refresh_total: Counter<u64>,
    pub(crate) refresh_waiters: Histogram<u64>,
    pub(crate) session_expired_total: Counter<u64>,
}

impl Metrics {
    #[must_use]
    pub(crate) fn new() -> Self {
        let meter = global::meter("folio-client");
        Self {
            refresh_total: meter
                .u64_counter("gateway_refresh_total")
                .with_description("Token refresh calls by outcome")
                .build(),
            refresh_waiters: meter
                .u64_histogram("gateway_refresh_waiters")
                .with_description("Requests resumed by a single refresh")
                .build(),
            session_expired_total: meter
                .u64_counter("gateway_session_expired_total")
                .with_description("Requests failed because the session could not be recovered")
                .build(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Retry bookkeeping for one logical request. The request itself is never
/// mutated; `send` carries this counter alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Attempt {
    retries: u8,
}

impl Attempt {
    const MAX_RETRIES: u8 = 1;

    const fn first() -> Self {
        Self { retries: 0 }
    }

    const fn next(self) -> Self {
        Self { retries: self.retries + 1 }
    }

    const fn exhausted(self) -> bool {
        self.retries >= Self::MAX_RETRIES
    }
}

struct GatewayInner {
    transport: Arc<dyn Transport>,
    store: Arc<dyn SessionStore>,
    coordinator: RefreshCoordinator,
    config: GatewayConfig,
    metrics: Metrics,
}

/// Sends requests with the current bearer token and recovers from expired
/// access tokens with at most one refresh in flight.
///
/// Cloning is cheap; clones share the session store and the refresh gate.
#[derive(Clone)]
pub struct AuthGateway {
    inner: Arc<GatewayInner>,
}

impl std::fmt::Debug for AuthGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGateway")
            .field("transport", &self.inner.transport)
            .field("store", &self.inner.store)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl AuthGateway {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn SessionStore>, config: GatewayConfig) -> Self {
        Self {
            inner: Arc::new(GatewayInner {
                transport,
                store,
                coordinator: RefreshCoordinator::new(),
                config,
                metrics: Metrics::new(),
            }),
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.inner.store
    }

    /// Sends `request` with the stored access token.
    ///
    /// Any status other than 401 is returned untouched. A 401 joins the
    /// refresh gate and, once a new token is available, the request is sent
    /// exactly once more.
    ///
    /// # Errors
    /// - `GatewayError::Network` when no response was received.
    /// - `GatewayError::SessionExpired` when the 401 could not be resolved by one refresh.
    /// - `GatewayError::RefreshTimeout` when the refresh it waited on timed out.
    #[tracing::instrument(
        skip(self, request),
        fields(http.method = %request.method(), http.path = %request.path(), request.id = %request.request_id()),
        err(level = "debug")
    )]
    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let mut attempt = Attempt::first();
        // Read the generation before the token so a refresh that lands in
        // between is recognised as newer than this dispatch.
        let mut generation = self.inner.coordinator.generation().await;
        let mut token = self.inner.store.access_token().await?;

        loop {
            let response = self.inner.transport.dispatch(&request.authorized(token.as_ref())?).await?;
            if response.status() != StatusCode::UNAUTHORIZED {
                return Ok(response);
            }

            if attempt.exhausted() {
                tracing::warn!(retries = attempt.retries, "Request rejected again after refresh");
                self.inner.metrics.session_expired_total.add(1, &[]);
                return Err(GatewayError::SessionExpired);
            }

            // The session may have moved on while this request was in flight,
            // through a refresh or a new login. Retry with what is stored now.
            let current = self.inner.store.access_token().await?;
            if current.is_some() && current != token {
                tracing::debug!("Access token rejected but session has changed, retrying with stored token");
                generation = self.inner.coordinator.generation().await;
                token = current;
                attempt = attempt.next();
                continue;
            }

            tracing::debug!("Access token rejected, joining refresh");
            let refreshed = self.await_refresh(Some(generation)).await.map_err(|f| self.recovery_error(f))?;
            generation = self.inner.coordinator.generation().await;
            token = Some(refreshed);
            attempt = attempt.next();
        }
    }

    /// Sends `request` without credentials and without 401 recovery. Used for
    /// endpoints where 401 means "bad credentials" rather than "expired session".
    ///
    /// # Errors
    /// Returns `GatewayError::Network` when no response was received.
    #[tracing::instrument(
        skip(self, request),
        fields(http.method = %request.method(), http.path = %request.path(), request.id = %request.request_id()),
        err(level = "debug")
    )]
    pub async fn send_public(&self, request: &ApiRequest) -> Result<ApiResponse> {
        self.inner.transport.dispatch(&request.authorized(None)?).await
    }

    /// Exchanges the stored refresh token for a new access token, or joins a
    /// refresh that is already in flight.
    ///
    /// # Errors
    /// - `GatewayError::NoRefreshToken` when there is no refresh token to exchange.
    /// - `GatewayError::RefreshTimeout` when the identity service did not answer in time.
    /// - `GatewayError::SessionExpired` for every other failure.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn refresh(&self) -> Result<AccessToken> {
        self.await_refresh(None).await.map_err(|failure| match failure {
            RefreshFailure::NoRefreshToken => GatewayError::NoRefreshToken,
            RefreshFailure::Timeout => GatewayError::RefreshTimeout,
            _ => GatewayError::SessionExpired,
        })
    }

    /// Checks the session with a lightweight authenticated call, refreshing
    /// once through the shared gate if that call is rejected.
    ///
    /// # Errors
    /// Returns `GatewayError::Network` when the check received no response.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn check_auth_status(&self) -> Result<bool> {
        let generation = self.inner.coordinator.generation().await;
        let token = self.inner.store.access_token().await?;
        let check = ApiRequest::get(self.inner.config.status_path.as_str()).authorized(token.as_ref())?;

        let response = self.inner.transport.dispatch(&check).await?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::UNAUTHORIZED => {
                let valid = self.await_refresh(Some(generation)).await.is_ok();
                tracing::debug!(valid, "Session check needed a refresh");
                Ok(valid)
            }
            status => {
                tracing::debug!(status = %status, "Session check failed");
                Ok(false)
            }
        }
    }

    /// Whether a refresh is currently in flight.
    pub async fn is_refreshing(&self) -> bool {
        self.inner.coordinator.is_refreshing().await
    }

    async fn await_refresh(&self, observed: Option<u64>) -> RefreshOutcome {
        let mut observed = observed;
        let rx = loop {
            match self.inner.coordinator.enter(observed).await {
                Entry::Settled(token) => {
                    let stored = self.inner.store.access_token().await.ok().flatten();
                    if stored.as_ref() == Some(&token) {
                        tracing::debug!("Reusing refresh that settled after dispatch");
                        return Ok(token);
                    }
                    // Session was cleared or replaced since that refresh.
                    observed = None;
                }
                Entry::Wait(rx) => break rx,
                Entry::Lead(rx) => {
                    self.spawn_refresh();
                    break rx;
                }
            }
        };
        rx.await.unwrap_or(Err(RefreshFailure::Abandoned))
    }

    /// Runs the refresh on its own task so that dropping the request that
    /// started it cannot strand the queued waiters. A second task owns the
    /// settle, so the gate returns to idle even if the refresh panics.
    fn spawn_refresh(&self) {
        let worker = {
            let gateway = self.clone();
            tokio::spawn(
                async move { gateway.perform_refresh().await }.instrument(tracing::info_span!("token_refresh")),
            )
        };

        let gateway = self.clone();
        tokio::spawn(async move {
            let outcome = worker.await.unwrap_or_else(|e| {
                tracing::error!(error = %e, "Refresh task ended without an outcome");
                gateway.inner.metrics.refresh_total.add(1, &[KeyValue::new("outcome", RefreshFailure::Abandoned.label())]);
                Err(RefreshFailure::Abandoned)
            });
            let flushed = gateway.inner.coordinator.settle(outcome).await;
            gateway.inner.metrics.refresh_waiters.record(flushed as u64, &[]);
            tracing::debug!(flushed, "Refresh settled");
        });
    }

    async fn perform_refresh(&self) -> RefreshOutcome {
        let timeout = self.inner.config.refresh_timeout();
        let outcome = tokio::time::timeout(timeout, self.exchange_refresh_token())
            .await
            .unwrap_or(Err(RefreshFailure::Timeout));

        match &outcome {
            Ok(token) => {
                if let Err(e) = self.inner.store.set(SessionKey::AccessToken, token.as_str()).await {
                    tracing::error!(error = %e, "Failed to persist refreshed access token");
                }
                tracing::info!("Access token refreshed");
                self.inner.metrics.refresh_total.add(1, &[KeyValue::new("outcome", "success")]);
            }
            Err(failure) => {
                if failure.clears_session() {
                    tracing::warn!(reason = %failure, "Token refresh failed, clearing session");
                    if let Err(e) = self.inner.store.clear().await {
                        tracing::error!(error = %e, "Failed to clear session");
                    }
                } else {
                    tracing::warn!(reason = %failure, timeout_secs = timeout.as_secs(), "Token refresh did not complete");
                }
                self.inner.metrics.refresh_total.add(1, &[KeyValue::new("outcome", failure.label())]);
            }
        }
        outcome
    }

    async fn exchange_refresh_token(&self) -> RefreshOutcome {
        let refresh_token = match self.inner.store.refresh_token().await {
            Ok(Some(token)) => token,
            Ok(None) => return Err(RefreshFailure::NoRefreshToken),
            Err(e) => {
                tracing::error!(error = %e, "Failed to read refresh token");
                return Err(RefreshFailure::Store);
            }
        };

        let request = ApiRequest::post(self.inner.config.refresh_path.as_str())
            .json(&RefreshRequest { refresh_token: refresh_token.as_str() })
            .map_err(|_| RefreshFailure::Malformed)?;

        let response = self.inner.transport.dispatch(&request).await.map_err(|e| {
            tracing::warn!(error = %e, "Identity service unreachable");
            RefreshFailure::Network
        })?;

        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), "Refresh token rejected");
            return Err(RefreshFailure::Rejected);
        }

        let payload: RefreshPayload = response.json().map_err(|_| RefreshFailure::Malformed)?;
        payload.token.filter(|t| !t.as_str().is_empty()).ok_or(RefreshFailure::Malformed)
    }

    fn recovery_error(&self, failure: RefreshFailure) -> GatewayError {
        if failure == RefreshFailure::Timeout {
            return GatewayError::RefreshTimeout;
        }
        self.inner.metrics.session_expired_total.add(1, &[]);
        GatewayError::SessionExpired
    }
}
