use crate::domain::request::ApiRequest;
use crate::domain::user::{AuthPayload, Credentials, ProfileUpdate, Registration, User};
use crate::error::Result;
use crate::services::gateway::AuthGateway;
use opentelemetry::{global, metrics::Counter};

#[derive(Clone, Debug)]
struct Metrics {
    login_total: Counter<u64>,
    logout_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("folio-client");
        Self {
            login_total: meter
                .u64_counter("identity_login_total")
                .with_description("Total number of successful logins and registrations")
                .build(),
            logout_total: meter
                .u64_counter("identity_logout_total")
                .with_description("Total number of local logouts")
                .build(),
        }
    }
}

/// Creates, inspects and discards the session held by the gateway's store.
#[derive(Clone, Debug)]
pub struct IdentityService {
    gateway: AuthGateway,
    metrics: Metrics,
}

impl IdentityService {
    #[must_use]
    pub fn new(gateway: AuthGateway) -> Self {
        Self { gateway, metrics: Metrics::new() }
    }

    /// # Errors
    /// Returns `GatewayError::Api` when the credentials are rejected.
    #[tracing::instrument(skip(self, credentials), fields(user.id = tracing::field::Empty), err(level = "warn"))]
    pub async fn login(&self, credentials: &Credentials) -> Result<User> {
        let request = ApiRequest::post("/api/users/login").json(credentials)?;
        self.establish(&request).await
    }

    /// # Errors
    /// Returns `GatewayError::Api` when the server refuses the registration.
    #[tracing::instrument(skip(self, registration), fields(user.id = tracing::field::Empty), err(level = "warn"))]
    pub async fn register(&self, registration: &Registration) -> Result<User> {
        let request = ApiRequest::post("/api/users/register").json(registration)?;
        self.establish(&request).await
    }

    async fn establish(&self, request: &ApiRequest) -> Result<User> {
        let payload: AuthPayload = self.gateway.send_public(request).await?.error_for_status()?.json()?;
        self.gateway.store().save(&payload.token, &payload.refresh_token).await?;

        tracing::Span::current().record("user.id", tracing::field::display(&payload.user.id));
        tracing::info!("Session established");
        self.metrics.login_total.add(1, &[]);
        Ok(payload.user)
    }

    /// Forgets both tokens. The server keeps no session state to revoke.
    ///
    /// # Errors
    /// Returns `GatewayError::Store` if the store cannot be cleared.
    #[tracing::instrument(skip(self), err)]
    pub async fn logout(&self) -> Result<()> {
        self.gateway.store().clear().await?;
        self.metrics.logout_total.add(1, &[]);
        tracing::info!("Logged out");
        Ok(())
    }

    /// # Errors
    /// Returns `GatewayError::SessionExpired` if no usable session exists.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn current_user(&self) -> Result<User> {
        self.gateway.send(&ApiRequest::get("/api/users/me")).await?.error_for_status()?.json()
    }

    /// # Errors
    /// Returns `GatewayError::Api` when the update is refused.
    #[tracing::instrument(skip(self, update), err(level = "debug"))]
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User> {
        let request = ApiRequest::put("/api/users/profile").json(update)?;
        self.gateway.send(&request).await?.error_for_status()?.json()
    }

    /// Whether an access token is stored. Says nothing about its validity;
    /// use [`AuthGateway::check_auth_status`] for that.
    ///
    /// # Errors
    /// Returns `GatewayError::Store` if the store cannot be read.
    pub async fn is_logged_in(&self) -> Result<bool> {
        Ok(self.gateway.store().access_token().await?.is_some())
    }
}
