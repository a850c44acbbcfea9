use crate::domain::engagement::{ContentEvent, EngagementEvent, RefType};
use crate::domain::request::ApiRequest;
use crate::error::Result;
use crate::services::gateway::AuthGateway;
use crate::services::{decode_data, resource_path};
use serde::Serialize;
use serde_json::Value;

const ANALYTICS: &str = "/api/analytics";

/// Records visitor events and reads back the aggregated reports.
///
/// Recording is anonymous and goes out without credentials. Reports need a
/// session; their shape is owned by the server and is returned as raw JSON.
#[derive(Clone, Debug)]
pub struct AnalyticsService {
    gateway: AuthGateway,
}

impl AnalyticsService {
    #[must_use]
    pub const fn new(gateway: AuthGateway) -> Self {
        Self { gateway }
    }

    /// # Errors
    /// Returns `GatewayError::Api` when the event is refused.
    #[tracing::instrument(skip(self), fields(ref.id = %event.ref_id), err(level = "debug"))]
    pub async fn record_view(&self, event: &ContentEvent) -> Result<()> {
        self.record("view", event).await
    }

    /// # Errors
    /// Returns `GatewayError::Api` when the event is refused.
    #[tracing::instrument(skip(self), fields(ref.id = %event.ref_id), err(level = "debug"))]
    pub async fn record_click(&self, event: &ContentEvent) -> Result<()> {
        self.record("click", event).await
    }

    /// # Errors
    /// Returns `GatewayError::Api` when the event is refused.
    #[tracing::instrument(skip(self), fields(ref.id = %event.ref_id), err(level = "debug"))]
    pub async fn record_engagement(&self, event: &EngagementEvent) -> Result<()> {
        self.record("engagement", event).await
    }

    async fn record<T: Serialize + Sync>(&self, kind: &str, event: &T) -> Result<()> {
        let request = ApiRequest::post(format!("{ANALYTICS}/{kind}")).json(event)?;
        self.gateway.send_public(&request).await?.error_for_status()?;
        Ok(())
    }

    /// Totals across everything the current user owns.
    ///
    /// # Errors
    /// Returns `GatewayError::SessionExpired` if no usable session exists.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn dashboard(&self) -> Result<Value> {
        decode_data(self.gateway.send(&ApiRequest::get(format!("{ANALYTICS}/dashboard"))).await?)
    }

    /// # Errors
    /// Returns `GatewayError::SessionExpired` if no usable session exists.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn user(&self) -> Result<Value> {
        decode_data(self.gateway.send(&ApiRequest::get(format!("{ANALYTICS}/user"))).await?)
    }

    /// Report for one project, case study or profile.
    ///
    /// # Errors
    /// - `GatewayError::InvalidRequest` when `ref_id` is not a single path segment.
    /// - `GatewayError::Api` with 404 when the document does not exist.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn content(&self, ref_type: RefType, ref_id: &str) -> Result<Value> {
        let path = resource_path(&format!("{ANALYTICS}/{ref_type}"), ref_id)?;
        decode_data(self.gateway.send(&ApiRequest::get(path)).await?)
    }
}
