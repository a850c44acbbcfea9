use crate::domain::portfolio::{CaseStudy, CaseStudyQuery, CaseStudyUpdate, NewCaseStudy, Page};
use crate::domain::request::ApiRequest;
use crate::error::{GatewayError, Result};
use crate::services::gateway::AuthGateway;
use crate::services::{decode_data, decode_page, resource_path};

const CASE_STUDIES: &str = "/api/case-studies";

/// Case studies. Listing and reading are public; writes need a session and
/// the creator role.
#[derive(Clone, Debug)]
pub struct CaseStudyService {
    gateway: AuthGateway,
}

impl CaseStudyService {
    #[must_use]
    pub const fn new(gateway: AuthGateway) -> Self {
        Self { gateway }
    }

    /// # Errors
    /// Returns `GatewayError::Network` when the API is unreachable.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn list(&self, query: &CaseStudyQuery) -> Result<Page<CaseStudy>> {
        let request = query.pairs().into_iter().fold(ApiRequest::get(CASE_STUDIES), |r, (k, v)| r.query(k, v));
        let page: Page<CaseStudy> = decode_page(self.gateway.send(&request).await?)?;
        tracing::debug!(count = page.count, has_next = page.has_next(), "Case studies listed");
        Ok(page)
    }

    /// # Errors
    /// Returns `GatewayError::Api` with 404 when the case study does not exist.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn get(&self, id: &str) -> Result<CaseStudy> {
        decode_data(self.gateway.send(&ApiRequest::get(resource_path(CASE_STUDIES, id)?)).await?)
    }

    /// # Errors
    /// - `GatewayError::InvalidRequest` when a required field is blank; nothing is sent.
    /// - `GatewayError::Api` when the server refuses, e.g. 403 for someone else's project.
    #[tracing::instrument(skip(self, study), fields(project.id = %study.project), err(level = "debug"))]
    pub async fn create(&self, study: &NewCaseStudy) -> Result<CaseStudy> {
        let missing = study.missing_fields();
        if !missing.is_empty() {
            return Err(GatewayError::InvalidRequest(format!("Missing required fields: {}", missing.join(", "))));
        }
        let request = ApiRequest::post(CASE_STUDIES).json(study)?;
        let created: CaseStudy = decode_data(self.gateway.send(&request).await?)?;
        tracing::info!(case_study.id = %created.id, "Case study created");
        Ok(created)
    }

    /// # Errors
    /// Returns `GatewayError::Api` with 404 when the case study does not exist.
    #[tracing::instrument(skip(self, update), err(level = "debug"))]
    pub async fn update(&self, id: &str, update: &CaseStudyUpdate) -> Result<CaseStudy> {
        let request = ApiRequest::put(resource_path(CASE_STUDIES, id)?).json(update)?;
        decode_data(self.gateway.send(&request).await?)
    }

    /// Deletes a case study after confirming the session is still usable.
    ///
    /// # Errors
    /// - `GatewayError::SessionExpired` if the session could not be confirmed.
    /// - `GatewayError::Api` with 404 when the case study does not exist.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn delete(&self, id: &str) -> Result<()> {
        let path = resource_path(CASE_STUDIES, id)?;
        if !self.gateway.check_auth_status().await? {
            return Err(GatewayError::SessionExpired);
        }
        let _: serde_json::Value = decode_data(self.gateway.send(&ApiRequest::delete(path)).await?)?;
        tracing::info!(case_study.id = %id, "Case study deleted");
        Ok(())
    }
}
