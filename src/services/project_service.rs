use crate::domain::portfolio::{NewProject, Page, Project, ProjectUpdate};
use crate::domain::request::ApiRequest;
use crate::error::{GatewayError, Result};
use crate::services::gateway::AuthGateway;
use crate::services::{decode_data, decode_page, resource_path};

const PROJECTS: &str = "/api/projects";

/// The caller's own projects. Every call except `get` requires a session.
#[derive(Clone, Debug)]
pub struct ProjectService {
    gateway: AuthGateway,
}

impl ProjectService {
    #[must_use]
    pub const fn new(gateway: AuthGateway) -> Self {
        Self { gateway }
    }

    /// # Errors
    /// Returns `GatewayError::SessionExpired` if no usable session exists.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn list(&self) -> Result<Page<Project>> {
        decode_page(self.gateway.send(&ApiRequest::get(PROJECTS)).await?)
    }

    /// The caller's five most recently created projects.
    ///
    /// # Errors
    /// Returns `GatewayError::SessionExpired` if no usable session exists.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn recent(&self) -> Result<Vec<Project>> {
        let page: Page<Project> = decode_page(self.gateway.send(&ApiRequest::get("/api/projects/recent")).await?)?;
        Ok(page.items)
    }

    /// # Errors
    /// Returns `GatewayError::Api` with 404 when the project does not exist.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn get(&self, id: &str) -> Result<Project> {
        decode_data(self.gateway.send(&ApiRequest::get(resource_path(PROJECTS, id)?)).await?)
    }

    /// # Errors
    /// Returns `GatewayError::Api` when the server rejects the project.
    #[tracing::instrument(skip(self, project), fields(project.title = %project.title), err(level = "debug"))]
    pub async fn create(&self, project: &NewProject) -> Result<Project> {
        let missing: Vec<_> = [("title", &project.title), ("description", &project.description), ("content", &project.content)]
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect();
        if !missing.is_empty() {
            return Err(GatewayError::InvalidRequest(format!("Missing required fields: {}", missing.join(", "))));
        }
        let request = ApiRequest::post(PROJECTS).json(project)?;
        let created: Project = decode_data(self.gateway.send(&request).await?)?;
        tracing::info!(project.id = %created.id, "Project created");
        Ok(created)
    }

    /// # Errors
    /// Returns `GatewayError::Api` with 404 when the project does not exist.
    #[tracing::instrument(skip(self, update), err(level = "debug"))]
    pub async fn update(&self, id: &str, update: &ProjectUpdate) -> Result<Project> {
        let request = ApiRequest::put(resource_path(PROJECTS, id)?).json(update)?;
        decode_data(self.gateway.send(&request).await?)
    }

    /// Flips the project between draft and published.
    ///
    /// # Errors
    /// Returns `GatewayError::Api` with 404 when the project does not exist.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn toggle_publish(&self, id: &str) -> Result<Project> {
        let path = format!("{}/publish", resource_path(PROJECTS, id)?);
        let project: Project = decode_data(self.gateway.send(&ApiRequest::put(path)).await?)?;
        tracing::info!(project.id = %project.id, published = project.published, "Publish status toggled");
        Ok(project)
    }

    /// Deletes a project after confirming the session is still usable.
    ///
    /// # Errors
    /// - `GatewayError::SessionExpired` if the session could not be confirmed.
    /// - `GatewayError::Api` with 404 when the project does not exist.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn delete(&self, id: &str) -> Result<()> {
        let path = resource_path(PROJECTS, id)?;
        if !self.gateway.check_auth_status().await? {
            return Err(GatewayError::SessionExpired);
        }
        let _: serde_json::Value = decode_data(self.gateway.send(&ApiRequest::delete(path)).await?)?;
        tracing::info!(project.id = %id, "Project deleted");
        Ok(())
    }
}
