use crate::adapters::http::Transport;
use crate::adapters::http::client::ReqwestTransport;
use crate::config::{Config, GatewayConfig};
use crate::error::{GatewayError, Result};
use crate::services::analytics_service::AnalyticsService;
use crate::services::case_study_service::CaseStudyService;
use crate::services::gateway::AuthGateway;
use crate::services::identity_service::IdentityService;
use crate::services::notification_service::NotificationService;
use crate::services::project_service::ProjectService;
use crate::storage::{FileSessionStore, MemorySessionStore, SessionStore};
use std::sync::Arc;

/// Every service of the API, sharing one gateway and therefore one session
/// and one refresh gate.
#[derive(Clone, Debug)]
pub struct FolioClient {
    pub gateway: AuthGateway,
    pub identity: IdentityService,
    pub projects: ProjectService,
    pub case_studies: CaseStudyService,
    pub notifications: NotificationService,
    pub analytics: AnalyticsService,
}

impl FolioClient {
    #[must_use]
    pub fn builder() -> FolioClientBuilder {
        FolioClientBuilder::default()
    }

    /// Wires the reqwest transport and the file-backed session store from `config`.
    ///
    /// # Errors
    /// Returns `GatewayError::InvalidRequest` if the base URL is unusable.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::builder()
            .with_transport(Arc::new(ReqwestTransport::new(&config.api)?))
            .with_store(Arc::new(FileSessionStore::new(config.session.session_file.clone())))
            .with_gateway_config(config.gateway.clone())
            .build()
    }
}

#[derive(Debug, Default)]
pub struct FolioClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    store: Option<Arc<dyn SessionStore>>,
    gateway_config: Option<GatewayConfig>,
}

impl FolioClientBuilder {
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_gateway_config(mut self, config: GatewayConfig) -> Self {
        self.gateway_config = Some(config);
        self
    }

    /// A transport is required; the store defaults to an in-memory one.
    ///
    /// # Errors
    /// Returns `GatewayError::InvalidRequest` if no transport was provided.
    pub fn build(self) -> Result<FolioClient> {
        let transport = self.transport.ok_or_else(|| GatewayError::InvalidRequest("transport is required".into()))?;
        let store = self.store.unwrap_or_else(|| Arc::new(MemorySessionStore::new()));
        let gateway = AuthGateway::new(transport, store, self.gateway_config.unwrap_or_default());

        Ok(FolioClient {
            identity: IdentityService::new(gateway.clone()),
            projects: ProjectService::new(gateway.clone()),
            case_studies: CaseStudyService::new(gateway.clone()),
            notifications: NotificationService::new(gateway.clone()),
            analytics: AnalyticsService::new(gateway.clone()),
            gateway,
        })
    }
}
