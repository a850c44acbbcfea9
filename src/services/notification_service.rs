use crate::domain::engagement::Notification;
use crate::domain::portfolio::Page;
use crate::domain::request::ApiRequest;
use crate::error::{GatewayError, Result};
use crate::services::gateway::AuthGateway;
use crate::services::{decode_data, decode_page, resource_path};

const NOTIFICATIONS: &str = "/api/notifications";

/// The current user's notifications. Every call requires a session.
#[derive(Clone, Debug)]
pub struct NotificationService {
    gateway: AuthGateway,
}

impl NotificationService {
    #[must_use]
    pub const fn new(gateway: AuthGateway) -> Self {
        Self { gateway }
    }

    /// # Errors
    /// Returns `GatewayError::SessionExpired` if no usable session exists.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn list(&self) -> Result<Page<Notification>> {
        decode_page(self.gateway.send(&ApiRequest::get(NOTIFICATIONS)).await?)
    }

    /// # Errors
    /// Returns `GatewayError::SessionExpired` if no usable session exists.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn recent(&self) -> Result<Vec<Notification>> {
        let path = format!("{NOTIFICATIONS}/recent");
        let page: Page<Notification> = decode_page(self.gateway.send(&ApiRequest::get(path)).await?)?;
        Ok(page.items)
    }

    /// Unread notifications among the first listed page.
    ///
    /// # Errors
    /// Returns `GatewayError::SessionExpired` if no usable session exists.
    pub async fn unread_count(&self) -> Result<usize> {
        Ok(self.list().await?.items.iter().filter(|n| !n.read).count())
    }

    /// # Errors
    /// Returns `GatewayError::Api` with 404 when the notification does not exist.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn mark_read(&self, id: &str) -> Result<Notification> {
        let path = format!("{}/read", resource_path(NOTIFICATIONS, id)?);
        decode_data(self.gateway.send(&ApiRequest::put(path)).await?)
    }

    /// # Errors
    /// Returns `GatewayError::SessionExpired` if no usable session exists.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn mark_all_read(&self) -> Result<()> {
        let path = format!("{NOTIFICATIONS}/read-all");
        let _: serde_json::Value = decode_data(self.gateway.send(&ApiRequest::put(path)).await?)?;
        tracing::info!("All notifications marked read");
        Ok(())
    }

    /// Deletes a notification after confirming the session is still usable.
    ///
    /// # Errors
    /// - `GatewayError::SessionExpired` if the session could not be confirmed.
    /// - `GatewayError::Api` with 404 when the notification does not exist.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn delete(&self, id: &str) -> Result<()> {
        let path = resource_path(NOTIFICATIONS, id)?;
        if !self.gateway.check_auth_status().await? {
            return Err(GatewayError::SessionExpired);
        }
        let _: serde_json::Value = decode_data(self.gateway.send(&ApiRequest::delete(path)).await?)?;
        tracing::info!(notification.id = %id, "Notification deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::storage::{MemorySessionStore, SessionStore};
    use crate::test_support::FakeServer;
    use reqwest::{Method, StatusCode};
    use serde_json::json;
    use std::sync::Arc;

    fn setup(store: MemorySessionStore) -> (Arc<FakeServer>, Arc<MemorySessionStore>, NotificationService) {
        let server = Arc::new(FakeServer::new());
        server.route(Method::GET, "/api/users/me", StatusCode::OK, json!({"_id": "u1"}), true);
        let store = Arc::new(store);
        let gateway = AuthGateway::new(server.clone(), store.clone(), GatewayConfig::default());
        (server, store, NotificationService::new(gateway))
    }

    fn notification(id: &str, read: bool) -> serde_json::Value {
        json!({"_id": id, "type": "comment", "message": "New comment", "read": read})
    }

    #[tokio::test]
    async fn test_list_and_unread_count() {
        let (server, _store, notifications) = setup(MemorySessionStore::with_tokens("A1", "R1"));
        server.accept_token("A1").route(
            Method::GET,
            NOTIFICATIONS,
            StatusCode::OK,
            json!({"success": true, "count": 3, "data": [notification("n1", false), notification("n2", true), notification("n3", false)]}),
            true,
        );

        let page = notifications.list().await.unwrap();

        assert_eq!(page.count, 3);
        assert_eq!(page.items[0].kind.as_deref(), Some("comment"));
        assert_eq!(notifications.unread_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_recent_recovers_expired_token() {
        let (server, store, notifications) = setup(MemorySessionStore::with_tokens("A1", "R1"));
        server.grant_refresh("R1", "A2").route(
            Method::GET,
            "/api/notifications/recent",
            StatusCode::OK,
            json!({"success": true, "data": [notification("n1", false)]}),
            true,
        );

        let recent = notifications.recent().await.unwrap();

        assert_eq!(recent.len(), 1);
        assert_eq!(server.refresh_calls(), 1);
        assert_eq!(store.access_token().await.unwrap().unwrap().as_str(), "A2");
    }

    #[tokio::test]
    async fn test_mark_read_and_read_all() {
        let (server, _store, notifications) = setup(MemorySessionStore::with_tokens("A1", "R1"));
        server
            .accept_token("A1")
            .route(
                Method::PUT,
                "/api/notifications/n1/read",
                StatusCode::OK,
                json!({"success": true, "data": notification("n1", true)}),
                true,
            )
            .route(Method::PUT, "/api/notifications/read-all", StatusCode::OK, json!({"success": true, "data": {}}), true);

        assert!(notifications.mark_read("n1").await.unwrap().read);
        notifications.mark_all_read().await.unwrap();

        assert!(notifications.mark_read("../read-all").await.is_err());
        assert_eq!(server.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_checks_session_first() {
        let (server, _store, notifications) = setup(MemorySessionStore::with_tokens("A1", "R1"));
        server.accept_token("A1").route(
            Method::DELETE,
            "/api/notifications/n1",
            StatusCode::OK,
            json!({"success": true, "data": {}}),
            true,
        );

        notifications.delete("n1").await.unwrap();

        let paths: Vec<_> = server.requests().iter().map(|r| r.path().to_string()).collect();
        assert_eq!(paths, vec!["/api/users/me", "/api/notifications/n1"]);
    }

    #[tokio::test]
    async fn test_without_session_is_expired() {
        let (server, _store, notifications) = setup(MemorySessionStore::new());
        server.route(Method::GET, NOTIFICATIONS, StatusCode::OK, json!({"data": []}), true);

        let err = notifications.list().await.unwrap_err();

        assert!(matches!(err, GatewayError::SessionExpired));
        assert!(server.requests_to(NOTIFICATIONS)[0].bearer().is_none());
    }
}
