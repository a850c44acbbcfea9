pub mod analytics_service;
pub mod case_study_service;
pub mod gateway;
pub mod identity_service;
pub mod notification_service;
pub mod project_service;

use crate::domain::portfolio::{Envelope, Page};
use crate::domain::request::ApiResponse;
use crate::error::{GatewayError, Result};
use serde::de::DeserializeOwned;

/// Unwraps `{ success, data }` after mapping non-2xx statuses to `GatewayError::Api`.
pub(crate) fn decode_data<T: DeserializeOwned>(response: ApiResponse) -> Result<T> {
    let envelope: Envelope<T> = response.error_for_status()?.json()?;
    Ok(envelope.data)
}

pub(crate) fn decode_page<T: DeserializeOwned>(response: ApiResponse) -> Result<Page<T>> {
    let envelope: Envelope<Vec<T>> = response.error_for_status()?.json()?;
    let count = envelope.count.unwrap_or(envelope.data.len() as u64);
    Ok(Page { items: envelope.data, count, pagination: envelope.pagination })
}

/// Joins `base` and a document id, rejecting ids that would escape the segment.
pub(crate) fn resource_path(base: &str, id: &str) -> Result<String> {
    if id.is_empty() || id.contains(['/', '?', '#']) || id.chars().any(char::is_whitespace) {
        return Err(GatewayError::InvalidRequest(format!("invalid id {id:?}")));
    }
    Ok(format!("{base}/{id}"))
}
