use crate::domain::request::{ApiRequest, ApiResponse};
use crate::error::Result;
use async_trait::async_trait;

pub mod client;

pub use client::ReqwestTransport;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Sends one request and returns whatever the server answered.
///
/// Only failures to obtain a response at all are errors; every HTTP status,
/// 401 included, comes back as `Ok`.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug + 'static {
    async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse>;
}
