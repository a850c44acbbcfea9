use crate::adapters::http::{REQUEST_ID_HEADER, Transport};
use crate::config::ApiConfig;
use crate::domain::request::{ApiRequest, ApiResponse};
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use reqwest::Url;
use reqwest::header::HeaderValue;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Builds a transport rooted at `config.base_url`.
    ///
    /// # Errors
    /// Returns `GatewayError::InvalidRequest` if the base URL does not parse, or
    /// `GatewayError::Network` if the HTTP client cannot be constructed.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::with_client(client, &config.base_url)
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    ///
    /// # Errors
    /// Returns `GatewayError::InvalidRequest` if `base_url` does not parse.
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self> {
        Url::parse(base_url).map_err(|e| GatewayError::InvalidRequest(format!("base url {base_url:?}: {e}")))?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string() })
    }

    fn url_for(&self, request: &ApiRequest) -> Result<Url> {
        let path = request.path();
        let raw = if path.starts_with('/') { format!("{}{path}", self.base_url) } else { format!("{}/{path}", self.base_url) };
        let mut url = Url::parse(&raw).map_err(|e| GatewayError::InvalidRequest(format!("url {raw:?}: {e}")))?;
        if !request.query_pairs().is_empty() {
            url.query_pairs_mut().extend_pairs(request.query_pairs());
        }
        Ok(url)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[tracing::instrument(
        skip(self, request),
        fields(
            http.method = %request.method(),
            http.path = %request.path(),
            request.id = %request.request_id(),
            http.status = tracing::field::Empty
        ),
        err(level = "debug")
    )]
    async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = self.url_for(request)?;
        let mut headers = request.headers().clone();
        if let Ok(id) = HeaderValue::from_str(&request.request_id().to_string()) {
            headers.insert(REQUEST_ID_HEADER, id);
        }

        let mut builder = self.client.request(request.method().clone(), url).headers(headers);
        if let Some(body) = request.body() {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status();
        tracing::Span::current().record("http.status", status.as_u16());

        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(ApiResponse::new(status, headers, body))
    }
}
