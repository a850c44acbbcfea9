use crate::domain::session::AccessToken;
use crate::error::{GatewayError, Result};
use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Outbound request descriptor.
///
/// Requests are never mutated once handed to the gateway: attaching a bearer
/// token produces a new value, and retry bookkeeping lives outside the request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<Bytes>,
    request_id: Uuid,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            request_id: Uuid::now_v7(),
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Serializes `body` as the JSON payload.
    ///
    /// # Errors
    /// Returns `GatewayError::Decode` if the value cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(body)?;
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(Bytes::from(bytes));
        Ok(self)
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// # Errors
    /// Returns `GatewayError::InvalidRequest` for header names or values that are not valid HTTP.
    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| GatewayError::InvalidRequest(format!("header name {name:?}: {e}")))?;
        let value =
            HeaderValue::from_str(value).map_err(|e| GatewayError::InvalidRequest(format!("header {name}: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Copy of this request carrying `Authorization: Bearer <token>`, or no
    /// Authorization header at all when `token` is `None`.
    ///
    /// # Errors
    /// Returns `GatewayError::InvalidRequest` if the token contains bytes that cannot appear in a header.
    pub fn authorized(&self, token: Option<&AccessToken>) -> Result<Self> {
        let mut next = self.clone();
        match token {
            Some(token) => {
                let mut value = HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
                    .map_err(|_| GatewayError::InvalidRequest("access token is not a valid header value".into()))?;
                value.set_sensitive(true);
                next.headers.insert(AUTHORIZATION, value);
            }
            None => {
                next.headers.remove(AUTHORIZATION);
            }
        }
        Ok(next)
    }

    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub const fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    #[must_use]
    pub const fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// The bearer token currently attached, if any.
    #[must_use]
    pub fn bearer(&self) -> Option<&str> {
        self.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()).and_then(|v| v.strip_prefix("Bearer "))
    }
}

/// A fully received HTTP response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl ApiResponse {
    #[must_use]
    pub const fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self { status, headers, body }
    }

    /// Convenience constructor for a JSON response, mostly useful for transport doubles.
    #[must_use]
    pub fn from_json(status: StatusCode, body: &serde_json::Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self { status, headers, body: Bytes::from(body.to_string()) }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// # Errors
    /// Returns `GatewayError::Decode` if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(GatewayError::from)
    }

    /// Passes 2xx responses through and turns everything else into `GatewayError::Api`.
    ///
    /// # Errors
    /// Returns `GatewayError::Api` with the server's `message` when the status is not a success.
    pub fn error_for_status(self) -> Result<Self> {
        if self.status.is_success() {
            return Ok(self);
        }
        let message = serde_json::from_slice::<ErrorBody>(&self.body)
            .ok()
            .and_then(|b| b.message)
            .or_else(|| self.status.canonical_reason().map(str::to_string))
            .unwrap_or_default();
        Err(GatewayError::Api { status: self.status, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_authorized_does_not_touch_original() {
        let original = ApiRequest::get("/api/projects");
        let token = AccessToken::new("A1");
        let signed = original.authorized(Some(&token)).unwrap();

        assert_eq!(signed.bearer(), Some("A1"));
        assert!(original.bearer().is_none());
        assert_eq!(signed.request_id(), original.request_id());
    }

    #[test]
    fn test_authorized_none_strips_header() {
        let request = ApiRequest::get("/api/projects").header("Authorization", "Bearer stale").unwrap();
        let anonymous = request.authorized(None).unwrap();
        assert!(anonymous.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_json_sets_content_type() {
        let request = ApiRequest::post("/api/users/login").json(&json!({"email": "a@b.c"})).unwrap();
        assert_eq!(request.headers().get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(request.body().unwrap().as_ref(), br#"{"email":"a@b.c"}"#);
    }

    #[test]
    fn test_error_for_status_uses_server_message() {
        let response = ApiResponse::from_json(
            StatusCode::FORBIDDEN,
            &json!({"success": false, "message": "User role user is not authorized"}),
        );
        match response.error_for_status() {
            Err(GatewayError::Api { status, message }) => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert_eq!(message, "User role user is not authorized");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_error_for_status_falls_back_to_reason() {
        let response = ApiResponse::new(StatusCode::BAD_GATEWAY, HeaderMap::new(), Bytes::from_static(b"<html>"));
        let err = response.error_for_status().unwrap_err();
        assert_eq!(err.to_string(), "API error (502 Bad Gateway): Bad Gateway");
    }
}
