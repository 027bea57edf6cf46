//! HTTP client for the backend API.
//!
//! Every shop event the admin learns about (install, shop update, product
//! sync, uninstall) is forwarded here. Calls never return `Err`: transport
//! failures and non-2xx responses come back as an [`ApiResponse`] whose
//! `status_code` is the backend's own `code`, else the HTTP status, else 500.
//!
//! # Authentication
//!
//! Shop-scoped calls carry `X-Shopify-Hmac-Sha256`: the base64 HMAC-SHA256 of
//! the shop domain keyed with the app secret. It is attached per request via
//! [`BackendClient::with_hmac`], never set as a shared default.

mod types;

pub use types::{ApiResponse, ResponseCode};

use std::sync::Arc;

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::multipart::Form;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use types::ErrorBody;

/// Header carrying the shop HMAC on outbound calls.
pub const HMAC_HEADER: &str = "X-Shopify-Hmac-Sha256";

/// Errors building the client or a request URL.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP client failed to build.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Path could not be joined onto the base URL.
    #[error("Invalid backend path {path}: {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: url::ParseError,
    },

    /// Header value contains characters HTTP does not allow.
    #[error("Invalid header value: {0}")]
    InvalidHeader(String),
}

/// Backend API client.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
    hmac: Option<HeaderValue>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: String,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.inner.base_url)
            .field("hmac", &self.hmac.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(base_url: &Url) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url: base_url.as_str().trim_end_matches('/').to_string(),
            }),
            hmac: None,
        })
    }

    /// A handle that signs every request with `hmac`.
    ///
    /// # Errors
    ///
    /// Returns error if `hmac` is not a valid header value.
    pub fn with_hmac(&self, hmac: &str) -> Result<Self, BackendError> {
        let mut value = HeaderValue::from_str(hmac)
            .map_err(|e| BackendError::InvalidHeader(e.to_string()))?;
        value.set_sensitive(true);

        Ok(Self {
            inner: Arc::clone(&self.inner),
            hmac: Some(value),
        })
    }

    /// Base URL every path is appended to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Build the absolute URL for `path` (`/shop` → `{base}/shop`).
    ///
    /// # Errors
    ///
    /// Returns error if the result is not a valid URL.
    pub fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        let path = path.trim();
        let joined = if path.starts_with('/') {
            format!("{}{path}", self.inner.base_url)
        } else {
            format!("{}/{path}", self.inner.base_url)
        };
        Url::parse(&joined).map_err(|source| BackendError::InvalidPath {
            path: path.to_string(),
            source,
        })
    }

    /// GET with query parameters.
    #[instrument(skip(self, params))]
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> ApiResponse<T> {
        let mut url = match self.endpoint(path) {
            Ok(url) => url,
            Err(e) => return invalid_request(&e),
        };
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        self.send(self.inner.client.get(url)).await
    }

    /// POST a JSON body.
    #[instrument(skip(self, body))]
    pub async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResponse<T> {
        match self.endpoint(path) {
            Ok(url) => self.send(self.inner.client.post(url).json(body)).await,
            Err(e) => invalid_request(&e),
        }
    }

    /// PUT a JSON body.
    #[instrument(skip(self, body))]
    pub async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResponse<T> {
        match self.endpoint(path) {
            Ok(url) => self.send(self.inner.client.put(url).json(body)).await,
            Err(e) => invalid_request(&e),
        }
    }

    /// PATCH a JSON body.
    #[instrument(skip(self, body))]
    pub async fn patch<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResponse<T> {
        match self.endpoint(path) {
            Ok(url) => self.send(self.inner.client.patch(url).json(body)).await,
            Err(e) => invalid_request(&e),
        }
    }

    /// DELETE, optionally with a JSON body.
    #[instrument(skip(self, body))]
    pub async fn delete<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> ApiResponse<T> {
        let url = match self.endpoint(path) {
            Ok(url) => url,
            Err(e) => return invalid_request(&e),
        };
        let mut request = self.inner.client.delete(url);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.send(request).await
    }

    /// POST a multipart form.
    #[instrument(skip(self, form))]
    pub async fn post_multipart<T: DeserializeOwned>(&self, path: &str, form: Form) -> ApiResponse<T> {
        match self.endpoint(path) {
            Ok(url) => self.send(self.inner.client.post(url).multipart(form)).await,
            Err(e) => invalid_request(&e),
        }
    }

    /// PUT a multipart form.
    #[instrument(skip(self, form))]
    pub async fn put_multipart<T: DeserializeOwned>(&self, path: &str, form: Form) -> ApiResponse<T> {
        match self.endpoint(path) {
            Ok(url) => self.send(self.inner.client.put(url).multipart(form)).await,
            Err(e) => invalid_request(&e),
        }
    }

    /// Attach the per-request headers, send, and fold the outcome.
    async fn send<T: DeserializeOwned>(&self, mut request: reqwest::RequestBuilder) -> ApiResponse<T> {
        if let Some(hmac) = &self.hmac {
            request = request.header(HMAC_HEADER, hmac.clone());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "backend request failed");
                return ApiResponse::failure(
                    e.status().map_or(ResponseCode::INTERNAL_SERVER_ERROR, ResponseCode::from),
                    e.to_string(),
                );
            }
        };

        let status = response.status();
        if status.is_success() {
            return self.handle_response(response).await;
        }

        self.parse_error(response).await
    }

    /// Parse a 2xx body. The backend answers with the envelope itself.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> ApiResponse<T> {
        let status = ResponseCode::from(response.status());
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return ApiResponse::failure(ResponseCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return ApiResponse::empty(status);
        }

        match serde_json::from_slice::<ApiResponse<T>>(&bytes) {
            Ok(envelope) => {
                debug!(status_code = %envelope.status_code, "backend response");
                envelope
            }
            Err(e) => ApiResponse::failure(
                ResponseCode::INTERNAL_SERVER_ERROR,
                format!("Failed to parse response: {e}"),
            ),
        }
    }

    /// Fold a non-2xx response into an envelope.
    async fn parse_error<T>(&self, response: reqwest::Response) -> ApiResponse<T> {
        let status = response.status();
        let reason = status
            .canonical_reason()
            .map_or_else(|| format!("HTTP {}", status.as_u16()), str::to_string);
        let body: ErrorBody = response
            .bytes()
            .await
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default();

        let status_code = ResponseCode(body.code.unwrap_or_else(|| status.as_u16()));
        warn!(status = status.as_u16(), status_code = %status_code, "backend returned error");

        ApiResponse {
            status_code,
            data: None,
            message: body.message.unwrap_or(reason),
            error_code: body.error_code,
        }
    }
}

fn invalid_request<T>(error: &BackendError) -> ApiResponse<T> {
    warn!(error = %error, "invalid backend request");
    ApiResponse::failure(ResponseCode::INTERNAL_SERVER_ERROR, error.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> BackendClient {
        BackendClient::new(&Url::parse(base).unwrap()).unwrap()
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = client("https://api.example.test/v1/");
        assert_eq!(
            client.endpoint("/shop").unwrap().as_str(),
            "https://api.example.test/v1/shop"
        );
        assert_eq!(
            client.endpoint("webhooks/shop/update").unwrap().as_str(),
            "https://api.example.test/v1/webhooks/shop/update"
        );
    }

    #[test]
    fn test_with_hmac_shares_pool_and_leaves_original_unsigned() {
        let base = client("http://127.0.0.1:9");
        let signed = base.with_hmac("c2lnbmF0dXJl").unwrap();

        assert!(base.hmac.is_none());
        assert!(signed.hmac.is_some());
        assert!(Arc::ptr_eq(&base.inner, &signed.inner));
    }

    #[test]
    fn test_with_hmac_rejects_invalid_header() {
        let base = client("http://127.0.0.1:9");
        assert!(matches!(
            base.with_hmac("bad\nvalue"),
            Err(BackendError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_debug_redacts_hmac() {
        let signed = client("http://127.0.0.1:9").with_hmac("c2lnbmF0dXJl").unwrap();
        let debug_output = format!("{signed:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("c2lnbmF0dXJl"));
    }

    #[tokio::test]
    async fn test_transport_failure_is_folded() {
        // Port 9 (discard) is not listening on loopback in test environments.
        let response: ApiResponse<serde_json::Value> = client("http://127.0.0.1:9")
            .post("/shop", &serde_json::json!({}))
            .await;

        assert_eq!(response.status_code, ResponseCode::INTERNAL_SERVER_ERROR);
        assert!(!response.message.is_empty());
        assert!(response.data.is_none());
    }
}
