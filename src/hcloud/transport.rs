//! Request transport.
//!
//! [`Client`](super::Client) builds [`ApiRequest`]s and hands them to a
//! [`Transport`]. [`HttpTransport`] sends them over HTTPS with `reqwest`;
//! tests swap in [`MockTransport`](crate::testing::MockTransport).

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::error::Error;

/// Default Hetzner Cloud API endpoint.
pub const DEFAULT_CLOUD_ENDPOINT: &str = "https://api.hetzner.cloud/v1";

/// Default Hetzner API endpoint (Storage Boxes).
pub const DEFAULT_HETZNER_ENDPOINT: &str = "https://api.hetzner.com/v1";

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
}

impl Method {
    /// Upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Which API a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Endpoint {
    /// `api.hetzner.cloud`: Primary IPs, Zones, types, ISOs.
    #[default]
    Cloud,
    /// `api.hetzner.com`: Storage Boxes.
    Hetzner,
}

/// A single API request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Target API.
    pub endpoint: Endpoint,
    /// Path below the endpoint, starting with `/`.
    pub path: String,
    /// Query parameters; keys may repeat.
    pub query: Vec<(String, String)>,
    /// JSON body.
    pub body: Option<Value>,
}

impl ApiRequest {
    /// Create a request without query or body.
    pub fn new(method: Method, endpoint: Endpoint, path: impl Into<String>) -> Self {
        Self {
            method,
            endpoint,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Append a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set the JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Raw response: status code and decoded JSON body (`Null` when empty).
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Value,
}

impl ApiResponse {
    /// Create a response.
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests to the API.
///
/// Implementations return `Ok` for every response the API produced,
/// including error statuses; `Err` is reserved for requests that never
/// got a response.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and return the raw response.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, Error>;
}

/// [`Transport`] backed by `reqwest`.
pub struct HttpTransport {
    client: reqwest::Client,
    /// ⚠️ never log this value
    token: String,
    cloud_endpoint: String,
    hetzner_endpoint: String,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("token", &"<REDACTED>")
            .field("cloud_endpoint", &self.cloud_endpoint)
            .field("hetzner_endpoint", &self.hetzner_endpoint)
            .finish()
    }
}

impl HttpTransport {
    /// Build a transport for the given token and endpoints.
    pub fn new(
        token: impl Into<String>,
        cloud_endpoint: impl Into<String>,
        hetzner_endpoint: impl Into<String>,
    ) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            token: token.into(),
            cloud_endpoint: cloud_endpoint.into().trim_end_matches('/').to_string(),
            hetzner_endpoint: hetzner_endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, endpoint: Endpoint, path: &str) -> String {
        let base = match endpoint {
            Endpoint::Cloud => &self.cloud_endpoint,
            Endpoint::Hetzner => &self.hetzner_endpoint,
        };
        format!("{}{}", base, path)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, Error> {
        let url = self.url(request.endpoint, &request.path);
        debug!(method = request.method.as_str(), url = %url, "Sending API request");

        let mut builder = self
            .client
            .request(request.method.into(), &url)
            .bearer_auth(&self.token)
            .query(&request.query);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Http(format!("{} {}: {}", request.method.as_str(), url, e)))?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Http(format!("failed to read response body: {}", e)))?;

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        debug!(status, "Received API response");
        Ok(ApiResponse::new(status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builder() {
        let request = ApiRequest::new(Method::Get, Endpoint::Cloud, "/actions")
            .with_query("id", "1")
            .with_query("id", "2")
            .with_body(json!({"x": 1}));

        assert_eq!(request.path, "/actions");
        assert_eq!(
            request.query,
            vec![
                ("id".to_string(), "1".to_string()),
                ("id".to_string(), "2".to_string())
            ]
        );
        assert_eq!(request.body, Some(json!({"x": 1})));
    }

    #[test]
    fn test_url_joins_endpoint() {
        let transport = HttpTransport::new(
            "secret",
            "https://api.hetzner.cloud/v1/",
            DEFAULT_HETZNER_ENDPOINT,
        )
        .unwrap();

        assert_eq!(
            transport.url(Endpoint::Cloud, "/primary_ips/1"),
            "https://api.hetzner.cloud/v1/primary_ips/1"
        );
        assert_eq!(
            transport.url(Endpoint::Hetzner, "/storage_boxes"),
            "https://api.hetzner.com/v1/storage_boxes"
        );
    }

    #[test]
    fn test_debug_redacts_token() {
        let transport =
            HttpTransport::new("secret", DEFAULT_CLOUD_ENDPOINT, DEFAULT_HETZNER_ENDPOINT)
                .unwrap();
        let debug = format!("{:?}", transport);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<REDACTED>"));
    }

    #[test]
    fn test_response_success() {
        assert!(ApiResponse::new(201, Value::Null).is_success());
        assert!(!ApiResponse::new(404, Value::Null).is_success());
    }
}
