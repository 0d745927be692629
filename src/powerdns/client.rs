use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::TransportError;

/// Verb-based access to the PowerDNS HTTP API.
///
/// Paths are relative to the API base (`/servers`, `/servers/localhost/zones`).
/// Implementations return the decoded JSON body, or `Value::Null` for an
/// empty one.
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, TransportError>;

    async fn get(&self, path: &str) -> Result<Value, TransportError> {
        self.request(Method::GET, path, &[], None).await
    }

    async fn get_with_query(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, TransportError> {
        self.request(Method::GET, path, query, None).await
    }

    async fn post(&self, path: &str, body: Option<&Value>) -> Result<Value, TransportError> {
        self.request(Method::POST, path, &[], body).await
    }

    async fn patch(&self, path: &str, body: Option<&Value>) -> Result<Value, TransportError> {
        self.request(Method::PATCH, path, &[], body).await
    }

    async fn put(&self, path: &str, body: Option<&Value>) -> Result<Value, TransportError> {
        self.request(Method::PUT, path, &[], body).await
    }

    async fn delete(&self, path: &str) -> Result<Value, TransportError> {
        self.request(Method::DELETE, path, &[], None).await
    }
}

#[derive(Clone)]
pub struct PowerDnsClient {
    http: Client,
    base_url: String, // e.g. "http://127.0.0.1:8081/api/v1"
    api_key: String,
}

impl std::fmt::Debug for PowerDnsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PowerDnsClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<REDACTED>")
            .finish()
    }
}

impl PowerDnsClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_http(Client::new(), base_url, api_key)
    }

    pub fn with_http(http: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_http(
            builder.build()?,
            config.api_base(),
            &config.api_key,
        ))
    }

    fn auth_header(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("X-API-Key", &self.api_key)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl ApiClient for PowerDnsClient {
    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, TransportError> {
        let request_error = |source: reqwest::Error| TransportError::Request {
            method: method.clone(),
            path: path.to_string(),
            source,
        };

        tracing::debug!(%method, path, "PowerDNS request");
        let mut req = self.auth_header(self.http.request(method.clone(), self.url(path)));
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let res = req.send().await.map_err(request_error)?;
        let status = res.status();
        let text = res.text().await.map_err(request_error)?;
        if !status.is_success() {
            return Err(TransportError::Status {
                method,
                path: path.to_string(),
                status,
                body: text,
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|source| TransportError::Body {
            method,
            path: path.to_string(),
            source,
        })
    }
}
