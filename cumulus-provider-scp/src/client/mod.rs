//! Transport adapter for the SCP control plane
//!
//! `Transport` moves one JSON request to the remote and back. `ScpApi` on top
//! of it has one method per remote operation and decodes the payload.

pub mod api;
pub mod models;

use std::fmt;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

pub use api::{ClusterApi, ScpApi};

use crate::config::ProviderConfig;
use models::ErrorBody;

/// HTTP method of a remote call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        f.write_str(s)
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

/// One remote call
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Successful response: HTTP status and decoded JSON body (`Null` when empty)
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

/// Failure of a single remote call
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    #[error("{method} {path} failed ({status}): {message}")]
    Status {
        method: Method,
        path: String,
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("{method} {path}: {message}")]
    Io {
        method: Method,
        path: String,
        message: String,
    },

    #[error("failed to decode response of {path}: {message}")]
    Decode { path: String, message: String },
}

impl ApiError {
    /// Error for a non-2xx response, reading `{ "Code", "Message" }` when present
    pub fn from_status(method: Method, path: &str, status: u16, body: &str) -> Self {
        let (code, message) = match serde_json::from_str::<ErrorBody>(body) {
            Ok(err) => (err.code, err.message.unwrap_or_else(|| body.to_string())),
            Err(_) => (None, body.to_string()),
        };
        ApiError::Status {
            method,
            path: path.to_string(),
            status,
            code,
            message,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Remote error code, e.g. `NIC_NAT_NOT_EXIST`
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Status { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// The remote no longer knows the resource (404, or 403 for a deleted one)
    pub fn is_not_found(&self) -> bool {
        matches!(self.status(), Some(404) | Some(403))
    }

    /// 5xx and I/O failures are worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Status { status, .. } => *status >= 500,
            ApiError::Io { .. } => true,
            ApiError::Decode { .. } => false,
        }
    }
}

/// Sends requests to the remote control plane
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError>;
}

const CLIENT_TYPE: &str = "OpenApi";

/// `Transport` over HTTPS
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    secret_key: String,
}

impl HttpTransport {
    pub fn new(config: &ProviderConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        let mut insert = |name: &str, value: &str| -> Result<(), ApiError> {
            let invalid = |e: &dyn fmt::Display| ApiError::Io {
                method: Method::Get,
                path: String::new(),
                message: format!("invalid header {}: {}", name, e),
            };
            let key = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(&e))?;
            let value = HeaderValue::from_str(value).map_err(|e| invalid(&e))?;
            headers.insert(key, value);
            Ok(())
        };
        insert("X-Cmp-AccessKey", &config.access_key)?;
        insert("X-Cmp-ProjectId", &config.project_id)?;
        insert("X-Cmp-ClientType", CLIENT_TYPE)?;
        if let Some(region) = &config.region {
            insert("X-Cmp-Region", region)?;
        }
        insert("User-Agent", &config.user_agent)?;

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Io {
                method: Method::Get,
                path: String::new(),
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = format!("{}{}", self.endpoint, request.path);
        log::debug!("{} {}", request.method, request.path);

        let mut builder = self
            .client
            .request(request.method.into(), &url)
            .bearer_auth(&self.secret_key)
            .query(&request.query);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let io_error = |e: reqwest::Error| ApiError::Io {
            method: request.method,
            path: request.path.clone(),
            message: e.to_string(),
        };

        let response = builder.send().await.map_err(io_error)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(io_error)?;

        if !(200..300).contains(&status) {
            return Err(ApiError::from_status(
                request.method,
                &request.path,
                status,
                &text,
            ));
        }

        let body = if text.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| ApiError::Decode {
                path: request.path.clone(),
                message: e.to_string(),
            })?
        };

        Ok(ApiResponse { status, body })
    }
}
