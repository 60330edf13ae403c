//! API client for the Mood backend
//!
//! `ApiClient` owns the base URL and a default-headers map shared by every
//! request; the bearer token lives in that map. The actual I/O goes through a
//! [`Transport`], so tests can script responses with [`mock::MockTransport`]
//! while production uses [`http::HttpTransport`].
//!
//! Every call is a single attempt. Failures are decoded once, here, into a
//! [`RequestError`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use libmood::api::{ApiClient, http::HttpTransport};
//!
//! # async fn example() -> Result<(), libmood::error::RequestError> {
//! let transport = HttpTransport::new(None)?;
//! let api = ApiClient::new("http://localhost:3333", Arc::new(transport));
//!
//! let results: serde_json::Value = api.get_json_with_query("/user/search", &[("query", "ann")]).await?;
//! # Ok(())
//! # }
//! ```
//!
//! The bearer header is only changed through
//! [`SessionManager`](crate::session::SessionManager), which keeps it in step
//! with the auth state:
//!
//! ```compile_fail
//! # use std::sync::Arc;
//! # use libmood::api::{ApiClient, mock::MockTransport};
//! let api = ApiClient::new("http://localhost:3333", Arc::new(MockTransport::new()));
//! api.set_auth_header("token");
//! ```

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::RequestError;

pub mod http;
pub mod mock;

pub const AUTHORIZATION: &str = "Authorization";

/// Body of an outgoing request
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(MultipartForm),
}

/// One part of a multipart body
#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        mime_type: String,
        bytes: Vec<u8>,
    },
}

impl FormPart {
    pub fn name(&self) -> &str {
        match self {
            FormPart::Text { name, .. } | FormPart::File { name, .. } => name,
        }
    }
}

/// Ordered multipart form
///
/// Kept transport-neutral so that tests can inspect exactly which parts a
/// controller attached.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MultipartForm {
    pub parts: Vec<FormPart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, mime_type: &str, bytes: Vec<u8>) -> Self {
        self.parts.push(FormPart::File {
            name: name.to_string(),
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            bytes,
        });
        self
    }

    pub fn part(&self, name: &str) -> Option<&FormPart> {
        self.parts.iter().find(|p| p.name() == name)
    }

    pub fn part_names(&self) -> Vec<&str> {
        self.parts.iter().map(FormPart::name).collect()
    }
}

/// A fully resolved request, ready for a transport
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub headers: BTreeMap<String, String>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Path plus query string, e.g. `/user/search?query=ann`
    pub fn path_and_query(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{}", self.url.path(), query),
            None => self.url.path().to_string(),
        }
    }
}

/// Raw response handed back by a transport
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            body: body.to_string().into_bytes(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Moves an [`ApiRequest`] over the wire
///
/// Implementations only report transport-level failures (`Network`,
/// `InvalidRequest`); status handling is done by [`ApiClient`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, RequestError>;

    /// Transport identifier for logs
    fn name(&self) -> &str;
}

/// HTTP client with shared base configuration
pub struct ApiClient {
    base_url: String,
    transport: Arc<dyn Transport>,
    default_headers: RwLock<BTreeMap<String, String>>,
}

impl ApiClient {
    pub fn new(base_url: &str, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            default_headers: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// All future requests carry `Authorization: Bearer <token>`
    pub(crate) fn set_auth_header(&self, token: &str) {
        self.default_headers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(AUTHORIZATION.to_string(), format!("Bearer {}", token));
        tracing::debug!("Bearer token attached to default headers");
    }

    /// Subsequent requests are unauthenticated
    pub(crate) fn clear_auth_header(&self) {
        let removed = self
            .default_headers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(AUTHORIZATION);
        if removed.is_some() {
            tracing::debug!("Bearer token removed from default headers");
        }
    }

    /// Current `Authorization` default header, if any
    pub fn auth_header(&self) -> Option<String> {
        self.default_headers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(AUTHORIZATION)
            .cloned()
    }

    /// Copy of the default headers
    pub fn default_headers(&self) -> BTreeMap<String, String> {
        self.default_headers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Perform a request and parse the response body as JSON
    ///
    /// `path` is appended to the base URL and may carry its own query string.
    /// Per-call `headers` override defaults with the same name. An empty
    /// response body parses as `Value::Null`.
    ///
    /// # Errors
    ///
    /// - `RequestError::Network` when no response arrived
    /// - `RequestError::Http` for 4xx/5xx, with the body's `message` field
    /// - `RequestError::Decode` when a 2xx body is not JSON
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
        headers: Option<BTreeMap<String, String>>,
    ) -> Result<Value, RequestError> {
        let url = self.url(path, &[])?;
        self.execute(method, url, body, headers).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RequestError> {
        let value = self.request(Method::GET, path, RequestBody::Empty, None).await?;
        decode(value)
    }

    /// GET with form-encoded query pairs appended to `path`
    pub async fn get_json_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, RequestError> {
        let url = self.url(path, query)?;
        let value = self.execute(Method::GET, url, RequestBody::Empty, None).await?;
        decode(value)
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, RequestError> {
        let body = serde_json::to_value(body)
            .map_err(|e| RequestError::InvalidRequest(format!("Unserializable body: {}", e)))?;
        let value = self
            .request(Method::POST, path, RequestBody::Json(body), None)
            .await?;
        decode(value)
    }

    pub async fn post_multipart(
        &self,
        path: &str,
        form: MultipartForm,
        headers: Option<BTreeMap<String, String>>,
    ) -> Result<Value, RequestError> {
        self.request(Method::POST, path, RequestBody::Multipart(form), headers)
            .await
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, RequestError> {
        let raw = if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };
        let mut url = Url::parse(&raw)
            .map_err(|e| RequestError::InvalidRequest(format!("Invalid URL '{}': {}", raw, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter());
        }
        Ok(url)
    }

    async fn execute(
        &self,
        method: Method,
        url: Url,
        body: RequestBody,
        headers: Option<BTreeMap<String, String>>,
    ) -> Result<Value, RequestError> {
        let mut merged = self.default_headers();
        if let Some(extra) = headers {
            for (name, value) in extra {
                merged.retain(|k, _| !k.eq_ignore_ascii_case(&name));
                merged.insert(name, value);
            }
        }

        let request = ApiRequest {
            method,
            url,
            headers: merged,
            body,
        };
        let label = format!("{} {}", request.method, request.path_and_query());
        tracing::debug!("{} via {}", label, self.transport.name());

        let response = self.transport.send(request).await.map_err(|e| {
            tracing::warn!("{} failed: {}", label, e);
            e
        })?;

        tracing::debug!("{} -> {}", label, response.status);
        interpret(response)
    }
}

/// Turn a raw response into a JSON value or a decoded failure
fn interpret(response: ApiResponse) -> Result<Value, RequestError> {
    let parsed = if response.body.iter().all(u8::is_ascii_whitespace) {
        Ok(Value::Null)
    } else {
        serde_json::from_slice::<Value>(&response.body)
    };

    if response.is_success() {
        return parsed.map_err(|e| RequestError::Decode(e.to_string()));
    }

    let message = parsed.ok().and_then(|body| match body {
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    });

    Err(RequestError::Http {
        status: response.status,
        message,
    })
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, RequestError> {
    serde_json::from_value(value).map_err(|e| RequestError::Decode(e.to_string()))
}
