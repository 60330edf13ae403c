//! reqwest-backed transport

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;

use super::{ApiRequest, ApiResponse, FormPart, MultipartForm, RequestBody, Transport};
use crate::error::RequestError;

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport; `timeout` of `None` keeps reqwest's default
    pub fn new(timeout: Option<Duration>) -> Result<Self, RequestError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("mood/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| RequestError::InvalidRequest(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, RequestError> {
        let mut builder = self.client.request(request.method, request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(form) => builder.multipart(to_reqwest_form(form)?),
        };

        let response = builder.send().await.map_err(map_send_error)?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| RequestError::Network(format!("Failed to read response body: {}", e)))?;

        Ok(ApiResponse {
            status,
            body: body.to_vec(),
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}

fn to_reqwest_form(form: MultipartForm) -> Result<Form, RequestError> {
    let mut out = Form::new();
    for part in form.parts {
        out = match part {
            FormPart::Text { name, value } => out.text(name, value),
            FormPart::File {
                name,
                file_name,
                mime_type,
                bytes,
            } => {
                let part = Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str(&mime_type)
                    .map_err(|e| {
                        RequestError::InvalidRequest(format!("Bad MIME type '{}': {}", mime_type, e))
                    })?;
                out.part(name, part)
            }
        };
    }
    Ok(out)
}

fn map_send_error(e: reqwest::Error) -> RequestError {
    if e.is_builder() {
        RequestError::InvalidRequest(e.to_string())
    } else if e.is_timeout() {
        RequestError::Network(format!("Request timed out: {}", e))
    } else {
        RequestError::Network(e.to_string())
    }
}
