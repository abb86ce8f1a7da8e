//! Raw request functions: one call per HTTP verb, headers and URL supplied
//! by the caller.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use super::error::ApiError;
use super::response::Response;

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

pub type Headers = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Delete,
    Post,
    Put,
    Patch,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Delete => reqwest::Method::DELETE,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
        }
    }
}

/// Performs network calls. Never fails outright: every problem comes back
/// as a [`Response::Failure`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        method: Method,
        headers: &Headers,
        url: &str,
        body: Option<&Value>,
    ) -> Response<Value>;
}

/// `reqwest`-backed transport.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }

    /// Share an existing connection pool.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn try_send(
        &self,
        method: Method,
        headers: &Headers,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Response<Value>, ApiError> {
        let mut request = self.client.request(method.into(), url);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        debug!(url = url, status = status, "Response received");

        Ok(Response::from_envelope(status, &text))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        method: Method,
        headers: &Headers,
        url: &str,
        body: Option<&Value>,
    ) -> Response<Value> {
        match self.try_send(method, headers, url, body).await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = url, method = ?method, error = %e, "Request failed");
                e.into_response()
            }
        }
    }
}
