//! API client for communicating with the carbon REST API.
//!
//! `ApiClient` resolves paths against a base URL and attaches the session
//! headers to every request. It is shared (behind an `Arc`) by a user and
//! every resource that user owns.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::error::ApiError;
use super::response::Response;
use super::transport::{Headers, Method, Transport};

pub struct ApiClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    headers: RwLock<Headers>,
}

impl ApiClient {
    /// Create a client rooted at `base_url`. A trailing `/` is added if missing.
    pub fn new(transport: Arc<dyn Transport>, base_url: &str) -> Self {
        let base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        Self {
            transport,
            base_url,
            headers: RwLock::new(Headers::new()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn headers(&self) -> Headers {
        self.headers.read().clone()
    }

    /// Replace every header sent with subsequent requests.
    pub fn set_headers(&self, headers: Headers) {
        *self.headers.write() = headers;
    }

    /// Resolve a path relative to the base URL. A leading `/` is ignored.
    pub fn url_for(&self, relative_url: &str) -> String {
        let relative = relative_url.strip_prefix('/').unwrap_or(relative_url);
        format!("{}{}", self.base_url, relative)
    }

    async fn request(&self, method: Method, relative_url: &str, body: Option<Value>) -> Response<Value> {
        let headers = self.headers();
        let url = self.url_for(relative_url);
        debug!(method = ?method, url = %url, "Sending request");
        self.transport.send(method, &headers, &url, body.as_ref()).await
    }

    async fn request_with_body<B: Serialize + ?Sized>(
        &self,
        method: Method,
        relative_url: &str,
        body: &B,
    ) -> Response<Value> {
        match serde_json::to_value(body) {
            Ok(body) => self.request(method, relative_url, Some(body)).await,
            Err(e) => ApiError::from(e).into_response(),
        }
    }

    pub async fn get(&self, relative_url: &str) -> Response<Value> {
        self.request(Method::Get, relative_url, None).await
    }

    pub async fn del(&self, relative_url: &str) -> Response<Value> {
        self.request(Method::Delete, relative_url, None).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, relative_url: &str, body: &B) -> Response<Value> {
        self.request_with_body(Method::Post, relative_url, body).await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, relative_url: &str, body: &B) -> Response<Value> {
        self.request_with_body(Method::Put, relative_url, body).await
    }

    pub async fn patch<B: Serialize + ?Sized>(&self, relative_url: &str, body: &B) -> Response<Value> {
        self.request_with_body(Method::Patch, relative_url, body).await
    }

    /// GET and decode the body into `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, relative_url: &str) -> Response<T> {
        self.get(relative_url).await.decode()
    }

    /// POST and decode the body into `T`.
    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        relative_url: &str,
        body: &B,
    ) -> Response<T> {
        self.post(relative_url, body).await.decode()
    }
}
