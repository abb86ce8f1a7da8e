//! In-memory transport for exercising the client and models without a
//! network.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::api::{ApiClient, FailureCode, Headers, Method, Response, Transport};

pub const BASE_URL: &str = "http://carbon.test/";

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub url: String,
    pub headers: Headers,
    pub body: Option<Value>,
}

/// Answers requests from a fixed route table keyed by method and path.
/// Unknown routes answer 404.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<(Method, String), Response<Value>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reply for `path` (relative to [`BASE_URL`]).
    pub fn route(self, method: Method, path: &str, response: Response<Value>) -> Self {
        self.set_route(method, path, response);
        self
    }

    pub fn set_route(&self, method: Method, path: &str, response: Response<Value>) {
        let url = format!("{}{}", BASE_URL, path.trim_start_matches('/'));
        self.routes.lock().insert((method, url), response);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, path: &str) -> usize {
        let url = format!("{}{}", BASE_URL, path.trim_start_matches('/'));
        self.calls.lock().iter().filter(|c| c.url == url).count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        method: Method,
        headers: &Headers,
        url: &str,
        body: Option<&Value>,
    ) -> Response<Value> {
        self.calls.lock().push(RecordedCall {
            method,
            url: url.to_string(),
            headers: headers.clone(),
            body: body.cloned(),
        });
        self.routes
            .lock()
            .get(&(method, url.to_string()))
            .cloned()
            .unwrap_or_else(|| Response::failure(FailureCode::NotFound, "no route"))
    }
}

pub fn client(transport: &Arc<MockTransport>) -> Arc<ApiClient> {
    Arc::new(ApiClient::new(transport.clone(), BASE_URL))
}
