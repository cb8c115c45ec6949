//! HTTP seam.
//!
//! [`TransportClient`](crate::TransportClient) speaks to the network only
//! through the [`HttpClient`] trait, so the production client
//! ([`ReqwestClient`]) can be swapped for a scripted double
//! ([`MockHttpClient`]) or an in-process backend in tests.

use crate::config::ClientConfig;
use crate::error::TransportFailure;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// Request methods used by the backend API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
}

impl Method {
    /// Returns the method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

/// A fully composed outbound request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Request method.
    pub method: Method,
    /// Absolute URL without query string.
    pub url: String,
    /// Query string pairs.
    pub query: Vec<(String, String)>,
    /// Header pairs.
    pub headers: Vec<(String, String)>,
    /// Encoded body.
    pub body: Option<Vec<u8>>,
    /// Deadline for the whole exchange.
    pub timeout: Duration,
}

impl HttpRequest {
    /// Returns the first header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the query value for `name`.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Decodes the body as JSON.
    pub fn json_body(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|b| serde_json::from_slice(b).ok())
    }
}

/// A raw response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Body bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response with a raw body.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Creates a response with a JSON body.
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status, value.to_string())
    }

    /// Creates a response with an empty body.
    pub fn empty(status: u16) -> Self {
        Self::new(status, Vec::new())
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client abstraction.
///
/// Implementations perform one exchange and report network-level problems
/// as [`TransportFailure`]. Status classification happens above this seam.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Performs the request.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportFailure>;
}

/// Production [`HttpClient`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Builds a client using the configured user agent and timeout.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportFailure> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportFailure::Other(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wraps an existing `reqwest` client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportFailure> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };
        let timeout = request.timeout;
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                TransportFailure::Timeout(timeout)
            } else if e.is_connect() {
                TransportFailure::Connect(e.to_string())
            } else {
                TransportFailure::Other(e.to_string())
            }
        };

        let mut builder = self.client.request(method, &request.url).timeout(timeout);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(classify)?;
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

/// A scripted [`HttpClient`] for tests.
///
/// Responses are returned in the order they were queued. Every request is
/// logged. While paused, requests are held in flight until [`resume`]
/// is called (or the caller's timeout elapses).
///
/// [`resume`]: MockHttpClient::resume
#[derive(Debug, Default)]
pub struct MockHttpClient {
    responses: Mutex<VecDeque<Result<HttpResponse, TransportFailure>>>,
    requests: Mutex<Vec<HttpRequest>>,
    paused: AtomicBool,
    resumed: Notify,
    received: Notify,
}

impl MockHttpClient {
    /// Creates a mock with no queued responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response.
    pub fn push_response(&self, response: HttpResponse) {
        self.responses.lock().push_back(Ok(response));
    }

    /// Queues a JSON response.
    pub fn push_json(&self, status: u16, body: serde_json::Value) {
        self.push_response(HttpResponse::json(status, &body));
    }

    /// Queues a network failure.
    pub fn push_failure(&self, failure: TransportFailure) {
        self.responses.lock().push_back(Err(failure));
    }

    /// Returns every request seen so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Returns the number of requests seen so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Returns the number of queued responses not yet consumed.
    pub fn pending_responses(&self) -> usize {
        self.responses.lock().len()
    }

    /// Holds subsequent requests in flight.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    /// Releases held requests.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.resumed.notify_waiters();
    }

    /// Waits until at least `count` requests have been received.
    pub async fn wait_for_requests(&self, count: usize) {
        loop {
            let notified = self.received.notified();
            if self.request_count() >= count {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportFailure> {
        self.requests.lock().push(request);
        self.received.notify_waiters();

        loop {
            let notified = self.resumed.notified();
            if !self.paused.load(Ordering::SeqCst) {
                break;
            }
            notified.await;
        }

        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportFailure::Other("no mock response queued".into())))
    }
}
