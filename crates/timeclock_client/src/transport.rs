//! Transport layer: request composition and response classification.

use crate::config::ClientConfig;
use crate::error::{RequestError, TransportFailure, UNAUTHORIZED};
use crate::http::{HttpClient, HttpRequest, HttpResponse, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Supplies the bearer token for session-authenticated requests.
pub trait TokenSource: Send + Sync {
    /// Returns the current token, or `None` when signed out.
    fn bearer_token(&self) -> Option<String>;
}

/// Which credentials a request carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    /// The session's current token, if any.
    Session,
    /// An explicit token, independent of the session.
    Bearer(String),
    /// No `Authorization` header.
    Anonymous,
}

/// A request relative to the configured base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// Request method.
    pub method: Method,
    /// Path below the base URL, starting with `/`.
    pub path: String,
    /// Query string pairs.
    pub query: Vec<(String, String)>,
    /// JSON body.
    pub body: Option<serde_json::Value>,
    /// Credentials to attach.
    pub auth: Auth,
    /// Per-request timeout; the configured default when `None`.
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            auth: Auth::Session,
            timeout: None,
        }
    }

    /// Creates a `GET` request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// Creates a `POST` request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// Creates a `PATCH` request.
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    /// Creates a `DELETE` request.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Appends query pairs.
    pub fn with_query(mut self, pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    /// Sets a JSON body.
    pub fn with_json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, RequestError> {
        let value = serde_json::to_value(body).map_err(|e| RequestError::Encode(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Sends the request without credentials.
    pub fn anonymous(mut self) -> Self {
        self.auth = Auth::Anonymous;
        self
    }

    /// Sends the request with an explicit token.
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.auth = Auth::Bearer(token.into());
        self
    }

    /// Overrides the default timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Summary of one completed exchange, handed to every observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    /// Request method.
    pub method: Method,
    /// Request path.
    pub path: String,
    /// Whether an `Authorization` header was sent.
    pub carried_token: bool,
    /// Response status; `None` when the server was not reached.
    pub status: Option<u16>,
}

impl Exchange {
    /// Returns true if the server answered 401.
    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(UNAUTHORIZED)
    }
}

/// Sees every exchange exactly once, before the caller gets the result.
pub trait ResponseObserver: Send + Sync {
    /// Called after each exchange completes, fails or times out.
    fn observe(&self, exchange: &Exchange);
}

/// Sends API requests and classifies their outcome.
///
/// - Composes `base_url + path`
/// - Adds `Content-Type: application/json` and, when available,
///   `Authorization: Bearer <token>`
/// - Applies the default timeout (10 s) unless the request overrides it
/// - Maps status >= 400 to [`RequestError::HttpStatus`] and network
///   problems to [`RequestError::Transport`]
pub struct TransportClient {
    config: ClientConfig,
    http: Arc<dyn HttpClient>,
    tokens: Arc<dyn TokenSource>,
    observers: Vec<Arc<dyn ResponseObserver>>,
}

impl TransportClient {
    /// Creates a transport.
    pub fn new(
        config: ClientConfig,
        http: Arc<dyn HttpClient>,
        tokens: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            config,
            http,
            tokens,
            observers: Vec::new(),
        }
    }

    /// Registers an observer.
    pub fn with_observer(mut self, observer: Arc<dyn ResponseObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sends `request` and returns the raw response of a successful exchange.
    pub async fn send(&self, request: ApiRequest) -> Result<HttpResponse, RequestError> {
        let token = match &request.auth {
            Auth::Session => self.tokens.bearer_token(),
            Auth::Bearer(token) => Some(token.clone()),
            Auth::Anonymous => None,
        };

        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(token) = &token {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }

        let body = request
            .body
            .as_ref()
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| RequestError::Encode(e.to_string()))?;

        let timeout = request.timeout.unwrap_or(self.config.timeout);
        let http_request = HttpRequest {
            method: request.method,
            url: self.config.url_for(&request.path),
            query: request.query,
            headers,
            body,
            timeout,
        };

        debug!(method = request.method.as_str(), path = %request.path, "sending request");
        let outcome = match tokio::time::timeout(timeout, self.http.execute(http_request)).await {
            Ok(result) => result,
            Err(_) => Err(TransportFailure::Timeout(timeout)),
        };

        let exchange = Exchange {
            method: request.method,
            path: request.path,
            carried_token: token.is_some(),
            status: outcome.as_ref().ok().map(|r| r.status),
        };
        for observer in &self.observers {
            observer.observe(&exchange);
        }

        let response = outcome.map_err(|failure| {
            warn!(path = %exchange.path, error = %failure, "request did not reach the server");
            RequestError::Transport(failure)
        })?;

        if response.status >= 400 {
            let message = server_message(&response.body).unwrap_or_else(|| "Request failed".into());
            debug!(path = %exchange.path, status = response.status, "request rejected");
            return Err(RequestError::HttpStatus {
                status: response.status,
                message,
            });
        }

        Ok(response)
    }

    /// Sends `request` and decodes the JSON response body.
    pub async fn send_json<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R, RequestError> {
        let response = self.send(request).await?;
        decode_body(&response.body)
    }

    /// Sends `request` and discards the response body.
    pub async fn send_empty(&self, request: ApiRequest) -> Result<(), RequestError> {
        self.send(request).await.map(|_| ())
    }
}

impl std::fmt::Debug for TransportClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportClient")
            .field("base_url", &self.config.base_url)
            .field("timeout", &self.config.timeout)
            .field("observers", &self.observers.len())
            .finish()
    }
}

fn decode_body<R: DeserializeOwned>(body: &[u8]) -> Result<R, RequestError> {
    let body = if body.is_empty() { b"null".as_slice() } else { body };
    serde_json::from_slice(body).map_err(|e| RequestError::Decode(e.to_string()))
}

fn server_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value.get("message")?.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockHttpClient;
    use parking_lot::Mutex;
    use serde_json::json;

    struct FixedToken(Option<String>);

    impl TokenSource for FixedToken {
        fn bearer_token(&self) -> Option<String> {
            self.0.clone()
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        seen: Mutex<Vec<Exchange>>,
    }

    impl ResponseObserver for RecordingObserver {
        fn observe(&self, exchange: &Exchange) {
            self.seen.lock().push(exchange.clone());
        }
    }

    fn transport(mock: &Arc<MockHttpClient>, token: Option<&str>) -> TransportClient {
        TransportClient::new(
            ClientConfig::new("https://clock.example.com/api/v1"),
            mock.clone(),
            Arc::new(FixedToken(token.map(str::to_string))),
        )
    }

    #[tokio::test]
    async fn composes_url_and_headers() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_json(200, json!({"ok": true}));
        let transport = transport(&mock, Some("t-1"));

        let request = ApiRequest::get("/clock/records")
            .with_query([("userId".to_string(), "u-1".to_string())]);
        transport.send(request).await.unwrap();

        let sent = &mock.requests()[0];
        assert_eq!(sent.url, "https://clock.example.com/api/v1/clock/records");
        assert_eq!(sent.header("content-type"), Some("application/json"));
        assert_eq!(sent.header("authorization"), Some("Bearer t-1"));
        assert_eq!(sent.query_param("userId"), Some("u-1"));
        assert_eq!(sent.timeout, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn anonymous_and_explicit_credentials() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_json(200, json!({}));
        mock.push_json(200, json!({}));
        let transport = transport(&mock, Some("session-token"));

        transport.send(ApiRequest::post("/auth/wechat-login").anonymous()).await.unwrap();
        transport
            .send(ApiRequest::get("/auth/verify").with_bearer("other"))
            .await
            .unwrap();

        let sent = mock.requests();
        assert_eq!(sent[0].header("authorization"), None);
        assert_eq!(sent[1].header("authorization"), Some("Bearer other"));
    }

    #[tokio::test]
    async fn error_status_carries_server_message() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_json(422, json!({"message": "already clocked in"}));
        mock.push_response(HttpResponse::new(500, "<html>oops</html>"));
        let transport = transport(&mock, None);

        let err = transport.send(ApiRequest::post("/clock/records")).await.unwrap_err();
        assert_eq!(
            err,
            RequestError::HttpStatus {
                status: 422,
                message: "already clocked in".into()
            }
        );

        let err = transport.send(ApiRequest::get("/user/profile")).await.unwrap_err();
        assert_eq!(
            err,
            RequestError::HttpStatus {
                status: 500,
                message: "Request failed".into()
            }
        );
    }

    #[tokio::test]
    async fn network_failure_is_distinct_from_status_failure() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_failure(TransportFailure::Connect("refused".into()));
        let transport = transport(&mock, None);

        let err = transport.send(ApiRequest::get("/auth/verify")).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(err.status(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_request_times_out() {
        let mock = Arc::new(MockHttpClient::new());
        mock.pause();
        let transport = transport(&mock, None);

        let err = transport
            .send(ApiRequest::get("/clock/records").with_timeout(Duration::from_secs(2)))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RequestError::Transport(TransportFailure::Timeout(Duration::from_secs(2)))
        );
    }

    #[tokio::test]
    async fn observers_see_every_exchange_once() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_json(401, json!({"message": "expired"}));
        mock.push_failure(TransportFailure::Other("reset".into()));
        mock.push_json(200, json!({}));
        let observer = Arc::new(RecordingObserver::default());
        let transport = transport(&mock, Some("t")).with_observer(observer.clone());

        let _ = transport.send(ApiRequest::get("/a")).await;
        let _ = transport.send(ApiRequest::get("/b")).await;
        let _ = transport.send(ApiRequest::get("/c").anonymous()).await;

        let seen = observer.seen.lock().clone();
        assert_eq!(seen.len(), 3);
        assert!(seen[0].is_unauthorized());
        assert!(seen[0].carried_token);
        assert_eq!(seen[1].status, None);
        assert_eq!(seen[2].status, Some(200));
        assert!(!seen[2].carried_token);
    }

    #[tokio::test]
    async fn decodes_json_and_empty_bodies() {
        #[derive(Debug, serde::Deserialize)]
        struct Created {
            id: String,
        }

        let mock = Arc::new(MockHttpClient::new());
        mock.push_json(201, json!({"id": "r-1"}));
        mock.push_response(HttpResponse::empty(204));
        mock.push_response(HttpResponse::new(200, "not json"));
        let transport = transport(&mock, None);

        let created: Created = transport.send_json(ApiRequest::post("/clock/records")).await.unwrap();
        assert_eq!(created.id, "r-1");

        transport.send_empty(ApiRequest::delete("/clock/records/r-1")).await.unwrap();

        let err = transport
            .send_json::<Created>(ApiRequest::get("/clock/records"))
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::Decode(_)));
    }
}
