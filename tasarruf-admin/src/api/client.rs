use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::envelope::unwrap_field;
use super::transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};
use super::{ApiError, ApiResult};
use crate::session::SessionContext;
use tasarruf_types::ErrorResponse;

/// Header carrying the session token on every authenticated call
pub const TOKEN_HEADER: &str = "Token";

/// Whether a call carries the session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenUse {
    /// Fails with `Unauthenticated` before dispatch when there is no token.
    Required,
    /// Sent when the session has one, omitted otherwise.
    IfPresent,
    Never,
}

/// One outbound call: method, path, query and optional JSON body.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
    idempotent: bool,
    token: TokenUse,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            idempotent: method.is_idempotent(),
            token: TokenUse::Required,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> ApiResult<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Marks a POST as safe to repeat. Only for calls the server treats as
    /// idempotent by key, like plan/category associations.
    pub fn idempotent(mut self) -> Self {
        self.idempotent = true;
        self
    }

    /// Sends the request without a `Token` header.
    pub fn public(mut self) -> Self {
        self.token = TokenUse::Never;
        self
    }

    /// Public route that still accepts the token: attach it only when the
    /// session has one.
    pub fn token_if_present(mut self) -> Self {
        self.token = TokenUse::IfPresent;
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_retry_safe(&self) -> bool {
        self.idempotent
    }
}

/// How often a transport failure is retried before it surfaces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Pause between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Retries back to back, without pausing.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            delay: Duration::ZERO,
        }
    }

    pub fn attempts_for(&self, request: &ApiRequest) -> u32 {
        if request.is_retry_safe() {
            self.max_attempts.max(1)
        } else {
            1
        }
    }
}

/// API client for the Tasarruf backend.
///
/// Every call goes through `execute`: token attachment, bounded retry of
/// transport failures, status mapping and 401 session invalidation. Typed
/// endpoint wrappers live in the sibling modules.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    session: Arc<SessionContext>,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Create a new API client over HTTP
    pub fn new(base_url: impl Into<String>, session: Arc<SessionContext>) -> Self {
        Self::with_transport(base_url, session, Arc::new(ReqwestTransport::new()))
    }

    pub fn with_transport(
        base_url: impl Into<String>,
        session: Arc<SessionContext>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, request: &ApiRequest) -> String {
        let mut url = format!("{}{}", self.base_url, request.path);
        if !request.query.is_empty() {
            let params: Vec<String> = request
                .query
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect();
            url.push('?');
            url.push_str(&params.join("&"));
        }
        url
    }

    fn build(&self, request: &ApiRequest) -> ApiResult<HttpRequest> {
        let token = match request.token {
            TokenUse::Required => Some(self.session.token().ok_or(ApiError::Unauthenticated)?),
            TokenUse::IfPresent => self.session.token(),
            TokenUse::Never => None,
        };
        let headers = token
            .map(|token| vec![(TOKEN_HEADER.to_string(), token)])
            .unwrap_or_default();
        Ok(HttpRequest {
            method: request.method,
            url: self.url(request),
            headers,
            body: request.body.clone(),
        })
    }

    /// Sends the request and returns the raw response envelope.
    pub async fn execute(&self, request: &ApiRequest) -> ApiResult<Value> {
        let http = self.build(request)?;
        let attempts = self.retry.attempts_for(request);
        let mut attempt = 1;

        let response = loop {
            log_api_call!(
                "{} {} (attempt {}/{})",
                http.method.as_str(),
                request.path,
                attempt,
                attempts
            );
            match self.transport.send(&http).await {
                Ok(response) => break response,
                Err(e) if e.is_transport() && attempt < attempts => {
                    log::warn!(
                        "{} {} failed: {}; retrying",
                        http.method.as_str(),
                        request.path,
                        e
                    );
                    attempt += 1;
                    if !self.retry.delay.is_zero() {
                        tokio::time::sleep(self.retry.delay).await;
                    }
                }
                Err(e) => {
                    log::error!("{} {} failed: {}", http.method.as_str(), request.path, e);
                    return Err(e);
                }
            }
        };

        self.handle_response(request, &http, response)
    }

    /// Sends the request and unwraps the payload stored under `field`.
    pub async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest, field: &str) -> ApiResult<T> {
        let envelope = self.execute(&request).await?;
        unwrap_field(envelope, field)
    }

    fn handle_response(&self, request: &ApiRequest, http: &HttpRequest, response: HttpResponse) -> ApiResult<Value> {
        log_api_call!("{} {} -> {}", request.method.as_str(), request.path, response.status);

        if response.is_success() {
            if response.body.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&response.body)
                .map_err(|e| ApiError::Decoding(format!("response is not JSON: {}", e)));
        }

        let message = error_message(&response);
        // Only a token we actually sent can have been rejected
        if response.status == 401 && http.header(TOKEN_HEADER).is_some() {
            log::warn!("Server rejected the session token, logging out");
            self.session.invalidate();
        }
        Err(ApiError::from_status(response.status, message))
    }
}

/// Human-readable message out of an error body: the backend's `message`,
/// then its `error`, then the raw text.
fn error_message(response: &HttpResponse) -> String {
    if let Ok(body) = serde_json::from_str::<ErrorResponse>(&response.body) {
        if !body.message.is_empty() {
            return body.message;
        }
        if !body.error.is_empty() {
            return body.error;
        }
    }

    let text = response.body.trim();
    if text.is_empty() {
        return format!("Server returned {} error", response.status);
    }
    // Proxies answer with HTML pages
    if text.contains("<html>") || text.contains("<!DOCTYPE") {
        return format!(
            "Server returned {} error. Please check the API URL.",
            response.status
        );
    }
    text.to_string()
}
