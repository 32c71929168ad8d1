use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::transport::{HttpRequest, HttpResponse, Method, Transport};
use super::{ApiError, ApiResult};

struct Route {
    method: Method,
    path: String,
    queued: VecDeque<ApiResult<HttpResponse>>,
    fallback: Option<ApiResult<HttpResponse>>,
}

impl Route {
    fn matches(&self, method: Method, path: &str, query: Option<&str>) -> bool {
        if self.method != method {
            return false;
        }
        match self.path.split_once('?') {
            Some((p, q)) => p == path && Some(q) == query,
            None => self.path == path,
        }
    }
}

/// In-memory transport with scripted responses.
///
/// Routes match on method and path; a route path containing `?` must match
/// the query string exactly as well. Queued responses are consumed in order,
/// then the route's `always` response (if any) is repeated. Unrouted requests
/// get a 404.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json(status: u16, body: serde_json::Value) -> ApiResult<HttpResponse> {
        Ok(HttpResponse {
            status,
            body: body.to_string(),
        })
    }

    pub fn network_error(message: &str) -> ApiResult<HttpResponse> {
        Err(ApiError::Network(message.to_string()))
    }

    /// Queues one response for `method path`.
    pub fn on(&self, method: Method, path: &str, response: ApiResult<HttpResponse>) {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        match routes.iter_mut().find(|r| r.method == method && r.path == path) {
            Some(route) => route.queued.push_back(response),
            None => routes.push(Route {
                method,
                path: path.to_string(),
                queued: VecDeque::from([response]),
                fallback: None,
            }),
        }
    }

    /// Answers every request to `method path` with `response` once the
    /// queue for that route is empty.
    pub fn always(&self, method: Method, path: &str, response: ApiResult<HttpResponse>) {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        match routes.iter_mut().find(|r| r.method == method && r.path == path) {
            Some(route) => route.fallback = Some(response),
            None => routes.push(Route {
                method,
                path: path.to_string(),
                queued: VecDeque::new(),
                fallback: Some(response),
            }),
        }
    }

    /// Every request seen so far, in dispatch order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of requests sent to `method path` (query string ignored).
    pub fn count(&self, method: Method, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && split_url(&r.url).0 == path)
            .count()
    }
}

/// Splits an absolute URL into its path and query string.
fn split_url(url: &str) -> (&str, Option<&str>) {
    let after_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let path_and_query = after_scheme
        .find('/')
        .map(|i| &after_scheme[i..])
        .unwrap_or("/");
    match path_and_query.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (path_and_query, None),
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &HttpRequest) -> ApiResult<HttpResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        let (path, query) = split_url(&request.url);
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        let route = routes.iter_mut().find(|r| {
            r.matches(request.method, path, query) && (!r.queued.is_empty() || r.fallback.is_some())
        });
        match route {
            Some(route) => match route.queued.pop_front() {
                Some(response) => response,
                None => route
                    .fallback
                    .clone()
                    .unwrap_or_else(|| Err(ApiError::Network("mock route exhausted".to_string()))),
            },
            None => Ok(HttpResponse {
                status: 404,
                body: format!(
                    "{{\"error\":\"no route\",\"message\":\"no mock for {} {}\"}}",
                    request.method.as_str(),
                    path
                ),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_url() {
        assert_eq!(
            split_url("http://api.test/admin/users?q=a"),
            ("/admin/users", Some("q=a"))
        );
        assert_eq!(split_url("http://api.test"), ("/", None));
    }

    #[tokio::test]
    async fn test_query_specific_routes() {
        let mock = MockTransport::new();
        mock.on(
            Method::Post,
            "/admin/associate-plan-category?planID=1&categoryID=2",
            MockTransport::json(200, serde_json::json!({ "success": "ok" })),
        );
        let request = |query: &str| HttpRequest {
            method: Method::Post,
            url: format!("http://api.test/admin/associate-plan-category?{}", query),
            headers: Vec::new(),
            body: None,
        };

        let other = mock.send(&request("planID=1&categoryID=3")).await.unwrap();
        assert_eq!(other.status, 404);

        let hit = mock.send(&request("planID=1&categoryID=2")).await.unwrap();
        assert_eq!(hit.status, 200);
        assert_eq!(mock.count(Method::Post, "/admin/associate-plan-category"), 2);
    }
}
