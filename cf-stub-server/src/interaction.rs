//! Canned request/response pairs served by the stub
//!
//! An [`Interaction`] pairs a request matcher (method, path and an optional
//! query string) with the [`StubResponse`] to send back. Interactions are
//! registered programmatically or loaded from a JSON fixtures file:
//!
//! ```json
//! [
//!   {
//!     "request": { "method": "GET", "path": "/v2/info" },
//!     "response": {
//!       "status": 200,
//!       "headers": { "X-Cf-Warnings": "" },
//!       "body": { "token_endpoint": "http://localhost:8181" },
//!       "latency_ms": 0
//!     }
//!   }
//! ]
//! ```
//!
//! `body` is sent as JSON, `text` as plain text. When both are missing the
//! response has no body.

use anyhow::{Context, Result};
use axum::http::{HeaderMap, Method, StatusCode};
use bytes::Bytes;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Which requests an interaction answers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMatcher {
    pub method: Method,
    pub path: String,
    /// When set, the query string must contain exactly these pairs in any order
    pub query: Option<String>,
}

impl RequestMatcher {
    /// Builds a matcher from `path` or `path?query`
    pub fn new(method: Method, path_and_query: &str) -> Self {
        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (path_and_query, None),
        };
        Self {
            method,
            path: path.to_string(),
            query,
        }
    }

    pub fn matches(&self, method: &Method, path: &str, query: Option<&str>) -> bool {
        if self.method != method || self.path != path {
            return false;
        }
        match &self.query {
            Some(expected) => sorted_pairs(expected) == sorted_pairs(query.unwrap_or_default()),
            None => true,
        }
    }
}

fn sorted_pairs(query: &str) -> Vec<&str> {
    let mut pairs: Vec<&str> = query.split('&').filter(|pair| !pair.is_empty()).collect();
    pairs.sort_unstable();
    pairs
}

/// The canned reply of an interaction
#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    /// Delay before the reply is sent
    pub latency: Duration,
}

impl StubResponse {
    pub fn empty(status: u16) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            headers: Vec::new(),
            body: Bytes::new(),
            latency: Duration::ZERO,
        }
    }

    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self::empty(status)
            .with_header("Content-Type", "application/json")
            .with_body(body.to_string())
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::empty(status)
            .with_header("Content-Type", "text/plain")
            .with_body(body.into())
    }

    pub fn bytes(status: u16, content_type: &str, body: impl Into<Bytes>) -> Self {
        Self::empty(status)
            .with_header("Content-Type", content_type)
            .with_body(body)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

/// A canned request/response pair
#[derive(Debug, Clone)]
pub struct Interaction {
    pub request: RequestMatcher,
    pub response: StubResponse,
}

impl Interaction {
    pub fn new(method: Method, path_and_query: &str, response: StubResponse) -> Self {
        Self {
            request: RequestMatcher::new(method, path_and_query),
            response,
        }
    }

    pub fn get(path_and_query: &str, response: StubResponse) -> Self {
        Self::new(Method::GET, path_and_query, response)
    }

    pub fn post(path_and_query: &str, response: StubResponse) -> Self {
        Self::new(Method::POST, path_and_query, response)
    }

    pub fn put(path_and_query: &str, response: StubResponse) -> Self {
        Self::new(Method::PUT, path_and_query, response)
    }

    pub fn patch(path_and_query: &str, response: StubResponse) -> Self {
        Self::new(Method::PATCH, path_and_query, response)
    }

    pub fn delete(path_and_query: &str, response: StubResponse) -> Self {
        Self::new(Method::DELETE, path_and_query, response)
    }
}

/// A request received by the stub
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Parses the body as JSON
    pub fn json(&self) -> Result<serde_json::Value> {
        serde_json::from_slice(&self.body).context("request body is not JSON")
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Deserialize)]
struct FixtureRequest {
    method: String,
    path: String,
}

#[derive(Debug, Deserialize)]
struct FixtureResponse {
    #[serde(default = "default_status")]
    status: u16,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    body: Option<serde_json::Value>,
    text: Option<String>,
    #[serde(default)]
    latency_ms: u64,
}

fn default_status() -> u16 {
    200
}

#[derive(Debug, Deserialize)]
struct Fixture {
    request: FixtureRequest,
    response: FixtureResponse,
}

impl TryFrom<Fixture> for Interaction {
    type Error = anyhow::Error;

    fn try_from(fixture: Fixture) -> Result<Self> {
        let method = Method::from_bytes(fixture.request.method.to_uppercase().as_bytes())
            .with_context(|| format!("invalid method {}", fixture.request.method))?;

        let response = fixture.response;
        let mut stub = match (response.body, response.text) {
            (Some(body), _) => StubResponse::json(response.status, body),
            (None, Some(text)) => StubResponse::text(response.status, text),
            (None, None) => StubResponse::empty(response.status),
        };
        for (name, value) in response.headers {
            stub = stub.with_header(name, value);
        }
        stub = stub.with_latency(Duration::from_millis(response.latency_ms));

        Ok(Interaction::new(method, &fixture.request.path, stub))
    }
}

/// Parses interactions from the JSON fixtures format
pub fn parse_fixtures(json: &str) -> Result<Vec<Interaction>> {
    let fixtures: Vec<Fixture> = serde_json::from_str(json).context("invalid fixtures JSON")?;
    fixtures.into_iter().map(Interaction::try_from).collect()
}

/// Loads interactions from a JSON fixtures file
pub fn load_fixtures(path: &Path) -> Result<Vec<Interaction>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read fixtures from {}", path.display()))?;
    parse_fixtures(&json)
}
