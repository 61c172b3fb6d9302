//! HTTP front end of the stub server
//!
//! # Endpoints
//!
//! - `GET /healthz`: returns "OK" with 200 status
//! - `GET /metrics`: request counters in Prometheus text format
//! - anything else: recorded, checked against the UAA rate limits, then
//!   answered by the most recently registered matching interaction
//!
//! Requests over a UAA limit get `429 Too Many Requests` with a
//! `Retry-After` header. Requests without a matching interaction get a
//! Cloud Controller style `404` error body.

use crate::actor::{Decision, ThrottleActor, ThrottleHandle};
use crate::config::Config;
use crate::interaction::{Interaction, RecordedRequest, StubResponse, load_fixtures};
use crate::metrics::{Metrics, Outcome};
use anyhow::Result;
use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use bytes::Bytes;
use cf_throttle::LimiterMapping;
use parking_lot::{Mutex, RwLock};
use std::net::SocketAddr;
use std::ops::Deref;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

struct StubState {
    interactions: RwLock<Vec<Interaction>>,
    requests: Mutex<Vec<RecordedRequest>>,
    limiter: Option<ThrottleHandle>,
    metrics: Metrics,
}

/// Builder for [`StubServer`]
pub struct StubServerBuilder {
    interactions: Vec<Interaction>,
    uaa_limits: Vec<LimiterMapping>,
    buffer_size: usize,
}

impl Default for StubServerBuilder {
    fn default() -> Self {
        Self {
            interactions: Vec::new(),
            uaa_limits: Vec::new(),
            buffer_size: 1024,
        }
    }
}

impl StubServerBuilder {
    pub fn interaction(mut self, interaction: Interaction) -> Self {
        self.interactions.push(interaction);
        self
    }

    pub fn interactions(mut self, interactions: impl IntoIterator<Item = Interaction>) -> Self {
        self.interactions.extend(interactions);
        self
    }

    /// Enforce a UAA rate limit on incoming requests
    pub fn uaa_limit(mut self, mapping: LimiterMapping) -> Self {
        self.uaa_limits.push(mapping);
        self
    }

    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Build the server
    ///
    /// Must be called from within a Tokio runtime when UAA limits are set.
    pub fn build(self) -> Result<StubServer> {
        let limiter = if self.uaa_limits.is_empty() {
            None
        } else {
            Some(ThrottleActor::spawn(self.buffer_size, self.uaa_limits)?)
        };

        Ok(StubServer {
            state: Arc::new(StubState {
                interactions: RwLock::new(self.interactions),
                requests: Mutex::new(Vec::new()),
                limiter,
                metrics: Metrics::new(),
            }),
        })
    }
}

/// A stub Cloud Controller / UAA server
///
/// # Example
///
/// ```no_run
/// use cf_stub_server::{Interaction, StubResponse, StubServer};
/// use serde_json::json;
///
/// # async fn run() -> anyhow::Result<()> {
/// let stub = StubServer::builder()
///     .interaction(Interaction::get(
///         "/v2/info",
///         StubResponse::json(200, json!({ "token_endpoint": "http://localhost" })),
///     ))
///     .build()?
///     .spawn()
///     .await?;
///
/// println!("stub listening on {}", stub.url());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct StubServer {
    state: Arc<StubState>,
}

impl StubServer {
    pub fn builder() -> StubServerBuilder {
        StubServerBuilder::default()
    }

    /// Build a server from the binary's configuration, loading fixtures
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut builder = Self::builder().buffer_size(config.buffer_size);

        if let Some(path) = &config.fixtures {
            let interactions = load_fixtures(path)?;
            tracing::info!(
                "Loaded {} interactions from {}",
                interactions.len(),
                path.display()
            );
            builder = builder.interactions(interactions);
        }

        for mapping in &config.uaa_limits {
            builder = builder.uaa_limit(mapping.clone());
        }

        builder.build()
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/healthz", get(|| async { "OK" }))
            .route("/metrics", get(handle_metrics))
            .fallback(handle_request)
            .with_state(self.state.clone())
    }

    /// Serve on an already bound listener until the server fails
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        tracing::info!("Stub server listening on {}", listener.local_addr()?);
        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    /// Serve on an ephemeral local port in the background
    pub async fn spawn(self) -> Result<RunningStub> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let server = self.clone();
        let task = tokio::spawn(async move {
            if let Err(e) = server.serve(listener).await {
                tracing::error!("Stub server failed: {}", e);
            }
        });

        Ok(RunningStub {
            addr,
            server: self,
            task,
        })
    }

    /// Register an interaction; it takes precedence over earlier ones
    pub fn add_interaction(&self, interaction: Interaction) {
        self.state.interactions.write().push(interaction);
    }

    /// Every request received so far, oldest first
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }

    /// Received requests with the given method and path
    pub fn requests_to(&self, method: Method, path: &str) -> Vec<RecordedRequest> {
        self.state
            .requests
            .lock()
            .iter()
            .filter(|request| request.method == method && request.path == path)
            .cloned()
            .collect()
    }

    pub fn clear_requests(&self) {
        self.state.requests.lock().clear();
    }

    pub fn metrics(&self) -> &Metrics {
        &self.state.metrics
    }
}

/// A stub server running in the background
///
/// The server task is stopped when this value is dropped.
pub struct RunningStub {
    addr: SocketAddr,
    server: StubServer,
    task: JoinHandle<()>,
}

impl RunningStub {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Base URL such as `http://127.0.0.1:43817`
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Deref for RunningStub {
    type Target = StubServer;

    fn deref(&self) -> &StubServer {
        &self.server
    }
}

impl Drop for RunningStub {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn handle_metrics(State(state): State<Arc<StubState>>) -> String {
    let limiters = match &state.limiter {
        Some(limiter) => limiter.status().await.unwrap_or_default(),
        None => Vec::new(),
    };
    state.metrics.export_prometheus(&limiters)
}

async fn handle_request(
    State(state): State<Arc<StubState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let query = uri.query().map(str::to_string);
    tracing::debug!("{} {}", method, uri);

    state.requests.lock().push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        query: query.clone(),
        headers,
        body,
    });

    if let Some(limiter) = &state.limiter {
        match limiter.admit(path.as_str()).await {
            Ok(Decision::Allowed) => {}
            Ok(Decision::Rejected {
                limiter,
                retry_after,
            }) => {
                tracing::warn!("Rate limit {} exceeded by {} {}", limiter, method, path);
                state.metrics.record(Outcome::Rejected);
                let seconds = retry_after.as_secs_f64().ceil().max(1.0) as u64;
                let body = serde_json::json!({
                    "error": "too_many_requests",
                    "error_description": format!("Too many requests for limiter {limiter}"),
                });
                return StubResponse::json(429, body)
                    .with_header("Retry-After", seconds.to_string())
                    .into_response();
            }
            Err(e) => {
                tracing::error!("Throttle actor error: {}", e);
                return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
            }
        }
    }

    // Later registrations override earlier ones
    let matched = state
        .interactions
        .read()
        .iter()
        .rev()
        .find(|interaction| {
            interaction
                .request
                .matches(&method, &path, query.as_deref())
        })
        .map(|interaction| interaction.response.clone());

    match matched {
        Some(response) => {
            state.metrics.record(Outcome::Matched);
            if !response.latency.is_zero() {
                tokio::time::sleep(response.latency).await;
            }
            response.into_response()
        }
        None => {
            tracing::warn!("No interaction for {} {}", method, uri);
            state.metrics.record(Outcome::Unmatched);
            let body = serde_json::json!({
                "code": 10000,
                "description": format!("Unknown request {method} {uri}"),
                "error_code": "CF-NotFound",
            });
            StubResponse::json(404, body).into_response()
        }
    }
}

impl IntoResponse for StubResponse {
    fn into_response(self) -> Response {
        let mut builder = Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
            .body(Body::from(self.body))
            .unwrap_or_else(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response())
    }
}
