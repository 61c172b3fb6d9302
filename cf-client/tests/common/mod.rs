#![allow(dead_code)]

use async_trait::async_trait;
use cf_client::{
    CloudFoundryClient, ConnectionContext, DopplerClient, LimiterMapping, Result,
    StaticTokenProvider, TokenProvider, UaaClient,
};
use cf_stub_server::{Interaction, RunningStub, StubServer};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

pub const TOKEN: &str = "test-access-token";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub async fn stub(interactions: Vec<Interaction>) -> RunningStub {
    init_tracing();
    StubServer::builder()
        .interactions(interactions)
        .build()
        .unwrap()
        .spawn()
        .await
        .unwrap()
}

/// A stub that enforces `limits` the way a UAA server does
pub async fn limited_stub(
    interactions: Vec<Interaction>,
    limits: Vec<LimiterMapping>,
) -> RunningStub {
    init_tracing();
    let mut builder = StubServer::builder().interactions(interactions);
    for limit in limits {
        builder = builder.uaa_limit(limit);
    }
    builder.build().unwrap().spawn().await.unwrap()
}

pub fn context(stub: &RunningStub, limits: Vec<LimiterMapping>) -> ConnectionContext {
    let mut builder = ConnectionContext::builder()
        .api_host(stub.host())
        .port(stub.port())
        .secure(false);
    for limit in limits {
        builder = builder.uaa_limit(limit);
    }
    builder.build().unwrap()
}

pub fn token_provider() -> Arc<dyn TokenProvider> {
    Arc::new(StaticTokenProvider::new(TOKEN).unwrap())
}

pub fn cloud_foundry(stub: &RunningStub) -> CloudFoundryClient {
    CloudFoundryClient::new(context(stub, Vec::new()), token_provider())
}

pub fn uaa(stub: &RunningStub, limits: Vec<LimiterMapping>) -> UaaClient {
    UaaClient::with_root(
        context(stub, limits),
        Url::parse(&stub.url()).unwrap(),
        token_provider(),
    )
}

pub fn doppler(stub: &RunningStub) -> DopplerClient {
    DopplerClient::with_root(
        context(stub, Vec::new()),
        Url::parse(&stub.url()).unwrap(),
        token_provider(),
    )
}

/// Hands out a fixed token and counts invalidations
#[derive(Debug, Default)]
pub struct CountingTokenProvider {
    pub invalidations: AtomicUsize,
}

#[async_trait]
impl TokenProvider for CountingTokenProvider {
    async fn token(&self, _context: &ConnectionContext) -> Result<String> {
        Ok(TOKEN.to_string())
    }

    async fn invalidate(&self, _context: &ConnectionContext) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }
}
