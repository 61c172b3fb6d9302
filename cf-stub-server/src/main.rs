use anyhow::Result;
use cf_stub_server::StubServer;
use cf_stub_server::config::Config;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse configuration from environment variables and CLI arguments
    let config = Config::from_env_and_args()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("cf_stub_server={}", config.log_level).parse()?)
                .add_directive(format!("cf_stub={}", config.log_level).parse()?),
        )
        .init();

    let server = StubServer::from_config(&config)?;

    for mapping in &config.uaa_limits {
        tracing::info!(
            "Enforcing UAA limit {}: {} calls per {}s",
            mapping.name(),
            mapping.limit(),
            mapping.time_base()
        );
    }

    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    server.serve(listener).await
}
