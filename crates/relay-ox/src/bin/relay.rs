use anyhow::Context;
use clap::Parser;
use relay_ox::{AppState, RelayConfig};
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "relay_ox=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RelayConfig::parse();
    let addr = config.bind_addr();
    let state = AppState::from_config(&config);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(
        %addr,
        model = %config.model,
        max_output_tokens = config.max_output_tokens,
        stream_limit = ?config.stream_limit(),
        "server running on http://{addr}"
    );

    relay_ox::serve(listener, state).await?;
    Ok(())
}
