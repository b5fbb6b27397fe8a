//! Storyloop proxy server entry point.

use std::error::Error;
use std::net::SocketAddr;

use storyloop_api::config::ProxyConfig;
use storyloop_api::routes;
use storyloop_api::state::AppState;
use storyloop_api::telemetry;
use storyloop_api::upstream::UpstreamClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Read configuration from environment.
    let config = ProxyConfig::from_env()?;

    let tracer_provider = telemetry::init(config.otlp_endpoint.as_deref())?;

    tracing::info!(upstream = %config.upstream_url, "Starting storyloop proxy server");

    // Build application state.
    let upstream = UpstreamClient::new(&config.upstream_url, config.upstream_timeout)?;
    let app = routes::app(AppState::new(upstream));

    // Start server.
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| format!("invalid HOST:PORT combination: {e}"))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    telemetry::shutdown(tracer_provider);
    served?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
