use axum::Router;
use docpipe_core::AppConfig;
use std::net::SocketAddr;

/// Bind and serve the application router.
pub async fn start_server(config: &AppConfig, router: Router) -> Result<(), anyhow::Error> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(address = %addr, environment = %config.environment, "docpipe API listening");

    axum::serve(listener, router).await?;

    Ok(())
}
