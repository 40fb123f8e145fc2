use std::net::SocketAddr;

use anyhow::Context;
use dotenvy::dotenv;
use taskhub::logging::init_tracing;
use taskhub::metrics::init_metrics;
use taskhub::router::init_router;
use taskhub::state::init_app_state;
use taskhub::tasks::spawn_cleanup_task;
use taskhub_config::ServerConfig;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing();

    let state = init_app_state().await?.with_metrics(init_metrics());

    if let Some(interval) = state.sessions.config().cleanup_interval {
        spawn_cleanup_task(state.sessions.clone(), interval);
        info!(interval_secs = interval.as_secs(), "Session cleanup task scheduled");
    }

    let server_config = ServerConfig::from_env();
    let address = server_config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    info!("Server running on http://{}", address);
    info!("Swagger UI available at http://{}/swagger-ui", address);
    info!("Scalar UI available at http://{}/scalar", address);

    let app = init_router(state);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
