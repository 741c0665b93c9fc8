mod api;
mod config;
mod engine;
mod error;
mod history;
mod models;
mod notify;
mod observability;
mod state;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use crate::notify::dispatcher::Dispatcher;
use crate::notify::transport::ChannelTransport;
use crate::notify::worker::run_dispatch_worker;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    let config = config::Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let (app_state, outbox_rx) =
        state::AppState::new(config.outbox_queue_size, config.push_feed_buffer);
    let shared_state = Arc::new(app_state);

    let app = api::rest::router(shared_state.clone());

    let transport = Arc::new(ChannelTransport::new(shared_state.push_feed_tx.clone()));
    let dispatcher = Dispatcher::new(
        transport,
        Duration::from_millis(config.notify_retry_delay_ms),
    );
    tokio::spawn(run_dispatch_worker(
        shared_state.clone(),
        outbox_rx,
        dispatcher,
    ));

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| error::AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| error::AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
