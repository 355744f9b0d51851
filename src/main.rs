use std::sync::Arc;

use pizza_dispatch::api::rest::router;
use pizza_dispatch::config::Config;
use pizza_dispatch::engine::scheduler::spawn_scheduler;
use pizza_dispatch::error::AppError;
use pizza_dispatch::state::AppState;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false);
    if config.log_json {
        subscriber.json().init();
    } else {
        subscriber.compact().init();
    }

    let shared_state = Arc::new(AppState::new(config.event_buffer_size));
    let app = router(shared_state.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = spawn_scheduler(shared_state.clone(), config.scheduler_interval(), shutdown_rx);

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    let _ = shutdown_tx.send(true);
    if let Err(err) = scheduler.await {
        tracing::error!(error = %err, "scheduler task failed");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
