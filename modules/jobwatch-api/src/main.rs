use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use jobwatch_api::{feed, router, AppState};
use jobwatch_common::Config;
use jobwatch_events::EventSource;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("jobwatch=info".parse()?))
        .init();

    let config = Config::from_env()?;
    config.log_summary();

    let (events, _) = broadcast::channel(config.event_buffer);

    // Event bus → fan-out
    let reader = feed::connect(config.event_source.as_deref()).await?;
    let feeder_tx = events.clone();
    tokio::spawn(async move {
        if let Err(e) = feed::run_feed(EventSource::new(reader), feeder_tx).await {
            error!(error = %e, "Event feed failed");
        }
    });

    let state = Arc::new(AppState::new(events, config.reducer));
    let app = router(state);

    let addr = config.bind_addr();
    info!("jobwatch starting on {addr}");
    info!("Event stream available at ws://{addr}/formatted_events");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
