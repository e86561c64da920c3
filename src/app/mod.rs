mod routes;
pub mod server;
mod state;
pub mod tracing;

use crate::config::{self, Command};
use crate::error::TickwatchError;
use crate::feed::FeedDriver;
use crate::notify::spawn_dispatcher;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

pub use routes::main_router;

/// Application entry point. Initializes tracing and configuration, serves the
/// history endpoint and drives the monitor from stdin.
pub async fn run() -> Result<(), TickwatchError> {
    let settings = config::get_configuration()?;

    // Handle healthcheck subcommand (for Docker healthcheck in distroless image)
    if settings.command == Some(Command::Healthcheck) {
        match crate::healthcheck_with_port(settings.http_port).await {
            Ok(()) => std::process::exit(0),
            Err(e) => {
                eprintln!("Healthcheck failed: {e}");
                std::process::exit(1)
            }
        }
    }

    tracing::init_tracing(settings.log_level);
    ::tracing::info!(
        capacity = settings.history_capacity,
        drop_threshold = settings.drop_threshold,
        "Loaded settings"
    );

    let shutdown_token = CancellationToken::new();
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        server::shutdown_signal().await;
        signal_token.cancel();
    });

    let state = state::AppState::from_settings(&settings)?;
    let dispatcher = spawn_dispatcher(state.notifier, state.notifications_rx);

    let app = main_router(state.monitor.exporter(), &settings.http_path);
    let http = server::serve_optional(
        app,
        settings.http_port,
        settings.http_path.clone(),
        shutdown_token.child_token(),
    )
    .await;

    let mut driver = FeedDriver::new(
        state.monitor,
        state.notifications_tx,
        &settings.round_end_event,
    );
    let stats = match driver
        .run(BufReader::new(tokio::io::stdin()), shutdown_token.clone())
        .await
    {
        Ok(stats) => stats,
        Err(e) => {
            ::tracing::error!("Feed read failed, stopping ingestion: {e}");
            driver.stats()
        }
    };
    ::tracing::info!(
        ticks = stats.ticks,
        log_lines = stats.log_lines,
        events = stats.events,
        drops = stats.drops,
        exports = stats.exports,
        "Ingestion finished"
    );

    // Dropping the driver closes the channel so the dispatcher can drain and exit
    let exporter = driver.monitor().exporter();
    drop(driver);
    if let Err(e) = dispatcher.await {
        ::tracing::error!("Notification dispatcher failed: {e}");
    }

    if let Some(handle) = http {
        ::tracing::info!(
            records = exporter.len(),
            "Serving final history until shutdown"
        );
        if let Err(e) = handle.await {
            ::tracing::error!("HTTP server task failed: {e}");
        }
    }

    ::tracing::info!("Shutdown complete");
    Ok(())
}
