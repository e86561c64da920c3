use crate::error::TickwatchError;
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Bind the HTTP listener.
pub async fn bind(port: u16) -> Result<TcpListener, TickwatchError> {
    let bind_addr = format!("0.0.0.0:{port}");
    TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| TickwatchError::Bind {
            address: bind_addr,
            source: e,
        })
}

/// Serve `app` on `listener` until `shutdown` is cancelled.
pub fn spawn(
    listener: TcpListener,
    app: Router,
    history_path: String,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match listener.local_addr() {
            Ok(addr) => info!("HTTP server listening on {addr}"),
            Err(e) => warn!("HTTP server listening on unknown address: {e}"),
        }
        info!("  - GET  /v1/health     (health check)");
        info!("  - GET  {history_path}  (tick history)");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
        {
            error!("HTTP server failed: {e}");
        }
        info!("HTTP server stopped");
    })
}

/// Bind and serve, or keep running without HTTP if the port is unavailable.
pub async fn serve_optional(
    app: Router,
    port: u16,
    history_path: String,
    shutdown: CancellationToken,
) -> Option<JoinHandle<()>> {
    match bind(port).await {
        Ok(listener) => Some(spawn(listener, app, history_path, shutdown)),
        Err(e) => {
            warn!("{e}; continuing without the HTTP endpoint");
            None
        }
    }
}

/// Wait for SIGTERM or SIGINT (Ctrl+C) for graceful shutdown.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT, initiating graceful shutdown"),
        () = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[tokio::test]
    #[traced_test]
    async fn test_bind_failure_continues_without_http() {
        let held = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
        let port = held.local_addr().unwrap().port();

        let handle = serve_optional(
            Router::new(),
            port,
            "/tps".to_string(),
            CancellationToken::new(),
        )
        .await;

        assert!(handle.is_none());
        assert!(logs_contain("continuing without the HTTP endpoint"));
    }

    #[tokio::test]
    async fn test_server_stops_on_shutdown() {
        let shutdown = CancellationToken::new();
        let handle = serve_optional(Router::new(), 0, "/tps".to_string(), shutdown.clone())
            .await
            .unwrap();

        shutdown.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
