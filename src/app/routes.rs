use crate::handler::health::health_handler;
use crate::handler::history::history_handler;
use crate::healthcheck::HEALTH_PATH;
use crate::snapshot::SnapshotExporter;
use axum::Router;
use axum::routing::get;

/// Build the HTTP router (health + read-only history).
pub fn main_router(exporter: SnapshotExporter, history_path: &str) -> Router {
    let v1_health_router = Router::new().route(HEALTH_PATH, get(health_handler));

    let history_router = Router::new()
        .route(history_path, get(history_handler))
        .with_state(exporter);

    Router::new().merge(v1_health_router).merge(history_router)
}
