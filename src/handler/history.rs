use crate::domain::TickRecord;
use crate::snapshot::SnapshotExporter;
use axum::Json;
use axum::extract::State;
use tracing::debug;

/// Handler for GET on the configured history path.
///
/// Returns every retained record as a JSON array, oldest first.
pub async fn history_handler(State(exporter): State<SnapshotExporter>) -> Json<Vec<TickRecord>> {
    let records = exporter.export();
    debug!("Serving history snapshot with {} records", records.len());
    Json(records)
}
