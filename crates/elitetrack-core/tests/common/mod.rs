use std::{sync::Arc, time::Duration};

use elitetrack_core::{
    models::{Actor, RecordId},
    params::NewProject,
    InProcessBridge, ProjectStateController, SessionState, SqliteGateway,
};
use tempfile::TempDir;

/// Helper function to create a shared store whose writes are echoed to a bridge
pub async fn create_test_store() -> (TempDir, Arc<SqliteGateway>, Arc<InProcessBridge>) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let bridge = Arc::new(InProcessBridge::new());
    let gateway = SqliteGateway::open(temp_dir.path().join("store.db"))
        .await
        .expect("Failed to open store")
        .with_bridge(bridge.clone());
    (temp_dir, Arc::new(gateway), bridge)
}

/// Helper function to open a session for `actor` against the shared store
pub async fn create_session(
    actor: Actor,
    gateway: &Arc<SqliteGateway>,
    bridge: &Arc<InProcessBridge>,
) -> ProjectStateController {
    ProjectStateController::builder()
        .with_actor(actor)
        .with_gateway(gateway.clone())
        .with_directory(gateway.clone())
        .with_push_bridge(bridge.clone())
        .build()
        .await
        .expect("Failed to build controller")
}

pub fn project_for(client_id: &RecordId, qr: &str, steps: &[&str]) -> NewProject {
    NewProject {
        client_id: client_id.clone(),
        vehicle_id: RecordId::new("veh_1"),
        qr_code: qr.to_string(),
        steps: steps.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

/// Waits until the session state satisfies `done`.
pub async fn wait_for(controller: &ProjectStateController, done: impl Fn(&SessionState) -> bool) {
    let mut rx = controller.subscribe_state();
    let _ = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| done(s)))
        .await
        .expect("Timed out waiting for state")
        .expect("State channel closed");
}
