#![allow(clippy::unwrap_used)]
// Orchestrator and controller tests against a mocked admin API.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use caddyctl_api::{AdminClient, TransportConfig};
use caddyctl_core::{
    Command, Controller, CoreError, Entity, HandlerKind, HistoryAction, HistoryFilter, Ledger,
    MemoryStore, Repository, ResourceType, Route, Site, Synchronizer,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn client(uri: &str) -> AdminClient {
    AdminClient::new(uri, &TransportConfig::with_timeout(Duration::from_secs(5))).unwrap()
}

fn seeded_store() -> (Arc<MemoryStore>, Site) {
    let store = Arc::new(MemoryStore::new());
    let site = Site::new("example.com", vec!["example.com".into()]);
    store.put(Entity::Site(site.clone())).unwrap();
    (store, site)
}

async fn mount_load(server: &MockServer, status: u16, body: &str) {
    Mock::given(method("POST"))
        .and(path("/load"))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

async fn loaded_documents(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/load")
        .map(|r| r.body_json::<Value>().unwrap())
        .collect()
}

// ── Orchestrator ────────────────────────────────────────────────────

#[tokio::test]
async fn test_sync_pushes_synthesized_document() {
    let server = MockServer::start().await;
    mount_load(&server, 200, "").await;
    let (store, _) = seeded_store();
    let sync = Synchronizer::new(Arc::clone(&store), client(&server.uri()));

    let document = sync.sync().await.unwrap();

    let loads = loaded_documents(&server).await;
    assert_eq!(loads, vec![document.to_value().unwrap()]);
    assert_eq!(
        loads[0]["apps"]["http"]["servers"]["example_com"]["listen"],
        json!([":443"])
    );

    let entry = store.history(&HistoryFilter::default()).unwrap().entries[0].clone();
    assert_eq!(entry.action, HistoryAction::Sync);
    assert_eq!(entry.resource_type, ResourceType::Config);
    assert!(entry.success);
}

#[tokio::test]
async fn test_rejected_document_is_recorded_with_remote_body() {
    let server = MockServer::start().await;
    mount_load(&server, 400, "loading config: unknown module: http.handlers.nope").await;
    let (store, _) = seeded_store();
    let sync = Synchronizer::new(Arc::clone(&store), client(&server.uri()));

    let err = sync.sync().await.unwrap_err();
    assert!(
        matches!(err, CoreError::Apply { status: 400, .. }),
        "expected Apply error, got: {err:?}"
    );

    let page = store.history(&HistoryFilter::default()).unwrap();
    assert_eq!(page.total, 1);
    let entry = &page.entries[0];
    assert!(!entry.success);
    assert_eq!(
        entry.error_message.as_deref(),
        Some("loading config: unknown module: http.handlers.nope")
    );
    // Nothing was applied, so the next sync has no previous document.
    assert_eq!(store.last_applied().unwrap(), None);
}

#[tokio::test]
async fn test_unreachable_control_plane_is_recorded() {
    let (store, _) = seeded_store();
    let sync = Synchronizer::new(Arc::clone(&store), client("http://127.0.0.1:9"));

    let err = sync.sync().await.unwrap_err();
    assert!(
        matches!(err, CoreError::ConnectionFailed { ref url, .. } if url == "http://127.0.0.1:9"),
        "expected ConnectionFailed, got: {err:?}"
    );

    let entry = store.history(&HistoryFilter::default()).unwrap().entries[0].clone();
    assert!(!entry.success);
    assert!(entry.error_message.is_some());
}

#[tokio::test]
async fn test_rollback_restores_route_and_resyncs() {
    let server = MockServer::start().await;
    mount_load(&server, 200, "").await;
    let (store, site) = seeded_store();
    let sync = Synchronizer::new(Arc::clone(&store), client(&server.uri()));

    let p = Route::new(site.id, HandlerKind::StaticResponse, "/", json!({ "body": "before" }));
    let mut n = p.clone();
    n.handler_config = json!({ "body": "after" }).to_string();
    sync.upsert(Entity::Route(p.clone())).unwrap();
    let update = sync.upsert(Entity::Route(n)).unwrap();

    let rollback = sync.rollback(update.id).await.unwrap();

    assert_eq!(rollback.previous_state, update.new_state);
    assert_eq!(rollback.new_state, update.previous_state);
    assert_eq!(
        store.get(ResourceType::Route, p.id).unwrap(),
        Some(Entity::Route(p))
    );

    let loads = loaded_documents(&server).await;
    assert_eq!(loads.len(), 1);
    let handler = &loads[0]["apps"]["http"]["servers"]["example_com"]["routes"][0]["handle"][0];
    assert_eq!(handler["handler"], "static_response");
    assert_eq!(handler["body"], "before");
}

// ── Controller ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_mutation_records_entry_then_syncs() {
    let server = MockServer::start().await;
    mount_load(&server, 200, "").await;
    let (store, site) = seeded_store();
    let controller = Controller::new(Arc::clone(&store), client(&server.uri()));
    controller.start().await;
    let changes = controller.changes();

    let route = Route::new(site.id, HandlerKind::FileServer, "/", json!({ "root": "/srv" }));
    let result = controller
        .execute(Command::UpsertRoute(route.clone()))
        .await
        .unwrap();

    let entry = result.entry().unwrap();
    assert_eq!(entry.action, HistoryAction::Create);
    assert_eq!(entry.resource_id, Some(route.id.to_string()));
    assert_eq!(*changes.borrow(), 1);

    let loads = loaded_documents(&server).await;
    assert_eq!(loads.len(), 1);
    assert_eq!(
        loads[0]["apps"]["http"]["servers"]["example_com"]["routes"][0]["match"][0]["path"],
        json!(["/*"])
    );

    // Newest first: the sync, then the create.
    let history = store.history(&HistoryFilter::default()).unwrap().entries;
    let actions: Vec<HistoryAction> = history.iter().map(|e| e.action).collect();
    assert_eq!(actions, vec![HistoryAction::Sync, HistoryAction::Create]);

    controller.shutdown().await;
}

#[tokio::test]
async fn test_failed_sync_after_mutation_keeps_mutation() {
    let server = MockServer::start().await;
    mount_load(&server, 500, "boom").await;
    let (store, _) = seeded_store();
    let controller = Controller::new(Arc::clone(&store), client(&server.uri()));
    controller.start().await;

    let extra = Site::new("other.test", vec!["other.test".into()]);
    let err = controller
        .execute(Command::UpsertSite(extra.clone()))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Apply { status: 500, .. }));
    assert!(store.get(ResourceType::Site, extra.id).unwrap().is_some());
    assert_eq!(*controller.changes().borrow(), 0);

    controller.shutdown().await;
}

#[tokio::test]
async fn test_queued_syncs_are_coalesced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/load"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let (store, _) = seeded_store();
    let controller = Controller::new(Arc::clone(&store), client(&server.uri()));

    // Queue three syncs before the processor exists.
    let waiters: Vec<_> = (0..3)
        .map(|_| {
            let ctrl = controller.clone();
            tokio::spawn(async move { ctrl.sync().await })
        })
        .collect();
    tokio::time::sleep(Duration::from_millis(50)).await;

    controller.start().await;
    let mut documents = Vec::new();
    for waiter in waiters {
        documents.push(waiter.await.unwrap().unwrap());
    }

    assert_eq!(documents[0], documents[1]);
    assert_eq!(documents[1], documents[2]);
    let syncs = store
        .history(&HistoryFilter {
            action: Some(HistoryAction::Sync),
            ..HistoryFilter::default()
        })
        .unwrap();
    assert_eq!(syncs.total, 1);

    controller.shutdown().await;
}

#[tokio::test]
async fn test_controller_rollback_of_create_deletes() {
    let server = MockServer::start().await;
    mount_load(&server, 200, "").await;
    let (store, _) = seeded_store();

    let created = Site::new("temp.test", vec!["temp.test".into()]);
    let rollback = Controller::oneshot(Arc::clone(&store), client(&server.uri()), |ctrl| {
        let created = created.clone();
        async move {
            let result = ctrl.execute(Command::UpsertSite(created)).await?;
            let entry_id = result.entry().map(|e| e.id).unwrap();
            ctrl.rollback(entry_id).await
        }
    })
    .await
    .unwrap();

    assert_eq!(rollback.action, HistoryAction::Rollback);
    assert_eq!(rollback.new_state, None);
    assert_eq!(store.get(ResourceType::Site, created.id).unwrap(), None);

    let documents = loaded_documents(&server).await;
    assert_eq!(documents.len(), 2);
    assert!(
        documents[1]["apps"]["http"]["servers"]
            .get("temp_test")
            .is_none()
    );
}

#[tokio::test]
async fn test_execute_after_shutdown_is_rejected() {
    let (store, _) = seeded_store();
    let controller = Controller::new(store, client("http://127.0.0.1:9"));
    controller.start().await;
    controller.shutdown().await;

    assert!(matches!(
        controller.execute(Command::Sync).await,
        Err(CoreError::ControllerStopped)
    ));
}
