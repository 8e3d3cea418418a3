// ── Synchronization orchestrator ──
//
// Pull a snapshot from the repository, synthesize, push the document as a
// full replace, and record the attempt. Also hosts the ledger glue for
// entity mutations and rollback, since both end in the same apply path.
//
// Nothing here serializes concurrent calls: two overlapping syncs may
// interleave and the last full replace wins. `Controller` is the
// single-flight front door.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::control_plane::ControlPlane;
use crate::document::Document;
use crate::error::CoreError;
use crate::model::{CascadedState, Entity, HistoryAction, HistoryEntry, ResourceType};
use crate::store::{Ledger, Repository};
use crate::synth::{Snapshot, synthesize};

/// Orchestrates synthesis, apply and history for one store and one
/// control plane.
pub struct Synchronizer<S, C> {
    store: Arc<S>,
    plane: C,
}

impl<S, C> Synchronizer<S, C>
where
    S: Repository + Ledger,
    C: ControlPlane,
{
    pub fn new(store: Arc<S>, plane: C) -> Self {
        Self { store, plane }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn control_plane(&self) -> &C {
        &self.plane
    }

    // ── Synthesis ────────────────────────────────────────────────────

    /// Read everything the engine needs: enabled sites with their enabled
    /// routes and redirects, every upstream group with its members, the
    /// settings, certificates, TLS configs and DNS providers.
    pub fn snapshot(&self) -> Result<Snapshot, CoreError> {
        let mut snapshot = Snapshot {
            settings: self.store.settings()?,
            certificates: self.store.certificates()?,
            ..Snapshot::default()
        };

        let sites = self.store.enabled_sites()?;
        for site in &sites {
            let routes = self.store.routes(site.id)?;
            snapshot
                .routes
                .insert(site.id, routes.into_iter().filter(|r| r.enabled).collect());
            let redirects = self.store.redirects(site.id)?;
            snapshot
                .redirects
                .insert(site.id, redirects.into_iter().filter(|r| r.enabled).collect());
        }
        snapshot.sites = sites;

        for group in self.store.upstream_groups()? {
            let members = self.store.group_members(group.id)?;
            snapshot.group_upstreams.insert(group.name.clone(), members);
            snapshot.upstream_groups.insert(group.name.clone(), group);
        }
        snapshot.tls_configs = self
            .store
            .tls_configs()?
            .into_iter()
            .map(|t| (t.site_id, t))
            .collect();
        snapshot.dns_providers = self
            .store
            .dns_providers()?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        Ok(snapshot)
    }

    /// Synthesize the document for the current state without applying it.
    pub fn render(&self) -> Result<Document, CoreError> {
        Ok(synthesize(&self.snapshot()?)?)
    }

    // ── Apply ────────────────────────────────────────────────────────

    /// Synthesize and apply the current state.
    ///
    /// A synthesis failure applies and records nothing. An apply attempt is
    /// always recorded, with `success = false` and the remote body when the
    /// control plane rejects it.
    pub async fn sync(&self) -> Result<Document, CoreError> {
        let document = self.render()?;
        let value = encode(&document)?;
        self.apply(
            &value,
            HistoryEntry::new(HistoryAction::Sync, ResourceType::Config),
        )
        .await?;
        Ok(document)
    }

    /// Apply an arbitrary document and record it as a `load`.
    pub async fn load_document(&self, document: &Value) -> Result<HistoryEntry, CoreError> {
        self.apply(
            document,
            HistoryEntry::new(HistoryAction::Load, ResourceType::Config),
        )
        .await
    }

    async fn apply(
        &self,
        document: &Value,
        mut entry: HistoryEntry,
    ) -> Result<HistoryEntry, CoreError> {
        if entry.action != HistoryAction::Rollback {
            let previous = self.store.last_applied()?;
            entry = entry.with_states(previous, Some(document.clone()));
        }
        entry.config_snapshot = Some(document.clone());

        let outcome = match self.plane.load(document).await {
            Ok(resp) if resp.is_ok() => Ok(()),
            Ok(resp) => Err(CoreError::Apply {
                status: resp.status.as_u16(),
                body: resp.text().into_owned(),
            }),
            Err(e) => Err(self.transport_error(e)),
        };

        match &outcome {
            Ok(()) => info!(action = %entry.action, "configuration applied"),
            Err(e) => {
                warn!(action = %entry.action, error = %e, "configuration apply failed");
                entry = entry.failed(e.ledger_message());
            }
        }
        self.store.record(entry.clone())?;
        outcome.map(|()| entry)
    }

    fn transport_error(&self, err: caddyctl_api::Error) -> CoreError {
        match CoreError::from(err) {
            CoreError::ConnectionFailed { reason, .. } => CoreError::ConnectionFailed {
                url: self.plane.endpoint(),
                reason,
            },
            other => other,
        }
    }

    // ── Entity mutations ─────────────────────────────────────────────

    /// Insert or replace an entity and record a `create`/`update` entry.
    /// Does not sync.
    pub fn upsert(&self, entity: Entity) -> Result<HistoryEntry, CoreError> {
        let new_state = entity.to_state()?;
        let resource_type = entity.resource_type();
        let id = entity.id();
        let name = entity.name();

        let previous = self.store.put(entity)?;
        let action = match (&previous, resource_type) {
            (_, ResourceType::Settings) | (Some(_), _) => HistoryAction::Update,
            (None, _) => HistoryAction::Create,
        };
        let previous_state = previous.as_ref().map(Entity::to_state).transpose()?;

        let entry = HistoryEntry::new(action, resource_type)
            .with_resource(id.map(|id| id.to_string()), name)
            .with_states(previous_state, Some(new_state));
        self.store.record(entry.clone())?;
        Ok(entry)
    }

    /// Delete an entity and record a `delete` entry. Does not sync.
    ///
    /// A site takes its routes, redirects and TLS config with it; their
    /// states ride along in the entry's `cascade`.
    pub fn delete(&self, resource_type: ResourceType, id: Uuid) -> Result<HistoryEntry, CoreError> {
        let cascade = self.dependents(resource_type, id)?;
        let removed = self
            .store
            .remove(resource_type, id)?
            .ok_or_else(|| CoreError::not_found(resource_type.as_ref(), id))?;

        let entry = HistoryEntry::new(HistoryAction::Delete, resource_type)
            .with_resource(removed.id().map(|id| id.to_string()), removed.name())
            .with_states(Some(removed.to_state()?), None)
            .with_cascade(cascade);
        self.store.record(entry.clone())?;
        Ok(entry)
    }

    /// Entities the store removes together with `resource_type`/`id`.
    fn dependents(
        &self,
        resource_type: ResourceType,
        id: Uuid,
    ) -> Result<Vec<CascadedState>, CoreError> {
        if resource_type != ResourceType::Site {
            return Ok(Vec::new());
        }
        let routes = self.store.routes(id)?.into_iter().map(Entity::Route);
        let redirects = self.store.redirects(id)?.into_iter().map(Entity::Redirect);
        let tls = self
            .store
            .tls_configs()?
            .into_iter()
            .filter(|t| t.site_id == id)
            .map(Entity::TlsConfig);

        routes
            .chain(redirects)
            .chain(tls)
            .map(|entity| -> Result<CascadedState, CoreError> {
                Ok(CascadedState {
                    resource_type: entity.resource_type(),
                    state: entity.to_state()?,
                })
            })
            .collect()
    }

    // ── Rollback ─────────────────────────────────────────────────────

    /// Undo history entry `entry_id`.
    ///
    /// A config entry reapplies its document snapshot (or its previous
    /// state when it has none). An entity entry restores the previous
    /// state, or deletes the entity when there was none, then re-syncs.
    /// The recorded `rollback` entry carries the target's states swapped.
    pub async fn rollback(&self, entry_id: Uuid) -> Result<HistoryEntry, CoreError> {
        let target = self
            .store
            .entry(entry_id)?
            .ok_or_else(|| CoreError::not_found("history entry", entry_id))?;

        let rollback = HistoryEntry::new(HistoryAction::Rollback, target.resource_type)
            .with_resource(target.resource_id.clone(), target.resource_name.clone())
            .with_states(target.new_state.clone(), target.previous_state.clone());

        if target.resource_type == ResourceType::Config {
            let document = target
                .config_snapshot
                .as_ref()
                .or(target.previous_state.as_ref())
                .ok_or_else(|| CoreError::InvalidSnapshot {
                    message: format!("history entry {entry_id} has no document to reapply"),
                })?
                .clone();
            info!(%entry_id, "reapplying recorded document");
            return self.apply(&document, rollback).await;
        }

        let cascade = self.restore(&target)?;
        let rollback = rollback.with_cascade(cascade);
        self.store.record(rollback.clone())?;
        info!(
            %entry_id,
            resource_type = %target.resource_type,
            "entity restored, re-syncing"
        );
        self.sync().await?;
        Ok(rollback)
    }

    /// Put the target's previous state back, dependents included, or remove
    /// the entity when it had none. Returns the dependents that moved.
    fn restore(&self, target: &HistoryEntry) -> Result<Vec<CascadedState>, CoreError> {
        if let Some(state) = &target.previous_state {
            self.store.put(restorable(target.resource_type, state)?)?;
            for child in &target.cascade {
                self.store.put(restorable(child.resource_type, &child.state)?)?;
            }
            return Ok(target.cascade.clone());
        }

        let id = target
            .resource_id
            .as_deref()
            .and_then(|id| id.parse::<Uuid>().ok())
            .ok_or_else(|| CoreError::InvalidSnapshot {
                message: format!(
                    "history entry {} has neither a previous state nor a resource id",
                    target.id
                ),
            })?;
        let cascade = self.dependents(target.resource_type, id)?;
        self.store.remove(target.resource_type, id)?;
        Ok(cascade)
    }
}

fn restorable(resource_type: ResourceType, state: &Value) -> Result<Entity, CoreError> {
    Entity::from_state(resource_type, state)?.ok_or_else(|| CoreError::InvalidSnapshot {
        message: format!("{resource_type} is not a restorable entity"),
    })
}

fn encode(document: &Document) -> Result<Value, CoreError> {
    document
        .to_value()
        .map_err(|e| CoreError::Internal(format!("cannot encode document: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::future::Future;
    use std::sync::Mutex;

    use caddyctl_api::{ApiResponse, StatusCode};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::model::{HandlerKind, RedirectRule, Route, Site, TlsConfig};
    use crate::store::{HistoryFilter, MemoryStore};

    /// Answers every load with a fixed status and records the documents.
    struct FakePlane {
        status: StatusCode,
        body: &'static str,
        loads: Mutex<Vec<Value>>,
    }

    impl FakePlane {
        fn answering(status: StatusCode, body: &'static str) -> Self {
            Self {
                status,
                body,
                loads: Mutex::new(Vec::new()),
            }
        }

        fn loads(&self) -> Vec<Value> {
            self.loads.lock().unwrap().clone()
        }
    }

    impl ControlPlane for FakePlane {
        fn load(
            &self,
            document: &Value,
        ) -> impl Future<Output = Result<ApiResponse, caddyctl_api::Error>> + Send {
            self.loads.lock().unwrap().push(document.clone());
            let resp = ApiResponse::new(self.status, self.body);
            async move { Ok(resp) }
        }

        fn endpoint(&self) -> String {
            "fake://control-plane".into()
        }
    }

    fn setup(status: StatusCode, body: &'static str) -> (Synchronizer<MemoryStore, FakePlane>, Site) {
        let store = Arc::new(MemoryStore::new());
        let sync = Synchronizer::new(store, FakePlane::answering(status, body));
        let site = Site::new("example.com", vec!["example.com".into()]);
        sync.store().put(Entity::Site(site.clone())).unwrap();
        (sync, site)
    }

    fn all_history(sync: &Synchronizer<MemoryStore, FakePlane>) -> Vec<HistoryEntry> {
        sync.store()
            .history(&HistoryFilter::default())
            .unwrap()
            .entries
    }

    #[tokio::test]
    async fn sync_applies_and_records_document() {
        let (sync, _) = setup(StatusCode::OK, "");

        let document = sync.sync().await.unwrap();
        let value = document.to_value().unwrap();
        assert_eq!(sync.control_plane().loads(), vec![value.clone()]);

        let history = all_history(&sync);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, HistoryAction::Sync);
        assert!(history[0].success);
        assert_eq!(history[0].config_snapshot, Some(value.clone()));
        assert_eq!(history[0].new_state, Some(value));
        assert_eq!(history[0].previous_state, None);
    }

    #[tokio::test]
    async fn second_sync_records_previous_document() {
        let (sync, _) = setup(StatusCode::OK, "");
        let first = sync.sync().await.unwrap().to_value().unwrap();
        sync.sync().await.unwrap();

        let history = all_history(&sync);
        assert_eq!(history[0].previous_state, Some(first));
    }

    #[tokio::test]
    async fn apply_failure_is_recorded_and_returned() {
        let (sync, _) = setup(StatusCode::INTERNAL_SERVER_ERROR, "loading new config: boom");

        let err = sync.sync().await.unwrap_err();
        assert!(matches!(err, CoreError::Apply { status: 500, .. }));

        let history = all_history(&sync);
        assert_eq!(history.len(), 1);
        assert!(!history[0].success);
        assert_eq!(
            history[0].error_message.as_deref(),
            Some("loading new config: boom")
        );
        assert!(history[0].config_snapshot.is_some());
    }

    #[tokio::test]
    async fn synthesis_failure_applies_nothing() {
        let (sync, site) = setup(StatusCode::OK, "");
        let mut bad = Route::new(site.id, HandlerKind::StaticResponse, "/", json!({}));
        bad.handler_config = "[]".into();
        sync.store().put(Entity::Route(bad)).unwrap();

        assert!(matches!(sync.sync().await, Err(CoreError::Synthesis(_))));
        assert!(sync.control_plane().loads().is_empty());
        assert!(all_history(&sync).is_empty());
    }

    #[tokio::test]
    async fn upsert_records_create_then_update() {
        let (sync, site) = setup(StatusCode::OK, "");
        let route = Route::new(site.id, HandlerKind::StaticResponse, "/", json!({ "body": "a" }));

        let created = sync.upsert(Entity::Route(route.clone())).unwrap();
        assert_eq!(created.action, HistoryAction::Create);
        assert_eq!(created.previous_state, None);

        let mut changed = route.clone();
        changed.handler_config = json!({ "body": "b" }).to_string();
        let updated = sync.upsert(Entity::Route(changed.clone())).unwrap();
        assert_eq!(updated.action, HistoryAction::Update);
        assert_eq!(
            updated.previous_state,
            Some(serde_json::to_value(&route).unwrap())
        );
        assert_eq!(
            updated.new_state,
            Some(serde_json::to_value(&changed).unwrap())
        );
        assert_eq!(updated.resource_id, Some(route.id.to_string()));
    }

    #[tokio::test]
    async fn rollback_restores_previous_entity_state() {
        let (sync, site) = setup(StatusCode::OK, "");
        let p = Route::new(site.id, HandlerKind::StaticResponse, "/", json!({ "body": "P" }));
        let mut n = p.clone();
        n.handler_config = json!({ "body": "N" }).to_string();

        sync.upsert(Entity::Route(p.clone())).unwrap();
        let entry = sync.upsert(Entity::Route(n.clone())).unwrap();

        let rollback = sync.rollback(entry.id).await.unwrap();
        assert_eq!(rollback.action, HistoryAction::Rollback);
        assert_eq!(rollback.previous_state, entry.new_state);
        assert_eq!(rollback.new_state, entry.previous_state);
        assert_eq!(
            sync.store().get(ResourceType::Route, p.id).unwrap(),
            Some(Entity::Route(p))
        );

        // The restore is followed by a sync of the whole document.
        let loads = sync.control_plane().loads();
        assert_eq!(loads.len(), 1);
        assert_eq!(
            loads[0]["apps"]["http"]["servers"]["example_com"]["routes"][0]["handle"][0]["body"],
            "P"
        );
    }

    #[tokio::test]
    async fn rollback_of_create_deletes_entity() {
        let (sync, site) = setup(StatusCode::OK, "");
        let route = Route::new(site.id, HandlerKind::FileServer, "/", json!({}));
        let entry = sync.upsert(Entity::Route(route.clone())).unwrap();

        sync.rollback(entry.id).await.unwrap();
        assert_eq!(sync.store().get(ResourceType::Route, route.id).unwrap(), None);
    }

    #[tokio::test]
    async fn rollback_of_delete_recreates_entity() {
        let (sync, site) = setup(StatusCode::OK, "");
        let entry = sync.delete(ResourceType::Site, site.id).unwrap();
        assert_eq!(sync.store().get(ResourceType::Site, site.id).unwrap(), None);

        sync.rollback(entry.id).await.unwrap();
        assert_eq!(
            sync.store().get(ResourceType::Site, site.id).unwrap(),
            Some(Entity::Site(site))
        );
    }

    #[tokio::test]
    async fn rollback_of_site_delete_brings_back_its_children() {
        let (sync, site) = setup(StatusCode::OK, "");
        let route = Route::new(site.id, HandlerKind::StaticResponse, "/", json!({ "body": "hi" }));
        let rule = RedirectRule::new(site.id, "/old", "/new", 301, 0);
        let tls = TlsConfig::new(site.id);
        sync.upsert(Entity::Route(route.clone())).unwrap();
        sync.upsert(Entity::Redirect(rule.clone())).unwrap();
        sync.upsert(Entity::TlsConfig(tls.clone())).unwrap();

        let entry = sync.delete(ResourceType::Site, site.id).unwrap();
        assert_eq!(entry.cascade.len(), 3);
        assert!(sync.store().routes(site.id).unwrap().is_empty());

        let rollback = sync.rollback(entry.id).await.unwrap();
        assert_eq!(rollback.cascade, entry.cascade);
        assert_eq!(sync.store().routes(site.id).unwrap(), vec![route]);
        assert_eq!(sync.store().redirects(site.id).unwrap(), vec![rule]);
        assert_eq!(sync.store().tls_configs().unwrap(), vec![tls]);

        let loads = sync.control_plane().loads();
        let routes = &loads[0]["apps"]["http"]["servers"]["example_com"]["routes"];
        assert_eq!(routes.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn undoing_a_site_restore_cascades_again() {
        let (sync, site) = setup(StatusCode::OK, "");
        let route = Route::new(site.id, HandlerKind::FileServer, "/", json!({}));
        sync.upsert(Entity::Route(route)).unwrap();
        let deleted = sync.delete(ResourceType::Site, site.id).unwrap();
        let restored = sync.rollback(deleted.id).await.unwrap();

        let redeleted = sync.rollback(restored.id).await.unwrap();
        assert_eq!(redeleted.cascade.len(), 1);
        assert!(sync.store().routes(site.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn rollback_of_config_entry_reapplies_snapshot() {
        let (sync, _) = setup(StatusCode::OK, "");
        let old = json!({ "apps": { "http": { "servers": { "old": { "listen": [":80"] } } } } });
        let entry = sync.load_document(&old).await.unwrap();
        sync.sync().await.unwrap();

        let rollback = sync.rollback(entry.id).await.unwrap();
        assert_eq!(rollback.resource_type, ResourceType::Config);
        assert_eq!(rollback.config_snapshot, Some(old.clone()));
        assert_eq!(sync.control_plane().loads().last(), Some(&old));
    }

    #[tokio::test]
    async fn delete_of_missing_entity_is_not_found() {
        let (sync, _) = setup(StatusCode::OK, "");
        assert!(matches!(
            sync.delete(ResourceType::Route, Uuid::new_v4()),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn rollback_of_unknown_entry_is_not_found() {
        let (sync, _) = setup(StatusCode::OK, "");
        assert!(matches!(
            sync.rollback(Uuid::new_v4()).await,
            Err(CoreError::NotFound { .. })
        ));
    }
}
