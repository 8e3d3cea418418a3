// ── In-memory repository + ledger ──

use std::cmp::Reverse;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use super::collection::Collection;
use super::state_file::StateFile;
use super::{HistoryFilter, HistoryPage, Ledger, Repository};
use crate::error::CoreError;
use crate::model::{
    CustomCertificate, DnsProvider, Entity, GlobalSettings, HistoryEntry, RedirectRule,
    ResourceType, Route, Site, TlsConfig, Upstream, UpstreamGroup, UpstreamGroupState,
};

/// Entity tables and history held in memory, loadable from and savable to
/// a [`StateFile`].
///
/// Tables are `DashMap`-backed and safe to share across tasks. The
/// history is a plain append-only vector.
pub struct MemoryStore {
    sites: Collection<Site>,
    routes: Collection<Route>,
    redirects: Collection<RedirectRule>,
    upstreams: Collection<Upstream>,
    groups: Collection<UpstreamGroup>,
    /// Join table: group id -> member upstream ids.
    members: DashMap<Uuid, Vec<Uuid>>,
    certificates: Collection<CustomCertificate>,
    tls_configs: Collection<TlsConfig>,
    dns_providers: Collection<DnsProvider>,
    settings: RwLock<Option<GlobalSettings>>,
    history: RwLock<Vec<HistoryEntry>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            sites: Collection::new(),
            routes: Collection::new(),
            redirects: Collection::new(),
            upstreams: Collection::new(),
            groups: Collection::new(),
            members: DashMap::new(),
            certificates: Collection::new(),
            tls_configs: Collection::new(),
            dns_providers: Collection::new(),
            settings: RwLock::new(None),
            history: RwLock::new(Vec::new()),
        }
    }

    /// Populate a store from a decoded state file.
    pub fn from_state(state: StateFile) -> Self {
        let mut store = Self::new();
        for site in state.sites {
            store.sites.upsert(site.id, site);
        }
        for route in state.routes {
            store.routes.upsert(route.id, route);
        }
        for rule in state.redirects {
            store.redirects.upsert(rule.id, rule);
        }
        for upstream in state.upstreams {
            store.upstreams.upsert(upstream.id, upstream);
        }
        for group in state.upstream_groups {
            store.members.insert(group.group.id, group.members);
            store.groups.upsert(group.group.id, group.group);
        }
        for cert in state.certificates {
            store.certificates.upsert(cert.id, cert);
        }
        for tls in state.tls_configs {
            store.tls_configs.upsert(tls.id, tls);
        }
        for provider in state.dns_providers {
            store.dns_providers.upsert(provider.id, provider);
        }
        store.settings = RwLock::new(state.settings);
        store.history = RwLock::new(state.history);
        store
    }

    /// Snapshot the whole store for persistence.
    pub fn to_state(&self) -> Result<StateFile, CoreError> {
        Ok(StateFile {
            version: StateFile::CURRENT_VERSION,
            sites: self.sites()?,
            routes: self.routes.sorted_by_key(|r| (r.site_id, r.order, r.created_at, r.id)),
            redirects: self.redirects.sorted_by_key(|r| (r.site_id, r.created_at, r.id)),
            upstreams: self.upstreams()?,
            upstream_groups: self
                .upstream_groups()?
                .into_iter()
                .map(|group| self.group_state(group))
                .collect(),
            certificates: self.certificates()?,
            tls_configs: self.tls_configs()?,
            dns_providers: self.dns_providers()?,
            settings: read(&self.settings)?.clone(),
            history: read(&self.history)?.clone(),
        })
    }

    /// Load from `path`; a missing file yields an empty store.
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        Ok(Self::from_state(StateFile::load(path)?))
    }

    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        self.to_state()?.save(path)
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn group_state(&self, group: UpstreamGroup) -> UpstreamGroupState {
        let members = self
            .members
            .get(&group.id)
            .map(|m| m.value().clone())
            .unwrap_or_default();
        UpstreamGroupState { group, members }
    }

    fn put_group(&self, state: UpstreamGroupState) -> Option<Entity> {
        let id = state.group.id;
        let previous_members = self.members.insert(id, state.members);
        self.groups.upsert(id, state.group).map(|group| {
            Entity::UpstreamGroup(UpstreamGroupState {
                group,
                members: previous_members.unwrap_or_default(),
            })
        })
    }

    fn put_tls_config(&self, tls: TlsConfig) -> Option<TlsConfig> {
        // At most one TLS config per site.
        let site_id = tls.site_id;
        let id = tls.id;
        let replaced = self
            .tls_configs
            .remove_where(|t| t.site_id == site_id && t.id != id);
        if replaced > 0 {
            debug!(%site_id, replaced, "replaced existing TLS config for site");
        }
        self.tls_configs.upsert(id, tls)
    }

    fn remove_site(&self, id: Uuid) -> Option<Site> {
        let site = self.sites.remove(id)?;
        let routes = self.routes.remove_where(|r| r.site_id == id);
        let redirects = self.redirects.remove_where(|r| r.site_id == id);
        self.tls_configs.remove_where(|t| t.site_id == id);
        debug!(site = %site.name, routes, redirects, "removed site and its children");
        Some(site)
    }

    fn remove_upstream(&self, id: Uuid) -> Option<Upstream> {
        let upstream = self.upstreams.remove(id)?;
        for mut members in self.members.iter_mut() {
            members.value_mut().retain(|m| *m != id);
        }
        Some(upstream)
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, CoreError> {
    lock.read()
        .map_err(|_| CoreError::store("state lock poisoned"))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, CoreError> {
    lock.write()
        .map_err(|_| CoreError::store("state lock poisoned"))
}

// ── Repository ───────────────────────────────────────────────────────

impl Repository for MemoryStore {
    fn sites(&self) -> Result<Vec<Site>, CoreError> {
        Ok(self.sites.sorted_by_key(|s| (s.created_at, s.id)))
    }

    fn routes(&self, site_id: Uuid) -> Result<Vec<Route>, CoreError> {
        Ok(self
            .routes
            .filtered(|r| r.site_id == site_id, |r| (r.order, r.created_at, r.id)))
    }

    fn redirects(&self, site_id: Uuid) -> Result<Vec<RedirectRule>, CoreError> {
        Ok(self.redirects.filtered(
            |r| r.site_id == site_id,
            |r| (Reverse(r.priority), Reverse(r.created_at), r.id),
        ))
    }

    fn upstreams(&self) -> Result<Vec<Upstream>, CoreError> {
        Ok(self.upstreams.sorted_by_key(|u| (u.name.clone(), u.id)))
    }

    fn upstream_groups(&self) -> Result<Vec<UpstreamGroup>, CoreError> {
        Ok(self.groups.sorted_by_key(|g| (g.name.clone(), g.id)))
    }

    fn group_members(&self, group_id: Uuid) -> Result<Vec<Upstream>, CoreError> {
        let Some(ids) = self.members.get(&group_id).map(|m| m.value().clone()) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .into_iter()
            .filter_map(|id| self.upstreams.get(id))
            .collect())
    }

    fn certificates(&self) -> Result<Vec<CustomCertificate>, CoreError> {
        Ok(self.certificates.sorted_by_key(|c| (c.name.clone(), c.id)))
    }

    fn tls_configs(&self) -> Result<Vec<TlsConfig>, CoreError> {
        Ok(self.tls_configs.sorted_by_key(|t| (t.site_id, t.id)))
    }

    fn dns_providers(&self) -> Result<Vec<DnsProvider>, CoreError> {
        Ok(self.dns_providers.sorted_by_key(|p| (p.name.clone(), p.id)))
    }

    fn settings(&self) -> Result<GlobalSettings, CoreError> {
        Ok(read(&self.settings)?.clone().unwrap_or_default())
    }

    fn get(&self, resource_type: ResourceType, id: Uuid) -> Result<Option<Entity>, CoreError> {
        Ok(match resource_type {
            ResourceType::Site => self.sites.get(id).map(Entity::Site),
            ResourceType::Route => self.routes.get(id).map(Entity::Route),
            ResourceType::Redirect => self.redirects.get(id).map(Entity::Redirect),
            ResourceType::Upstream => self.upstreams.get(id).map(Entity::Upstream),
            ResourceType::UpstreamGroup => self
                .groups
                .get(id)
                .map(|g| Entity::UpstreamGroup(self.group_state(g))),
            ResourceType::TlsConfig => self.tls_configs.get(id).map(Entity::TlsConfig),
            ResourceType::DnsProvider => self.dns_providers.get(id).map(Entity::DnsProvider),
            ResourceType::Certificate => self.certificates.get(id).map(Entity::Certificate),
            ResourceType::Settings => Some(Entity::Settings(self.settings()?)),
            ResourceType::Config => None,
        })
    }

    fn put(&self, entity: Entity) -> Result<Option<Entity>, CoreError> {
        Ok(match entity {
            Entity::Site(site) => self.sites.upsert(site.id, site).map(Entity::Site),
            Entity::Route(route) => self.routes.upsert(route.id, route).map(Entity::Route),
            Entity::Redirect(rule) => self.redirects.upsert(rule.id, rule).map(Entity::Redirect),
            Entity::Upstream(upstream) => self
                .upstreams
                .upsert(upstream.id, upstream)
                .map(Entity::Upstream),
            Entity::UpstreamGroup(state) => self.put_group(state),
            Entity::TlsConfig(tls) => self.put_tls_config(tls).map(Entity::TlsConfig),
            Entity::DnsProvider(provider) => self
                .dns_providers
                .upsert(provider.id, provider)
                .map(Entity::DnsProvider),
            Entity::Certificate(cert) => self
                .certificates
                .upsert(cert.id, cert)
                .map(Entity::Certificate),
            Entity::Settings(settings) => {
                let previous = write(&self.settings)?.replace(settings);
                Some(Entity::Settings(previous.unwrap_or_default()))
            }
        })
    }

    fn remove(&self, resource_type: ResourceType, id: Uuid) -> Result<Option<Entity>, CoreError> {
        Ok(match resource_type {
            ResourceType::Site => self.remove_site(id).map(Entity::Site),
            ResourceType::Route => self.routes.remove(id).map(Entity::Route),
            ResourceType::Redirect => self.redirects.remove(id).map(Entity::Redirect),
            ResourceType::Upstream => self.remove_upstream(id).map(Entity::Upstream),
            ResourceType::UpstreamGroup => self.groups.remove(id).map(|group| {
                let members = self.members.remove(&id).map(|(_, m)| m).unwrap_or_default();
                Entity::UpstreamGroup(UpstreamGroupState { group, members })
            }),
            ResourceType::TlsConfig => self.tls_configs.remove(id).map(Entity::TlsConfig),
            ResourceType::DnsProvider => self.dns_providers.remove(id).map(Entity::DnsProvider),
            ResourceType::Certificate => self.certificates.remove(id).map(Entity::Certificate),
            ResourceType::Settings => {
                let previous = write(&self.settings)?.take();
                Some(Entity::Settings(previous.unwrap_or_default()))
            }
            ResourceType::Config => None,
        })
    }
}

// ── Ledger ───────────────────────────────────────────────────────────

impl Ledger for MemoryStore {
    fn record(&self, entry: HistoryEntry) -> Result<(), CoreError> {
        debug!(
            action = %entry.action,
            resource_type = %entry.resource_type,
            success = entry.success,
            "recording history entry"
        );
        write(&self.history)?.push(entry);
        Ok(())
    }

    fn history(&self, filter: &HistoryFilter) -> Result<HistoryPage, CoreError> {
        let history = read(&self.history)?;
        // Stable sort keeps insertion order among equal timestamps; reverse
        // iteration makes the newest insertion come first.
        let mut matching: Vec<&HistoryEntry> =
            history.iter().rev().filter(|e| filter.matches(e)).collect();
        matching.sort_by_key(|e| Reverse(e.timestamp));

        let limit = filter.effective_limit();
        Ok(HistoryPage {
            total: matching.len(),
            entries: matching
                .into_iter()
                .skip(filter.offset)
                .take(limit)
                .cloned()
                .collect(),
            limit,
            offset: filter.offset,
        })
    }

    fn entry(&self, id: Uuid) -> Result<Option<HistoryEntry>, CoreError> {
        Ok(read(&self.history)?.iter().find(|e| e.id == id).cloned())
    }

    fn last_applied(&self) -> Result<Option<serde_json::Value>, CoreError> {
        Ok(read(&self.history)?
            .iter()
            .rev()
            .filter(|e| e.success && e.resource_type == ResourceType::Config)
            .find_map(|e| e.config_snapshot.clone()))
    }
}
