// ── Repository and ledger ──
//
// The relational store is an external collaborator; these traits are the
// narrow surface the orchestrator needs from it. `MemoryStore` is the
// bundled implementation, persisted as a single JSON state file.

mod collection;
mod memory;
mod state_file;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{
    CustomCertificate, DnsProvider, Entity, GlobalSettings, HistoryAction, HistoryEntry,
    RedirectRule, ResourceType, Route, Site, TlsConfig, Upstream, UpstreamGroup,
};

pub use memory::MemoryStore;
pub use state_file::StateFile;

/// Default page size for history listings.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Read/write access to the entity tables.
///
/// List methods return records in a stable order: sites by creation time,
/// routes by order key, redirects by priority (highest first), the rest by
/// name.
pub trait Repository: Send + Sync {
    fn sites(&self) -> Result<Vec<Site>, CoreError>;
    fn routes(&self, site_id: Uuid) -> Result<Vec<Route>, CoreError>;
    fn redirects(&self, site_id: Uuid) -> Result<Vec<RedirectRule>, CoreError>;
    fn upstreams(&self) -> Result<Vec<Upstream>, CoreError>;
    fn upstream_groups(&self) -> Result<Vec<UpstreamGroup>, CoreError>;
    /// Member upstreams of a group, enabled or not.
    fn group_members(&self, group_id: Uuid) -> Result<Vec<Upstream>, CoreError>;
    fn certificates(&self) -> Result<Vec<CustomCertificate>, CoreError>;
    fn tls_configs(&self) -> Result<Vec<TlsConfig>, CoreError>;
    fn dns_providers(&self) -> Result<Vec<DnsProvider>, CoreError>;
    /// The settings value, or its default when none has been stored.
    fn settings(&self) -> Result<GlobalSettings, CoreError>;

    /// Fetch one entity. Always `Some` for settings, `None` for `config`.
    fn get(&self, resource_type: ResourceType, id: Uuid) -> Result<Option<Entity>, CoreError>;
    /// Insert or replace; returns the previous value.
    fn put(&self, entity: Entity) -> Result<Option<Entity>, CoreError>;
    /// Delete; returns the removed value. Deleting a site also deletes its
    /// routes, redirects and TLS config. Deleting settings resets them.
    fn remove(&self, resource_type: ResourceType, id: Uuid) -> Result<Option<Entity>, CoreError>;

    /// Convenience: all sites that are enabled.
    fn enabled_sites(&self) -> Result<Vec<Site>, CoreError> {
        Ok(self.sites()?.into_iter().filter(|s| s.enabled).collect())
    }
}

/// Append-only history of mutations and apply attempts.
pub trait Ledger: Send + Sync {
    fn record(&self, entry: HistoryEntry) -> Result<(), CoreError>;
    /// Newest first, filtered and paginated.
    fn history(&self, filter: &HistoryFilter) -> Result<HistoryPage, CoreError>;
    fn entry(&self, id: Uuid) -> Result<Option<HistoryEntry>, CoreError>;

    /// Both entries, for a side-by-side diff.
    fn compare(&self, a: Uuid, b: Uuid) -> Result<(HistoryEntry, HistoryEntry), CoreError> {
        let first = self
            .entry(a)?
            .ok_or_else(|| CoreError::not_found("history entry", a))?;
        let second = self
            .entry(b)?
            .ok_or_else(|| CoreError::not_found("history entry", b))?;
        Ok((first, second))
    }

    /// The document from the newest successful apply, if any.
    fn last_applied(&self) -> Result<Option<serde_json::Value>, CoreError>;
}

/// History query. `limit` of `None` means [`DEFAULT_HISTORY_LIMIT`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryFilter {
    pub resource_type: Option<ResourceType>,
    pub resource_id: Option<String>,
    pub action: Option<HistoryAction>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl HistoryFilter {
    pub fn matches(&self, entry: &HistoryEntry) -> bool {
        self.resource_type.is_none_or(|t| entry.resource_type == t)
            && self.action.is_none_or(|a| entry.action == a)
            && self
                .resource_id
                .as_deref()
                .is_none_or(|id| entry.resource_id.as_deref() == Some(id))
    }

    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_HISTORY_LIMIT)
    }
}

/// One page of history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPage {
    pub entries: Vec<HistoryEntry>,
    /// Matching entries before pagination.
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}
