// ── Command API ──
//
// All writes flow through a unified `Command` enum. The controller runs
// them one at a time on its command task; every entity mutation is
// followed by a sync.

use uuid::Uuid;

use crate::document::Document;
use crate::error::CoreError;
use crate::model::{
    CustomCertificate, DnsProvider, Entity, GlobalSettings, HistoryEntry, RedirectRule,
    ResourceType, Route, Site, TlsConfig, Upstream, UpstreamGroup,
};

/// A command envelope sent through the command channel.
/// Contains the command and a oneshot response channel.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: tokio::sync::oneshot::Sender<Result<CommandResult, CoreError>>,
}

/// All write operations the controller accepts.
#[derive(Debug, Clone)]
pub enum Command {
    // ── Sites ────────────────────────────────────────────────────────
    UpsertSite(Site),
    DeleteSite { id: Uuid },

    // ── Routing ──────────────────────────────────────────────────────
    UpsertRoute(Route),
    DeleteRoute { id: Uuid },
    UpsertRedirect(RedirectRule),
    DeleteRedirect { id: Uuid },

    // ── Upstreams ────────────────────────────────────────────────────
    UpsertUpstream(Upstream),
    DeleteUpstream { id: Uuid },
    /// Replace a group and its full member list.
    UpsertUpstreamGroup {
        group: UpstreamGroup,
        members: Vec<Uuid>,
    },
    DeleteUpstreamGroup { id: Uuid },

    // ── TLS ──────────────────────────────────────────────────────────
    UpsertTlsConfig(TlsConfig),
    DeleteTlsConfig { id: Uuid },
    UpsertDnsProvider(DnsProvider),
    DeleteDnsProvider { id: Uuid },
    UpsertCertificate(CustomCertificate),
    DeleteCertificate { id: Uuid },

    // ── Settings ─────────────────────────────────────────────────────
    UpdateSettings(GlobalSettings),
    ResetSettings,

    // ── Control plane ────────────────────────────────────────────────
    /// Synthesize and apply the current state.
    Sync,
    /// Apply a raw document as-is.
    Load { document: serde_json::Value },
    /// Undo one history entry.
    Rollback { entry_id: Uuid },
}

impl Command {
    /// The delete command for `resource_type`. `None` for `config`, which is
    /// not an entity.
    pub fn delete(resource_type: ResourceType, id: Uuid) -> Option<Self> {
        let cmd = match resource_type {
            ResourceType::Site => Self::DeleteSite { id },
            ResourceType::Route => Self::DeleteRoute { id },
            ResourceType::Redirect => Self::DeleteRedirect { id },
            ResourceType::Upstream => Self::DeleteUpstream { id },
            ResourceType::UpstreamGroup => Self::DeleteUpstreamGroup { id },
            ResourceType::TlsConfig => Self::DeleteTlsConfig { id },
            ResourceType::DnsProvider => Self::DeleteDnsProvider { id },
            ResourceType::Certificate => Self::DeleteCertificate { id },
            ResourceType::Settings => Self::ResetSettings,
            ResourceType::Config => return None,
        };
        Some(cmd)
    }
}

/// The upsert command for an entity.
impl From<Entity> for Command {
    fn from(entity: Entity) -> Self {
        match entity {
            Entity::Site(site) => Self::UpsertSite(site),
            Entity::Route(route) => Self::UpsertRoute(route),
            Entity::Redirect(rule) => Self::UpsertRedirect(rule),
            Entity::Upstream(upstream) => Self::UpsertUpstream(upstream),
            Entity::UpstreamGroup(state) => Self::UpsertUpstreamGroup {
                group: state.group,
                members: state.members,
            },
            Entity::TlsConfig(tls) => Self::UpsertTlsConfig(tls),
            Entity::DnsProvider(provider) => Self::UpsertDnsProvider(provider),
            Entity::Certificate(cert) => Self::UpsertCertificate(cert),
            Entity::Settings(settings) => Self::UpdateSettings(settings),
        }
    }
}

/// Result of a command execution.
#[derive(Debug, Clone)]
pub enum CommandResult {
    /// The document a sync applied.
    Synced(Box<Document>),
    /// The ledger entry a mutation, load or rollback recorded.
    Entry(Box<HistoryEntry>),
}

impl CommandResult {
    pub fn entry(&self) -> Option<&HistoryEntry> {
        match self {
            Self::Entry(entry) => Some(entry),
            Self::Synced(_) => None,
        }
    }
}
