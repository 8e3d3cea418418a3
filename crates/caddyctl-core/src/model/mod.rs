// ── Domain model ──
//
// Plain data records owned by the repository. The synthesis engine only
// reads them; the controller is the only writer.

pub mod history;
pub mod route;
pub mod settings;
pub mod site;
pub mod tls;
pub mod upstream;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

pub use history::{CascadedState, HistoryAction, HistoryEntry, ResourceType};
pub use route::{HandlerKind, RedirectRule, Route};
pub use settings::GlobalSettings;
pub use site::Site;
pub use tls::{CustomCertificate, DnsProvider, TlsConfig};
pub use upstream::{Upstream, UpstreamGroup, UpstreamGroupState};

/// Any entity the repository stores, tagged by resource type.
///
/// Used where a mutation or a restore is handled generically: the command
/// processor, the ledger's previous/new state snapshots and rollback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Entity {
    Site(Site),
    Route(Route),
    Redirect(RedirectRule),
    Upstream(Upstream),
    UpstreamGroup(UpstreamGroupState),
    TlsConfig(TlsConfig),
    DnsProvider(DnsProvider),
    Certificate(CustomCertificate),
    Settings(GlobalSettings),
}

impl Entity {
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Self::Site(_) => ResourceType::Site,
            Self::Route(_) => ResourceType::Route,
            Self::Redirect(_) => ResourceType::Redirect,
            Self::Upstream(_) => ResourceType::Upstream,
            Self::UpstreamGroup(_) => ResourceType::UpstreamGroup,
            Self::TlsConfig(_) => ResourceType::TlsConfig,
            Self::DnsProvider(_) => ResourceType::DnsProvider,
            Self::Certificate(_) => ResourceType::Certificate,
            Self::Settings(_) => ResourceType::Settings,
        }
    }

    /// Entity id. The settings singleton has none.
    pub fn id(&self) -> Option<Uuid> {
        match self {
            Self::Site(s) => Some(s.id),
            Self::Route(r) => Some(r.id),
            Self::Redirect(r) => Some(r.id),
            Self::Upstream(u) => Some(u.id),
            Self::UpstreamGroup(g) => Some(g.group.id),
            Self::TlsConfig(t) => Some(t.id),
            Self::DnsProvider(p) => Some(p.id),
            Self::Certificate(c) => Some(c.id),
            Self::Settings(_) => None,
        }
    }

    /// Human-readable name recorded alongside the id in the ledger.
    pub fn name(&self) -> Option<String> {
        match self {
            Self::Site(s) => Some(s.name.clone()),
            Self::Route(r) => Some(r.name.clone()),
            Self::Redirect(r) => Some(r.source.clone()),
            Self::Upstream(u) => Some(u.name.clone()),
            Self::UpstreamGroup(g) => Some(g.group.name.clone()),
            Self::TlsConfig(_) | Self::Settings(_) => None,
            Self::DnsProvider(p) => Some(p.name.clone()),
            Self::Certificate(c) => Some(c.name.clone()),
        }
    }

    /// The bare record as JSON, without the type tag.
    pub fn to_state(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Self::Site(s) => serde_json::to_value(s),
            Self::Route(r) => serde_json::to_value(r),
            Self::Redirect(r) => serde_json::to_value(r),
            Self::Upstream(u) => serde_json::to_value(u),
            Self::UpstreamGroup(g) => serde_json::to_value(g),
            Self::TlsConfig(t) => serde_json::to_value(t),
            Self::DnsProvider(p) => serde_json::to_value(p),
            Self::Certificate(c) => serde_json::to_value(c),
            Self::Settings(s) => serde_json::to_value(s),
        }
    }

    /// Rebuild an entity from a ledger state snapshot.
    ///
    /// Returns `Ok(None)` for resource types that are not entities
    /// (`config`).
    pub fn from_state(
        resource_type: ResourceType,
        state: &serde_json::Value,
    ) -> Result<Option<Self>, serde_json::Error> {
        let state = state.clone();
        Ok(Some(match resource_type {
            ResourceType::Site => Self::Site(serde_json::from_value(state)?),
            ResourceType::Route => Self::Route(serde_json::from_value(state)?),
            ResourceType::Redirect => Self::Redirect(serde_json::from_value(state)?),
            ResourceType::Upstream => Self::Upstream(serde_json::from_value(state)?),
            ResourceType::UpstreamGroup => Self::UpstreamGroup(serde_json::from_value(state)?),
            ResourceType::TlsConfig => Self::TlsConfig(serde_json::from_value(state)?),
            ResourceType::DnsProvider => Self::DnsProvider(serde_json::from_value(state)?),
            ResourceType::Certificate => Self::Certificate(serde_json::from_value(state)?),
            ResourceType::Settings => Self::Settings(serde_json::from_value(state)?),
            ResourceType::Config => return Ok(None),
        }))
    }
}

// ── Lenient decoding ─────────────────────────────────────────────────

/// Decode a list of strings stored either as a JSON array or as a
/// JSON-encoded string (`"[\"a.com\",\"b.com\"]"`).
///
/// Malformed input decodes to an empty list: a broken hosts or methods
/// column must not stop the rest of the state from loading.
pub(crate) fn lenient_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(string_list_from_value(&raw))
}

fn string_list_from_value(raw: &serde_json::Value) -> Vec<String> {
    match raw {
        serde_json::Value::Null => Vec::new(),
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_owned))
            .collect(),
        serde_json::Value::String(encoded) if encoded.trim().is_empty() => Vec::new(),
        serde_json::Value::String(encoded) => {
            match serde_json::from_str::<Vec<String>>(encoded) {
                Ok(list) => list,
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring malformed string list");
                    Vec::new()
                }
            }
        }
        other => {
            tracing::warn!(value = %other, "ignoring non-list value");
            Vec::new()
        }
    }
}
