// ── Configuration history ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HistoryAction {
    Create,
    Update,
    Delete,
    /// A raw document pushed to the control plane.
    Load,
    /// A synthesized document pushed to the control plane.
    Sync,
    Rollback,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResourceType {
    Site,
    Route,
    Redirect,
    Upstream,
    UpstreamGroup,
    TlsConfig,
    DnsProvider,
    Certificate,
    Settings,
    /// The whole control-plane document.
    Config,
}

/// One ledger row: a mutation or an apply attempt. Never edited after it
/// is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub action: HistoryAction,
    pub resource_type: ResourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,
    #[serde(default)]
    pub previous_state: Option<serde_json::Value>,
    #[serde(default)]
    pub new_state: Option<serde_json::Value>,
    /// Full document pushed to the control plane, for config entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_snapshot: Option<serde_json::Value>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Dependents removed along with the resource, restored with it on
    /// rollback.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cascade: Vec<CascadedState>,
}

/// State of one entity that went away because its parent was deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadedState {
    pub resource_type: ResourceType,
    pub state: serde_json::Value,
}

impl HistoryEntry {
    /// A successful entry stamped now.
    pub fn new(action: HistoryAction, resource_type: ResourceType) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action,
            resource_type,
            resource_id: None,
            resource_name: None,
            previous_state: None,
            new_state: None,
            config_snapshot: None,
            success: true,
            error_message: None,
            cascade: Vec::new(),
        }
    }

    pub fn with_resource(mut self, id: Option<String>, name: Option<String>) -> Self {
        self.resource_id = id;
        self.resource_name = name;
        self
    }

    pub fn with_states(
        mut self,
        previous: Option<serde_json::Value>,
        new: Option<serde_json::Value>,
    ) -> Self {
        self.previous_state = previous;
        self.new_state = new;
        self
    }

    pub fn with_cascade(mut self, cascade: Vec<CascadedState>) -> Self {
        self.cascade = cascade;
        self
    }

    pub fn failed(mut self, message: impl Into<String>) -> Self {
        self.success = false;
        self.error_message = Some(message.into());
        self
    }
}
