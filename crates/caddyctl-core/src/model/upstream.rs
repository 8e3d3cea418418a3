// ── Upstream pool domain types ──
//
// Group membership is a join relation owned by neither side: an upstream
// can sit in several groups and outlives any of them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::site::default_true;

/// One backend target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upstream {
    pub id: Uuid,
    pub name: String,
    /// Dial address, e.g. `localhost:8080`.
    pub address: String,
    /// Concurrent request cap; 0 means unlimited.
    #[serde(default)]
    pub max_requests: u32,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl Upstream {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            address: address.into(),
            max_requests: 0,
            enabled: true,
            created_at: Utc::now(),
        }
    }
}

/// A named, load-balanced pool. Reverse-proxy routes refer to it by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamGroup {
    pub id: Uuid,
    pub name: String,
    /// Selection policy name (`round_robin`, `least_conn`, ...). Empty
    /// leaves the control plane's default in place.
    #[serde(default)]
    pub load_balancing: String,
    pub created_at: DateTime<Utc>,
}

impl UpstreamGroup {
    pub fn new(name: impl Into<String>, load_balancing: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            load_balancing: load_balancing.into(),
            created_at: Utc::now(),
        }
    }
}

/// A group together with its member ids, as mutated and snapshotted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamGroupState {
    #[serde(flatten)]
    pub group: UpstreamGroup,
    #[serde(default)]
    pub members: Vec<Uuid>,
}
