// ── Site domain type ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One logical virtual host plus its port binding.
///
/// Hosts and ports are not checked for collisions across sites; duplicate
/// bindings are passed through and left for the control plane to reject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: Uuid,
    /// Also names the rendered server block (dots become underscores).
    pub name: String,
    /// Hostnames the site answers for, in operator order.
    #[serde(default, deserialize_with = "super::lenient_string_list")]
    pub hosts: Vec<String>,
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    /// When `false`, automatic HTTPS is explicitly disabled for the server.
    #[serde(default = "default_true")]
    pub auto_https: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Site {
    /// A new enabled site on port 443 with automatic HTTPS.
    pub fn new(name: impl Into<String>, hosts: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            hosts,
            listen_port: default_listen_port(),
            auto_https: true,
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Name of the server block this site renders into.
    pub fn server_name(&self) -> String {
        self.name.replace('.', "_")
    }
}

fn default_listen_port() -> u16 {
    443
}

pub(crate) fn default_true() -> bool {
    true
}
