// ── Global settings ──

use serde::{Deserialize, Serialize};

/// Document-root settings.
///
/// A single value rather than a table row: when nothing has been stored the
/// default applies, and the default emits nothing, leaving the control
/// plane's own defaults in force. Zero ports and a zero grace period are
/// treated as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalSettings {
    pub http_port: Option<u16>,
    pub https_port: Option<u16>,
    /// Graceful shutdown window in seconds.
    pub grace_period: Option<u64>,
    /// Level for the default logger (`debug`, `info`, ...).
    pub log_level: Option<String>,
    /// Admin listener address, e.g. `localhost:2019`.
    pub admin_listen: Option<String>,
}
