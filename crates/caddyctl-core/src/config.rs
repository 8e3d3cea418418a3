// ── Runtime control-plane configuration ──
//
// Describes how to reach the admin API. Never touches disk: the CLI
// builds a `ControlPlaneConfig` from its profile and hands it in.

use std::time::Duration;

use caddyctl_api::{AdminClient, TlsMode, TransportConfig};
use url::Url;

use crate::error::CoreError;

/// Connection settings for one admin endpoint.
#[derive(Debug, Clone)]
pub struct ControlPlaneConfig {
    /// Admin API base URL (e.g. `http://localhost:2019`).
    pub url: Url,
    /// Per-request timeout.
    pub timeout: Duration,
    /// TLS verification for HTTPS admin endpoints.
    pub tls: TlsMode,
}

impl ControlPlaneConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(url: Url) -> Self {
        Self {
            url,
            timeout: Self::DEFAULT_TIMEOUT,
            tls: TlsMode::System,
        }
    }

    /// Build an admin client with this config's transport settings.
    pub fn client(&self) -> Result<AdminClient, CoreError> {
        let transport = TransportConfig {
            tls: self.tls.clone(),
            timeout: self.timeout,
        };
        Ok(AdminClient::new(self.url.as_str(), &transport)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn client_uses_configured_url() {
        let config = ControlPlaneConfig::new("http://127.0.0.1:2019/".parse().unwrap());
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.client().unwrap().base_url(), "http://127.0.0.1:2019");
    }
}
