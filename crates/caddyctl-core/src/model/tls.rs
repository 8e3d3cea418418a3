// ── TLS domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An uploaded certificate/key pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomCertificate {
    pub id: Uuid,
    pub name: String,
    /// Domains parsed from the certificate itself.
    #[serde(default)]
    pub domains: Vec<String>,
    pub cert_pem: String,
    pub key_pem: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl CustomCertificate {
    pub fn new(
        name: impl Into<String>,
        cert_pem: impl Into<String>,
        key_pem: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            domains: Vec::new(),
            cert_pem: cert_pem.into(),
            key_pem: key_pem.into(),
            expires_at: None,
            created_at: Utc::now(),
        }
    }
}

/// Per-site certificate automation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsConfig {
    pub id: Uuid,
    pub site_id: Uuid,
    /// Request a wildcard certificate through a DNS challenge.
    #[serde(default)]
    pub wildcard_cert: bool,
    #[serde(default)]
    pub dns_provider_id: Option<Uuid>,
}

impl TlsConfig {
    pub fn new(site_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            site_id,
            wildcard_cert: false,
            dns_provider_id: None,
        }
    }

    /// Wildcard issuance through the given DNS provider.
    pub fn wildcard(site_id: Uuid, dns_provider_id: Uuid) -> Self {
        Self {
            wildcard_cert: true,
            dns_provider_id: Some(dns_provider_id),
            ..Self::new(site_id)
        }
    }
}

/// DNS provider used for ACME DNS-01 challenges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsProvider {
    pub id: Uuid,
    pub name: String,
    /// Provider module name, e.g. `cloudflare`.
    pub provider: String,
    /// JSON object of provider-specific credential fields, stored as text.
    #[serde(default)]
    pub credentials: String,
}

impl DnsProvider {
    pub fn new(
        name: impl Into<String>,
        provider: impl Into<String>,
        credentials: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            provider: provider.into(),
            credentials: credentials.into(),
        }
    }
}
