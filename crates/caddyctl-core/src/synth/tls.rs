// ── TLS app passes ──
//
// Certificate loading and DNS-challenge automation are rendered
// independently of the per-site routing pass. A misconfigured provider
// only drops that site's policy.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

use crate::document::{
    Automation, AutomationPolicy, CertificateLoaders, Challenges, DnsChallenge, Issuer,
    PemCertificate, TlsApp,
};
use crate::model::{CustomCertificate, DnsProvider, Site, TlsConfig};

/// Primary CA first, ZeroSSL as fallback.
const ISSUER_MODULES: [&str; 2] = ["acme", "zerossl"];

/// Build the TLS app, or `None` when there is nothing to render.
pub(crate) fn build_tls_app(
    sites: &[&Site],
    certificates: &[CustomCertificate],
    tls_configs: &BTreeMap<Uuid, TlsConfig>,
    dns_providers: &BTreeMap<Uuid, DnsProvider>,
) -> Option<TlsApp> {
    let certificates = load_pem(certificates);
    let automation = automation(sites, tls_configs, dns_providers);

    if certificates.is_none() && automation.is_none() {
        return None;
    }
    Some(TlsApp {
        certificates,
        automation,
    })
}

fn load_pem(certificates: &[CustomCertificate]) -> Option<CertificateLoaders> {
    if certificates.is_empty() {
        return None;
    }
    Some(CertificateLoaders {
        load_pem: certificates
            .iter()
            .map(|cert| PemCertificate {
                certificate: cert.cert_pem.clone(),
                key: cert.key_pem.clone(),
                tags: vec![cert.name.clone()],
            })
            .collect(),
    })
}

fn automation(
    sites: &[&Site],
    tls_configs: &BTreeMap<Uuid, TlsConfig>,
    dns_providers: &BTreeMap<Uuid, DnsProvider>,
) -> Option<Automation> {
    let policies: Vec<AutomationPolicy> = sites
        .iter()
        .filter_map(|site| site_policy(site, tls_configs, dns_providers))
        .collect();

    (!policies.is_empty()).then_some(Automation { policies })
}

fn site_policy(
    site: &Site,
    tls_configs: &BTreeMap<Uuid, TlsConfig>,
    dns_providers: &BTreeMap<Uuid, DnsProvider>,
) -> Option<AutomationPolicy> {
    let tls = tls_configs.get(&site.id).filter(|t| t.wildcard_cert)?;
    let provider_id = tls.dns_provider_id?;
    let Some(provider) = dns_providers.get(&provider_id) else {
        warn!(site = %site.name, %provider_id, "wildcard certificate references unknown DNS provider");
        return None;
    };

    let credentials = match serde_json::from_str::<Map<String, Value>>(&provider.credentials) {
        Ok(credentials) => credentials,
        Err(e) => {
            warn!(
                site = %site.name,
                provider = %provider.name,
                error = %e,
                "skipping DNS automation policy: invalid provider credentials"
            );
            return None;
        }
    };

    // Credential fields are merged after the name, so they may override it.
    let mut config = Map::new();
    config.insert("name".into(), Value::String(provider.provider.clone()));
    config.extend(credentials);

    Some(AutomationPolicy {
        subjects: site.hosts.clone(),
        issuers: ISSUER_MODULES
            .iter()
            .map(|module| Issuer {
                module: (*module).to_owned(),
                challenges: Challenges {
                    dns: DnsChallenge {
                        provider: config.clone(),
                    },
                },
            })
            .collect(),
    })
}
