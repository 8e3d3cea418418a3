//! TLS config, DNS provider and certificate command handlers.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use caddyctl_core::{CustomCertificate, DnsProvider, Entity, Repository, ResourceType, TlsConfig};

use crate::cli::{
    CertificatesArgs, CertificatesCommand, DnsProvidersArgs, DnsProvidersCommand, GlobalOpts,
    TlsArgs, TlsCommand,
};
use crate::error::CliError;
use crate::output;

use super::sites::yes_no;
use super::{CliController, util};

// ── Views ───────────────────────────────────────────────────────────

/// A TLS config with its site and provider named.
#[derive(Serialize)]
struct TlsView {
    #[serde(flatten)]
    tls: TlsConfig,
    site: String,
    dns_provider: Option<String>,
}

#[derive(Tabled)]
struct TlsRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Site")]
    site: String,
    #[tabled(rename = "Wildcard")]
    wildcard: String,
    #[tabled(rename = "DNS Provider")]
    dns_provider: String,
}

impl From<&TlsView> for TlsRow {
    fn from(v: &TlsView) -> Self {
        Self {
            id: v.tls.id.to_string(),
            site: v.site.clone(),
            wildcard: yes_no(v.tls.wildcard_cert),
            dns_provider: v.dns_provider.clone().unwrap_or_else(|| "-".into()),
        }
    }
}

/// A DNS provider with credential values withheld.
#[derive(Serialize)]
struct DnsProviderView {
    id: Uuid,
    name: String,
    provider: String,
    credential_fields: Vec<String>,
}

impl From<&DnsProvider> for DnsProviderView {
    fn from(p: &DnsProvider) -> Self {
        let credential_fields =
            serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(&p.credentials)
                .map(|fields| fields.keys().cloned().collect())
                .unwrap_or_default();
        Self {
            id: p.id,
            name: p.name.clone(),
            provider: p.provider.clone(),
            credential_fields,
        }
    }
}

#[derive(Tabled)]
struct DnsProviderRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Provider")]
    provider: String,
    #[tabled(rename = "Credentials")]
    credential_fields: String,
}

impl From<&DnsProviderView> for DnsProviderRow {
    fn from(v: &DnsProviderView) -> Self {
        Self {
            id: v.id.to_string(),
            name: v.name.clone(),
            provider: v.provider.clone(),
            credential_fields: v.credential_fields.join(", "),
        }
    }
}

/// A certificate without its PEM material.
#[derive(Serialize)]
struct CertificateView {
    id: Uuid,
    name: String,
    domains: Vec<String>,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<&CustomCertificate> for CertificateView {
    fn from(c: &CustomCertificate) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            domains: c.domains.clone(),
            expires_at: c.expires_at,
            created_at: c.created_at,
        }
    }
}

#[derive(Tabled)]
struct CertificateRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Domains")]
    domains: String,
    #[tabled(rename = "Expires")]
    expires_at: String,
}

impl From<&CertificateView> for CertificateRow {
    fn from(v: &CertificateView) -> Self {
        Self {
            id: v.id.to_string(),
            name: v.name.clone(),
            domains: v.domains.join(", "),
            expires_at: v
                .expires_at
                .map_or_else(|| "-".into(), |t| t.format("%Y-%m-%d").to_string()),
        }
    }
}

// ── TLS configs ─────────────────────────────────────────────────────

pub async fn handle(
    controller: &CliController,
    args: TlsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        TlsCommand::List => {
            let store = controller.store();
            let sites = store.sites()?;
            let providers = store.dns_providers()?;
            let views: Vec<TlsView> = store
                .tls_configs()?
                .into_iter()
                .map(|tls| TlsView {
                    site: sites
                        .iter()
                        .find(|s| s.id == tls.site_id)
                        .map_or_else(|| tls.site_id.to_string(), |s| s.name.clone()),
                    dns_provider: tls.dns_provider_id.map(|id| {
                        providers
                            .iter()
                            .find(|p| p.id == id)
                            .map_or_else(|| id.to_string(), |p| p.name.clone())
                    }),
                    tls,
                })
                .collect();
            let out = output::render_list(
                &global.output,
                &views,
                |v| TlsRow::from(v),
                |v| v.tls.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        TlsCommand::Set {
            site,
            wildcard,
            dns_provider,
        } => {
            let site = util::resolve_site(controller, &site)?;
            let provider_id = dns_provider
                .map(|p| util::resolve_dns_provider(controller, &p).map(|p| p.id))
                .transpose()?;

            // One config per site; an existing one keeps its id
            let mut tls =
                util::tls_config_of(controller, &site)?.unwrap_or_else(|| TlsConfig::new(site.id));
            tls.wildcard_cert = wildcard;
            tls.dns_provider_id = provider_id;

            let entry = util::store_entity(controller, Entity::TlsConfig(tls), global).await?;
            output::status(&util::mutation_status(&entry, global), global.quiet);
            Ok(())
        }

        TlsCommand::Remove { site } => {
            let site = util::resolve_site(controller, &site)?;
            let tls = util::tls_config_of(controller, &site)?
                .ok_or_else(|| CliError::not_found("tls_config", &site.name, "tls list"))?;
            let entry =
                util::remove_entity(controller, ResourceType::TlsConfig, tls.id, global).await?;
            output::status(&util::mutation_status(&entry, global), global.quiet);
            Ok(())
        }
    }
}

// ── DNS providers ───────────────────────────────────────────────────

pub async fn handle_dns_providers(
    controller: &CliController,
    args: DnsProvidersArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        DnsProvidersCommand::List => {
            let views: Vec<DnsProviderView> = controller
                .store()
                .dns_providers()?
                .iter()
                .map(DnsProviderView::from)
                .collect();
            let out = output::render_list(
                &global.output,
                &views,
                |v| DnsProviderRow::from(v),
                |v| v.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DnsProvidersCommand::Add {
            name,
            provider,
            credentials,
        } => {
            let credentials = match util::parse_json_arg("credentials", &credentials)? {
                value @ serde_json::Value::Object(_) => value.to_string(),
                _ => {
                    return Err(CliError::Validation {
                        field: "credentials".into(),
                        reason: "must be a JSON object".into(),
                    });
                }
            };

            let dns = match util::resolve_dns_provider(controller, &name) {
                Ok(mut existing) => {
                    existing.provider = provider;
                    existing.credentials = credentials;
                    existing
                }
                Err(CliError::NotFound { .. }) => DnsProvider::new(name, provider, credentials),
                Err(e) => return Err(e),
            };

            let entry = util::store_entity(controller, Entity::DnsProvider(dns), global).await?;
            output::status(&util::mutation_status(&entry, global), global.quiet);
            Ok(())
        }

        DnsProvidersCommand::Remove { provider } => {
            let provider = util::resolve_dns_provider(controller, &provider)?;
            let entry =
                util::remove_entity(controller, ResourceType::DnsProvider, provider.id, global)
                    .await?;
            output::status(&util::mutation_status(&entry, global), global.quiet);
            Ok(())
        }
    }
}

// ── Certificates ────────────────────────────────────────────────────

pub async fn handle_certificates(
    controller: &CliController,
    args: CertificatesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        CertificatesCommand::List => {
            let views: Vec<CertificateView> = controller
                .store()
                .certificates()?
                .iter()
                .map(CertificateView::from)
                .collect();
            let out = output::render_list(
                &global.output,
                &views,
                |v| CertificateRow::from(v),
                |v| v.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CertificatesCommand::Add {
            name,
            cert,
            key,
            domains,
        } => {
            let (cert_pem, key_pem) = read_pem_pair(&cert, &key)?;
            let certificate = match util::resolve_certificate(controller, &name) {
                Ok(mut existing) => {
                    existing.cert_pem = cert_pem;
                    existing.key_pem = key_pem;
                    existing.domains = domains;
                    existing
                }
                Err(CliError::NotFound { .. }) => {
                    let mut fresh = CustomCertificate::new(name, cert_pem, key_pem);
                    fresh.domains = domains;
                    fresh
                }
                Err(e) => return Err(e),
            };

            let entry =
                util::store_entity(controller, Entity::Certificate(certificate), global).await?;
            output::status(&util::mutation_status(&entry, global), global.quiet);
            Ok(())
        }

        CertificatesCommand::Remove { certificate } => {
            let certificate = util::resolve_certificate(controller, &certificate)?;
            if !util::confirm(
                &format!("Delete certificate '{}'?", certificate.name),
                global.yes,
            )? {
                return Ok(());
            }
            let entry = util::remove_entity(
                controller,
                ResourceType::Certificate,
                certificate.id,
                global,
            )
            .await?;
            output::status(&util::mutation_status(&entry, global), global.quiet);
            Ok(())
        }
    }
}

/// Read a certificate chain and private key, checking both hold PEM blocks
/// of the right kind.
fn read_pem_pair(cert: &Path, key: &Path) -> Result<(String, String), CliError> {
    let cert_pem = std::fs::read_to_string(cert)?;
    let key_pem = std::fs::read_to_string(key)?;
    check_pem_pair(&cert_pem, &key_pem)?;
    Ok((cert_pem, key_pem))
}

fn check_pem_pair(cert_pem: &str, key_pem: &str) -> Result<(), CliError> {
    let certs = rustls_pemfile::certs(&mut cert_pem.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| invalid_pem("cert", &e.to_string()))?;
    if certs.is_empty() {
        return Err(invalid_pem("cert", "no CERTIFICATE block found"));
    }

    match rustls_pemfile::private_key(&mut key_pem.as_bytes()) {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(invalid_pem("key", "no private key block found")),
        Err(e) => Err(invalid_pem("key", &e.to_string())),
    }
}

fn invalid_pem(field: &str, reason: &str) -> CliError {
    CliError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}
