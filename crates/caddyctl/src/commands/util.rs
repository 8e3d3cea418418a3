//! Shared helpers for command handlers.

use std::path::Path;

use uuid::Uuid;

use caddyctl_core::{
    Command as CoreCommand, CommandResult, CustomCertificate, DnsProvider, Entity, HistoryEntry,
    Repository, ResourceType, Site, TlsConfig, Upstream, UpstreamGroupState,
};

use crate::cli::GlobalOpts;
use crate::error::CliError;

use super::CliController;

// ── Identifier resolution ────────────────────────────────────────────

/// Parse a UUID argument.
pub fn parse_uuid(field: &str, value: &str) -> Result<Uuid, CliError> {
    Uuid::parse_str(value).map_err(|e| CliError::Validation {
        field: field.into(),
        reason: format!("'{value}' is not a UUID: {e}"),
    })
}

/// Resolve a site by ID or name.
pub fn resolve_site(controller: &CliController, identifier: &str) -> Result<Site, CliError> {
    controller
        .store()
        .sites()?
        .into_iter()
        .find(|s| s.id.to_string() == identifier || s.name == identifier)
        .ok_or_else(|| CliError::not_found("site", identifier, "sites list"))
}

/// Resolve an upstream by ID or name.
pub fn resolve_upstream(
    controller: &CliController,
    identifier: &str,
) -> Result<Upstream, CliError> {
    controller
        .store()
        .upstreams()?
        .into_iter()
        .find(|u| u.id.to_string() == identifier || u.name == identifier)
        .ok_or_else(|| CliError::not_found("upstream", identifier, "upstreams list"))
}

/// Resolve an upstream group by ID or name, with its member list.
pub fn resolve_group(
    controller: &CliController,
    identifier: &str,
) -> Result<UpstreamGroupState, CliError> {
    let group = controller
        .store()
        .upstream_groups()?
        .into_iter()
        .find(|g| g.id.to_string() == identifier || g.name == identifier)
        .ok_or_else(|| CliError::not_found("upstream_group", identifier, "groups list"))?;
    let members = controller
        .store()
        .group_members(group.id)?
        .into_iter()
        .map(|u| u.id)
        .collect();
    Ok(UpstreamGroupState { group, members })
}

/// Resolve a DNS provider by ID or name.
pub fn resolve_dns_provider(
    controller: &CliController,
    identifier: &str,
) -> Result<DnsProvider, CliError> {
    controller
        .store()
        .dns_providers()?
        .into_iter()
        .find(|p| p.id.to_string() == identifier || p.name == identifier)
        .ok_or_else(|| CliError::not_found("dns_provider", identifier, "dns-providers list"))
}

/// Resolve a certificate by ID or name.
pub fn resolve_certificate(
    controller: &CliController,
    identifier: &str,
) -> Result<CustomCertificate, CliError> {
    controller
        .store()
        .certificates()?
        .into_iter()
        .find(|c| c.id.to_string() == identifier || c.name == identifier)
        .ok_or_else(|| CliError::not_found("certificate", identifier, "certificates list"))
}

/// The TLS config of a site, if it has one.
pub fn tls_config_of(controller: &CliController, site: &Site) -> Result<Option<TlsConfig>, CliError> {
    Ok(controller
        .store()
        .tls_configs()?
        .into_iter()
        .find(|t| t.site_id == site.id))
}

// ── Mutations ────────────────────────────────────────────────────────

/// Store an entity. Pushes a fresh document unless `--no-sync` was given.
pub async fn store_entity(
    controller: &CliController,
    entity: Entity,
    global: &GlobalOpts,
) -> Result<HistoryEntry, CliError> {
    if global.no_sync {
        return Ok(controller.synchronizer().upsert(entity)?);
    }
    entry_of(controller.execute(CoreCommand::from(entity)).await?)
}

/// Delete an entity. Pushes a fresh document unless `--no-sync` was given.
pub async fn remove_entity(
    controller: &CliController,
    resource_type: ResourceType,
    id: Uuid,
    global: &GlobalOpts,
) -> Result<HistoryEntry, CliError> {
    if global.no_sync {
        return Ok(controller.synchronizer().delete(resource_type, id)?);
    }
    let cmd = CoreCommand::delete(resource_type, id).ok_or_else(|| CliError::Validation {
        field: "type".into(),
        reason: format!("{resource_type} cannot be deleted"),
    })?;
    entry_of(controller.execute(cmd).await?)
}

fn entry_of(result: CommandResult) -> Result<HistoryEntry, CliError> {
    match result {
        CommandResult::Entry(entry) => Ok(*entry),
        CommandResult::Synced(_) => Err(CliError::Internal(
            "mutation answered without a history entry".into(),
        )),
    }
}

/// One status line for a finished mutation.
pub fn mutation_status(entry: &HistoryEntry, global: &GlobalOpts) -> String {
    let what = match &entry.resource_name {
        Some(name) if !name.is_empty() => format!("{} '{name}'", entry.resource_type),
        _ => entry.resource_type.to_string(),
    };
    let tail = if global.no_sync { " (not synced)" } else { "" };
    format!("{what}: {}{tail}", entry.action)
}

// ── Prompts and input ────────────────────────────────────────────────

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|_| CliError::NonInteractiveRequiresYes {
            action: message.into(),
        })
}

/// Parse a JSON argument, naming the flag on failure.
pub fn parse_json_arg(field: &str, raw: &str) -> Result<serde_json::Value, CliError> {
    serde_json::from_str(raw).map_err(|e| CliError::Validation {
        field: field.into(),
        reason: format!("invalid JSON: {e}"),
    })
}

/// Read and parse a JSON file.
pub fn read_json_file(path: &Path) -> Result<serde_json::Value, CliError> {
    let contents = std::fs::read_to_string(path)?;
    parse_json_arg(&path.display().to_string(), &contents)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_uuid_names_the_field() {
        match parse_uuid("route", "nope").unwrap_err() {
            CliError::Validation { field, .. } => assert_eq!(field, "route"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(parse_uuid("route", &Uuid::nil().to_string()).is_ok());
    }

    #[test]
    fn json_args_must_parse() {
        assert!(parse_json_arg("config", "{\"a\":1}").is_ok());
        assert!(matches!(
            parse_json_arg("config", "{"),
            Err(CliError::Validation { .. })
        ));
    }

    #[test]
    fn yes_flag_skips_the_prompt() {
        assert!(confirm("Delete everything?", true).unwrap());
    }
}
