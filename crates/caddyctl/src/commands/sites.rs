//! Site command handlers.

use chrono::Utc;
use tabled::Tabled;

use caddyctl_core::{Entity, Repository, ResourceType, Site};

use crate::cli::{GlobalOpts, SitesArgs, SitesCommand};
use crate::error::CliError;
use crate::output;

use super::{CliController, util};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct SiteRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Hosts")]
    hosts: String,
    #[tabled(rename = "Port")]
    port: u16,
    #[tabled(rename = "Auto HTTPS")]
    auto_https: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
}

impl From<&Site> for SiteRow {
    fn from(s: &Site) -> Self {
        Self {
            id: s.id.to_string(),
            name: s.name.clone(),
            hosts: s.hosts.join(", "),
            port: s.listen_port,
            auto_https: yes_no(s.auto_https),
            enabled: yes_no(s.enabled),
        }
    }
}

pub(super) fn yes_no(value: bool) -> String {
    if value { "yes" } else { "no" }.into()
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &CliController,
    args: SitesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        SitesCommand::List => {
            let sites = controller.store().sites()?;
            let out = output::render_list(
                &global.output,
                &sites,
                |s| SiteRow::from(s),
                |s| s.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SitesCommand::Add {
            name,
            hosts,
            port,
            no_auto_https,
            disabled,
        } => {
            // Same name replaces the existing site in place
            let existing = controller
                .store()
                .sites()?
                .into_iter()
                .find(|s| s.name == name);
            let mut site = match existing {
                Some(mut site) => {
                    site.hosts = hosts;
                    site.updated_at = Utc::now();
                    site
                }
                None => Site::new(name, hosts),
            };
            site.listen_port = port;
            site.auto_https = !no_auto_https;
            site.enabled = !disabled;

            let entry = util::store_entity(controller, Entity::Site(site), global).await?;
            output::status(&util::mutation_status(&entry, global), global.quiet);
            Ok(())
        }

        SitesCommand::Remove { site } => {
            let site = util::resolve_site(controller, &site)?;
            if !util::confirm(
                &format!(
                    "Delete site '{}' with its routes, redirects and TLS config?",
                    site.name
                ),
                global.yes,
            )? {
                return Ok(());
            }
            let entry =
                util::remove_entity(controller, ResourceType::Site, site.id, global).await?;
            output::status(&util::mutation_status(&entry, global), global.quiet);
            Ok(())
        }
    }
}
