//! Redirect rule command handlers.

use tabled::Tabled;

use caddyctl_core::{Entity, RedirectRule, Repository, ResourceType};

use crate::cli::{GlobalOpts, RedirectsArgs, RedirectsCommand};
use crate::error::CliError;
use crate::output;

use super::sites::yes_no;
use super::{CliController, util};

#[derive(Tabled)]
struct RedirectRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Priority")]
    priority: i32,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Destination")]
    destination: String,
    #[tabled(rename = "Code")]
    code: u16,
    #[tabled(rename = "Enabled")]
    enabled: String,
}

impl From<&RedirectRule> for RedirectRow {
    fn from(r: &RedirectRule) -> Self {
        Self {
            id: r.id.to_string(),
            priority: r.priority,
            source: r.source.clone(),
            destination: r.destination.clone(),
            code: r.code,
            enabled: yes_no(r.enabled),
        }
    }
}

pub async fn handle(
    controller: &CliController,
    args: RedirectsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        RedirectsCommand::List { site } => {
            let site = util::resolve_site(controller, &site)?;
            let rules = controller.store().redirects(site.id)?;
            let out = output::render_list(
                &global.output,
                &rules,
                |r| RedirectRow::from(r),
                |r| r.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        RedirectsCommand::Add {
            site,
            source,
            destination,
            code,
            priority,
        } => {
            if !(300..400).contains(&code) {
                return Err(CliError::Validation {
                    field: "code".into(),
                    reason: format!("{code} is not a redirect status"),
                });
            }
            let site = util::resolve_site(controller, &site)?;
            let rule = RedirectRule::new(site.id, source, destination, code, priority);

            let id = rule.id;
            let entry = util::store_entity(controller, Entity::Redirect(rule), global).await?;
            output::print_output(&id.to_string(), global.quiet);
            output::status(&util::mutation_status(&entry, global), global.quiet);
            Ok(())
        }

        RedirectsCommand::Remove { id } => {
            let id = util::parse_uuid("redirect", &id)?;
            let entry =
                util::remove_entity(controller, ResourceType::Redirect, id, global).await?;
            output::status(&util::mutation_status(&entry, global), global.quiet);
            Ok(())
        }
    }
}
