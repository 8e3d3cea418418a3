//! Upstream and upstream group command handlers.

use serde::Serialize;
use tabled::Tabled;

use caddyctl_core::{
    Entity, Repository, ResourceType, Upstream, UpstreamGroup, UpstreamGroupState,
};

use crate::cli::{GlobalOpts, GroupsArgs, GroupsCommand, UpstreamsArgs, UpstreamsCommand};
use crate::error::CliError;
use crate::output;

use super::sites::yes_no;
use super::{CliController, util};

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct UpstreamRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Max Requests")]
    max_requests: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
}

impl From<&Upstream> for UpstreamRow {
    fn from(u: &Upstream) -> Self {
        Self {
            id: u.id.to_string(),
            name: u.name.clone(),
            address: u.address.clone(),
            max_requests: match u.max_requests {
                0 => "-".into(),
                n => n.to_string(),
            },
            enabled: yes_no(u.enabled),
        }
    }
}

/// A group with its members spelled out, for listing.
#[derive(Serialize)]
struct GroupView {
    #[serde(flatten)]
    group: UpstreamGroup,
    members: Vec<Upstream>,
}

#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Policy")]
    policy: String,
    #[tabled(rename = "Members")]
    members: String,
}

impl From<&GroupView> for GroupRow {
    fn from(v: &GroupView) -> Self {
        Self {
            id: v.group.id.to_string(),
            name: v.group.name.clone(),
            policy: if v.group.load_balancing.is_empty() {
                "-".into()
            } else {
                v.group.load_balancing.clone()
            },
            members: v
                .members
                .iter()
                .map(|u| u.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

// ── Upstreams ───────────────────────────────────────────────────────

pub async fn handle(
    controller: &CliController,
    args: UpstreamsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        UpstreamsCommand::List => {
            let upstreams = controller.store().upstreams()?;
            let out = output::render_list(
                &global.output,
                &upstreams,
                |u| UpstreamRow::from(u),
                |u| u.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        UpstreamsCommand::Add {
            name,
            address,
            max_requests,
        } => {
            let mut upstream = match util::resolve_upstream(controller, &name) {
                Ok(mut existing) => {
                    existing.address = address;
                    existing
                }
                Err(CliError::NotFound { .. }) => Upstream::new(name, address),
                Err(e) => return Err(e),
            };
            upstream.max_requests = max_requests;

            let entry = util::store_entity(controller, Entity::Upstream(upstream), global).await?;
            output::status(&util::mutation_status(&entry, global), global.quiet);
            Ok(())
        }

        UpstreamsCommand::Remove { upstream } => {
            let upstream = util::resolve_upstream(controller, &upstream)?;
            if !util::confirm(
                &format!(
                    "Delete upstream '{}' and remove it from every group?",
                    upstream.name
                ),
                global.yes,
            )? {
                return Ok(());
            }
            let entry =
                util::remove_entity(controller, ResourceType::Upstream, upstream.id, global)
                    .await?;
            output::status(&util::mutation_status(&entry, global), global.quiet);
            Ok(())
        }
    }
}

// ── Groups ──────────────────────────────────────────────────────────

pub async fn handle_groups(
    controller: &CliController,
    args: GroupsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        GroupsCommand::List => {
            let store = controller.store();
            let views = store
                .upstream_groups()?
                .into_iter()
                .map(|group| {
                    let members = store.group_members(group.id)?;
                    Ok(GroupView { group, members })
                })
                .collect::<Result<Vec<_>, CliError>>()?;
            let out = output::render_list(
                &global.output,
                &views,
                |v| GroupRow::from(v),
                |v| v.group.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        GroupsCommand::Add {
            name,
            policy,
            members,
        } => {
            let members = members
                .iter()
                .map(|m| util::resolve_upstream(controller, m).map(|u| u.id))
                .collect::<Result<Vec<_>, _>>()?;

            let group = match util::resolve_group(controller, &name) {
                Ok(UpstreamGroupState { mut group, .. }) => {
                    group.load_balancing = policy;
                    group
                }
                Err(CliError::NotFound { .. }) => UpstreamGroup::new(name, policy),
                Err(e) => return Err(e),
            };

            let entry = util::store_entity(
                controller,
                Entity::UpstreamGroup(UpstreamGroupState { group, members }),
                global,
            )
            .await?;
            output::status(&util::mutation_status(&entry, global), global.quiet);
            Ok(())
        }

        GroupsCommand::Remove { group } => {
            let state = util::resolve_group(controller, &group)?;
            let entry = util::remove_entity(
                controller,
                ResourceType::UpstreamGroup,
                state.group.id,
                global,
            )
            .await?;
            output::status(&util::mutation_status(&entry, global), global.quiet);
            Ok(())
        }
    }
}
