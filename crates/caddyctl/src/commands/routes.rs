//! Route command handlers.

use tabled::Tabled;

use caddyctl_core::{Entity, HandlerKind, Repository, ResourceType, Route};

use crate::cli::{GlobalOpts, HandlerArg, RoutesArgs, RoutesCommand};
use crate::error::CliError;
use crate::output;

use super::sites::yes_no;
use super::{CliController, util};

#[derive(Tabled)]
struct RouteRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Order")]
    order: i32,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Methods")]
    methods: String,
    #[tabled(rename = "Handler")]
    handler: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
}

impl From<&Route> for RouteRow {
    fn from(r: &Route) -> Self {
        Self {
            id: r.id.to_string(),
            order: r.order,
            name: r.name.clone(),
            path: if r.path_matcher.is_empty() {
                "*".into()
            } else {
                r.path_matcher.clone()
            },
            methods: r.methods.join(","),
            handler: r.handler.to_string(),
            enabled: yes_no(r.enabled),
        }
    }
}

impl From<HandlerArg> for HandlerKind {
    fn from(arg: HandlerArg) -> Self {
        match arg {
            HandlerArg::StaticResponse => Self::StaticResponse,
            HandlerArg::FileServer => Self::FileServer,
            HandlerArg::ReverseProxy => Self::ReverseProxy,
            HandlerArg::Redirect => Self::Redirect,
        }
    }
}

pub async fn handle(
    controller: &CliController,
    args: RoutesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        RoutesCommand::List { site } => {
            let site = util::resolve_site(controller, &site)?;
            let routes = controller.store().routes(site.id)?;
            let out = output::render_list(
                &global.output,
                &routes,
                |r| RouteRow::from(r),
                |r| r.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        RoutesCommand::Add {
            site,
            handler,
            path,
            methods,
            config,
            order,
            name,
        } => {
            let site = util::resolve_site(controller, &site)?;
            let config = util::parse_json_arg("config", &config)?;
            if !config.is_object() {
                return Err(CliError::Validation {
                    field: "config".into(),
                    reason: "handler config must be a JSON object".into(),
                });
            }

            let mut route = Route::new(site.id, handler.into(), path, config).with_order(order);
            route.name = name;
            route.methods = methods.into_iter().map(|m| m.to_uppercase()).collect();

            let id = route.id;
            let entry = util::store_entity(controller, Entity::Route(route), global).await?;
            output::print_output(&id.to_string(), global.quiet);
            output::status(&util::mutation_status(&entry, global), global.quiet);
            Ok(())
        }

        RoutesCommand::Remove { id } => {
            let id = util::parse_uuid("route", &id)?;
            let entry = util::remove_entity(controller, ResourceType::Route, id, global).await?;
            output::status(&util::mutation_status(&entry, global), global.quiet);
            Ok(())
        }
    }
}
