//! Offline synthesis preview.

use caddyctl_core::CoreError;
use caddyctl_core::synth::build_server;

use crate::cli::{GlobalOpts, RenderArgs};
use crate::error::CliError;
use crate::output;

use super::{CliController, util};

pub fn handle(
    controller: &CliController,
    args: RenderArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let sync = controller.synchronizer();

    let out = match args.site {
        None => output::render_document(&global.output, &sync.render()?)?,
        Some(identifier) => {
            let site = util::resolve_site(controller, &identifier)?;
            if !site.enabled {
                return Err(CliError::Validation {
                    field: "site".into(),
                    reason: format!("site '{}' is disabled and renders nothing", site.name),
                });
            }
            let server =
                build_server(&site, &sync.snapshot()?).map_err(CoreError::from)?;
            output::render_document(&global.output, &server)?
        }
    };

    output::print_output(&out, global.quiet);
    Ok(())
}
