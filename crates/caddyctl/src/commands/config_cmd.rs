//! Config subcommand handlers.

use caddyctl_config::{Profile, profile_to_control_plane_config};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let out = match global.output {
                OutputFormat::Table | OutputFormat::Plain => toml::to_string_pretty(&cfg)?,
                _ => output::render_document(&global.output, &cfg)?,
            };
            output::print_output(out.trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::SetProfile {
            name,
            admin_url,
            state_file,
            default,
        } => {
            let mut cfg = config::load_config()?;
            let mut profile = cfg.profiles.get(&name).cloned().unwrap_or_default();
            if let Some(url) = admin_url {
                profile.admin_url = url;
            }
            if state_file.is_some() {
                profile.state_file = state_file;
            }
            validate(&profile, &cfg.defaults)?;

            cfg.profiles.insert(name.clone(), profile);
            if default {
                cfg.default_profile = Some(name.clone());
            }
            config::save_config(&cfg)?;

            output::status(
                &format!(
                    "Profile '{name}' saved to {}",
                    config::config_path().display()
                ),
                global.quiet,
            );
            Ok(())
        }
    }
}

fn validate(profile: &Profile, defaults: &caddyctl_config::Defaults) -> Result<(), CliError> {
    profile_to_control_plane_config(profile, defaults)?;
    Ok(())
}
