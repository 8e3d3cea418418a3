//! Global settings handlers.

use std::fmt::Write;

use caddyctl_core::{Entity, GlobalSettings, Repository, ResourceType};
use uuid::Uuid;

use crate::cli::{GlobalOpts, SettingsArgs, SettingsCommand};
use crate::error::CliError;
use crate::output;

use super::{CliController, util};

fn detail(s: &GlobalSettings) -> String {
    fn or_unset<T: ToString>(value: Option<&T>) -> String {
        value.map_or_else(|| "(unset)".into(), ToString::to_string)
    }

    let mut out = String::new();
    let _ = writeln!(out, "HTTP port:     {}", or_unset(s.http_port.as_ref()));
    let _ = writeln!(out, "HTTPS port:    {}", or_unset(s.https_port.as_ref()));
    let _ = writeln!(
        out,
        "Grace period:  {}",
        s.grace_period
            .map_or_else(|| "(unset)".into(), |secs| format!("{secs}s"))
    );
    let _ = writeln!(out, "Log level:     {}", or_unset(s.log_level.as_ref()));
    let _ = write!(out, "Admin listen:  {}", or_unset(s.admin_listen.as_ref()));
    out
}

/// `Some(0)` and `Some("")` clear a field; `None` keeps it.
fn merge<T: PartialEq + Default>(current: Option<T>, flag: Option<T>) -> Option<T> {
    match flag {
        None => current,
        Some(v) if v == T::default() => None,
        Some(v) => Some(v),
    }
}

pub async fn handle(
    controller: &CliController,
    args: SettingsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        SettingsCommand::Show => {
            let settings = controller.store().settings()?;
            let out = output::render_single(&global.output, &settings, detail, |s| {
                s.admin_listen.clone().unwrap_or_default()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SettingsCommand::Set {
            http_port,
            https_port,
            grace_period,
            log_level,
            admin_listen,
        } => {
            let current = controller.store().settings()?;
            let settings = GlobalSettings {
                http_port: merge(current.http_port, http_port),
                https_port: merge(current.https_port, https_port),
                grace_period: merge(current.grace_period, grace_period),
                log_level: merge(current.log_level, log_level),
                admin_listen: merge(current.admin_listen, admin_listen),
            };
            let entry = util::store_entity(controller, Entity::Settings(settings), global).await?;
            output::status(&util::mutation_status(&entry, global), global.quiet);
            Ok(())
        }

        SettingsCommand::Reset => {
            if !util::confirm("Reset all global settings to defaults?", global.yes)? {
                return Ok(());
            }
            let entry =
                util::remove_entity(controller, ResourceType::Settings, Uuid::nil(), global)
                    .await?;
            output::status(&util::mutation_status(&entry, global), global.quiet);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_and_empty_clear_fields() {
        assert_eq!(merge(Some(8080_u16), Some(0)), None);
        assert_eq!(merge(Some(8080_u16), None), Some(8080));
        assert_eq!(merge(None, Some(80_u16)), Some(80));
        assert_eq!(merge(Some("info".to_string()), Some(String::new())), None);
    }

    #[test]
    fn detail_marks_unset_fields() {
        let text = detail(&GlobalSettings {
            http_port: Some(80),
            ..GlobalSettings::default()
        });
        assert!(text.contains("HTTP port:     80"));
        assert!(text.contains("HTTPS port:    (unset)"));
    }
}
