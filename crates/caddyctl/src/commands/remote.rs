//! Raw admin API handlers.
//!
//! Everything here talks to the running server directly and bypasses the
//! state file. The one exception is `load`, which goes through the
//! controller so the push is recorded like any other apply. Adapted input
//! is converted with `/adapt` first and loaded as the resulting JSON.

use caddyctl_api::{AdminClient, ApiResponse, ConfigFormat, UpstreamStatus};
use caddyctl_core::{Command as CoreCommand, ControlPlane};
use serde::Deserialize;
use tabled::Tabled;

use crate::cli::{AdapterArg, GlobalOpts, RemoteArgs, RemoteCommand};
use crate::error::CliError;
use crate::output;

use super::{CliController, util};

#[derive(Tabled)]
struct UpstreamStatusRow {
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Requests")]
    num_requests: u64,
    #[tabled(rename = "Fails")]
    fails: u64,
}

impl From<&UpstreamStatus> for UpstreamStatusRow {
    fn from(u: &UpstreamStatus) -> Self {
        Self {
            address: u.address.clone(),
            num_requests: u.num_requests,
            fails: u.fails,
        }
    }
}

impl From<AdapterArg> for ConfigFormat {
    fn from(arg: AdapterArg) -> Self {
        match arg {
            AdapterArg::Caddyfile => Self::Caddyfile,
            AdapterArg::Json5 => Self::Json5,
            AdapterArg::Yaml => Self::Yaml,
            AdapterArg::Nginx => Self::Nginx,
        }
    }
}

/// Non-200 answers become [`CliError::Rejected`] with the body verbatim.
fn accept(resp: ApiResponse) -> Result<ApiResponse, CliError> {
    if resp.is_ok() {
        Ok(resp)
    } else {
        Err(CliError::Rejected {
            status: resp.status.as_u16(),
            body: resp.text().into_owned(),
        })
    }
}

/// Body of a successful `/adapt` call.
#[derive(Deserialize)]
struct Adapted {
    result: serde_json::Value,
    #[serde(default)]
    warnings: Vec<serde_json::Value>,
}

/// Convert `text` to a JSON document through the server's adapter.
async fn adapt_document(
    client: &AdminClient,
    text: &str,
    format: ConfigFormat,
) -> Result<serde_json::Value, CliError> {
    let adapted: Adapted = accept(client.adapt(text, format).await?)?.json()?;
    for warning in &adapted.warnings {
        tracing::warn!(%warning, "adapter warning");
    }
    Ok(adapted.result)
}

/// Print a response body: JSON in the chosen format, anything else as-is.
fn print_body(resp: &ApiResponse, global: &GlobalOpts) -> Result<(), CliError> {
    if resp.body.is_empty() {
        return Ok(());
    }
    let out = match serde_json::from_slice::<serde_json::Value>(&resp.body) {
        Ok(value) => output::render_document(&global.output, &value)?,
        Err(_) => resp.text().into_owned(),
    };
    output::print_output(&out, global.quiet);
    Ok(())
}

#[allow(clippy::too_many_lines)]
pub async fn handle(
    controller: &CliController,
    args: RemoteArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let client: &AdminClient = controller.synchronizer().control_plane();

    match args.command {
        RemoteCommand::Get { path } => {
            let resp = accept(client.get_config(&path).await?)?;
            print_body(&resp, global)
        }

        RemoteCommand::Set { path, value } => {
            let value = util::parse_json_arg("value", &value)?;
            accept(client.set_config(&path, &value).await?)?;
            output::status(&format!("Set {path}"), global.quiet);
            Ok(())
        }

        RemoteCommand::Put { path, value } => {
            let value = util::parse_json_arg("value", &value)?;
            accept(client.create_config(&path, &value).await?)?;
            output::status(&format!("Inserted at {path}"), global.quiet);
            Ok(())
        }

        RemoteCommand::Patch { path, value } => {
            let value = util::parse_json_arg("value", &value)?;
            accept(client.patch_config(&path, &value).await?)?;
            output::status(&format!("Replaced {path}"), global.quiet);
            Ok(())
        }

        RemoteCommand::Delete { path } => {
            if !util::confirm(&format!("Delete '{path}' from the running config?"), global.yes)? {
                return Ok(());
            }
            accept(client.delete_config(&path).await?)?;
            output::status(&format!("Deleted {path}"), global.quiet);
            Ok(())
        }

        RemoteCommand::Load { file, adapter } => {
            if !util::confirm(
                &format!("Replace the whole running config with {}?", file.display()),
                global.yes,
            )? {
                return Ok(());
            }
            let document = match adapter {
                None => util::read_json_file(&file)?,
                Some(adapter) => {
                    let text = std::fs::read_to_string(&file)?;
                    adapt_document(client, &text, adapter.into()).await?
                }
            };
            controller.execute(CoreCommand::Load { document }).await?;
            output::status("Loaded configuration (recorded)", global.quiet);
            Ok(())
        }

        RemoteCommand::Adapt { file, adapter } => {
            let text = std::fs::read_to_string(&file)?;
            let resp = accept(client.adapt(&text, adapter.into()).await?)?;
            print_body(&resp, global)
        }

        RemoteCommand::Upstreams => {
            let upstreams = client.upstreams().await?;
            let out = output::render_list(
                &global.output,
                &upstreams,
                |u| UpstreamStatusRow::from(u),
                |u| u.address.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        RemoteCommand::Stop => {
            if !util::confirm("Stop the server process?", global.yes)? {
                return Ok(());
            }
            accept(client.stop().await?)?;
            output::status("Server stopping", global.quiet);
            Ok(())
        }

        RemoteCommand::Health => {
            client.health().await?;
            output::status(&format!("{} is up", client.endpoint()), global.quiet);
            Ok(())
        }

        RemoteCommand::Pki { id, certificates } => {
            let resp = if certificates {
                client.pki_ca_certificates(&id).await?
            } else {
                client.pki_ca(&id).await?
            };
            print_body(&accept(resp)?, global)
        }
    }
}
