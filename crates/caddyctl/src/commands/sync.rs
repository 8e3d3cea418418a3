//! `caddyctl sync`: push the current state as one document.

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::CliController;

pub async fn handle(controller: &CliController, global: &GlobalOpts) -> Result<(), CliError> {
    let document = controller.sync().await?;
    let servers = document.apps.http.servers.len();
    output::status(
        &format!("Applied configuration ({servers} server(s))"),
        global.quiet,
    );
    Ok(())
}
