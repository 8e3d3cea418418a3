//! Command dispatch: bridges CLI args -> core Commands -> output formatting.

pub mod config_cmd;
pub mod history;
pub mod redirects;
pub mod remote;
pub mod render;
pub mod routes;
pub mod settings;
pub mod sites;
pub mod sync;
pub mod tls;
pub mod upstreams;
pub mod util;

use std::sync::Arc;

use caddyctl_api::AdminClient;
use caddyctl_core::{Controller, HistoryFilter, Ledger, MemoryStore};

use crate::cli::{Command, GlobalOpts};
use crate::config::Context;
use crate::error::CliError;

/// The controller every handler runs against.
pub type CliController = Controller<MemoryStore, AdminClient>;

/// Dispatch a state-bound command to the appropriate handler.
///
/// The state file is written back whenever the command added ledger
/// entries, including when the command itself failed, so rejected applies
/// stay on record.
pub async fn dispatch(cmd: Command, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let store = ctx.open_store()?;
    let recorded = ledger_len(&store)?;

    let controller = Controller::new(Arc::clone(&store), ctx.client()?);
    controller.start().await;

    let result = match cmd {
        Command::Render(args) => render::handle(&controller, args, global),
        Command::Sync => sync::handle(&controller, global).await,
        Command::Sites(args) => sites::handle(&controller, args, global).await,
        Command::Routes(args) => routes::handle(&controller, args, global).await,
        Command::Redirects(args) => redirects::handle(&controller, args, global).await,
        Command::Upstreams(args) => upstreams::handle(&controller, args, global).await,
        Command::Groups(args) => upstreams::handle_groups(&controller, args, global).await,
        Command::Tls(args) => tls::handle(&controller, args, global).await,
        Command::DnsProviders(args) => tls::handle_dns_providers(&controller, args, global).await,
        Command::Certificates(args) => tls::handle_certificates(&controller, args, global).await,
        Command::Settings(args) => settings::handle(&controller, args, global).await,
        Command::History(args) => history::handle(&controller, args, global).await,
        Command::Remote(args) => remote::handle(&controller, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    };

    controller.shutdown().await;

    if ledger_len(&store)? != recorded {
        ctx.save_store(&store)?;
        tracing::debug!(path = %ctx.state_path.display(), "state saved");
    }
    result
}

fn ledger_len(store: &MemoryStore) -> Result<usize, CliError> {
    let page = store.history(&HistoryFilter {
        limit: Some(0),
        ..HistoryFilter::default()
    })?;
    Ok(page.total)
}
