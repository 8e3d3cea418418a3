//! History ledger handlers: list, show, diff and rollback.

use std::fmt::Write;

use serde_json::Value;
use tabled::Tabled;

use caddyctl_core::diff::{Change, ChangeKind, diff};
use caddyctl_core::{HistoryAction, HistoryEntry, HistoryFilter, Ledger, ResourceType};

use crate::cli::{ActionArg, GlobalOpts, HistoryArgs, HistoryCommand, ResourceArg};
use crate::error::CliError;
use crate::output;

use super::{CliController, util};

// ── Arg mapping ─────────────────────────────────────────────────────

impl From<ResourceArg> for ResourceType {
    fn from(arg: ResourceArg) -> Self {
        match arg {
            ResourceArg::Site => Self::Site,
            ResourceArg::Route => Self::Route,
            ResourceArg::Redirect => Self::Redirect,
            ResourceArg::Upstream => Self::Upstream,
            ResourceArg::UpstreamGroup => Self::UpstreamGroup,
            ResourceArg::TlsConfig => Self::TlsConfig,
            ResourceArg::DnsProvider => Self::DnsProvider,
            ResourceArg::Certificate => Self::Certificate,
            ResourceArg::Settings => Self::Settings,
            ResourceArg::Config => Self::Config,
        }
    }
}

impl From<ActionArg> for HistoryAction {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Create => Self::Create,
            ActionArg::Update => Self::Update,
            ActionArg::Delete => Self::Delete,
            ActionArg::Load => Self::Load,
            ActionArg::Sync => Self::Sync,
            ActionArg::Rollback => Self::Rollback,
        }
    }
}

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Type")]
    resource_type: String,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Outcome")]
    outcome: String,
}

fn entry_row(entry: &HistoryEntry, color: bool) -> EntryRow {
    EntryRow {
        id: entry.id.to_string(),
        time: entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        action: entry.action.to_string(),
        resource_type: entry.resource_type.to_string(),
        resource: resource_label(entry),
        outcome: output::outcome(entry.success, color),
    }
}

fn resource_label(entry: &HistoryEntry) -> String {
    match (&entry.resource_name, &entry.resource_id) {
        (Some(name), _) if !name.is_empty() => name.clone(),
        (_, Some(id)) => id.clone(),
        _ => "-".into(),
    }
}

#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Change")]
    kind: &'static str,
    #[tabled(rename = "Old")]
    old: String,
    #[tabled(rename = "New")]
    new: String,
}

impl From<&Change> for ChangeRow {
    fn from(c: &Change) -> Self {
        let show = |v: &Option<Value>| v.as_ref().map(Value::to_string).unwrap_or_default();
        Self {
            path: if c.path.is_empty() {
                "/".into()
            } else {
                c.path.clone()
            },
            kind: match c.kind {
                ChangeKind::Added => "added",
                ChangeKind::Removed => "removed",
                ChangeKind::Changed => "changed",
            },
            old: show(&c.old),
            new: show(&c.new),
        }
    }
}

// ── Detail view ─────────────────────────────────────────────────────

fn detail(entry: &HistoryEntry) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "ID:        {}", entry.id);
    let _ = writeln!(out, "Time:      {}", entry.timestamp.to_rfc3339());
    let _ = writeln!(out, "Action:    {}", entry.action);
    let _ = writeln!(out, "Type:      {}", entry.resource_type);
    let _ = writeln!(out, "Resource:  {}", resource_label(entry));
    let _ = writeln!(out, "Success:   {}", entry.success);
    if let Some(err) = &entry.error_message {
        let _ = writeln!(out, "Error:     {err}");
    }
    for (label, state) in [
        ("Previous state", &entry.previous_state),
        ("New state", &entry.new_state),
        ("Config snapshot", &entry.config_snapshot),
    ] {
        if let Some(value) = state {
            let pretty = serde_json::to_string_pretty(value).unwrap_or_default();
            let _ = write!(out, "\n{label}:\n{pretty}\n");
        }
    }
    out.trim_end().to_owned()
}

/// The value two entries are compared by: the applied document when
/// there is one, otherwise the entity state after the change.
fn comparable(entry: &HistoryEntry) -> Value {
    entry
        .config_snapshot
        .as_ref()
        .or(entry.new_state.as_ref())
        .or(entry.previous_state.as_ref())
        .cloned()
        .unwrap_or(Value::Null)
}

fn find_entry(controller: &CliController, id: uuid::Uuid) -> Result<HistoryEntry, CliError> {
    controller
        .store()
        .entry(id)?
        .ok_or_else(|| CliError::not_found("history entry", &id.to_string(), "history list"))
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &CliController,
    args: HistoryArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let store = controller.store();

    match args.command {
        HistoryCommand::List {
            resource_type,
            action,
            resource_id,
            limit,
            offset,
        } => {
            let page = store.history(&HistoryFilter {
                resource_type: resource_type.map(Into::into),
                action: action.map(Into::into),
                resource_id,
                limit: Some(limit),
                offset,
            })?;
            let color = output::should_color(&global.color);
            let out = output::render_list(
                &global.output,
                &page.entries,
                |e| entry_row(e, color),
                |e| e.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            if page.total > page.offset + page.entries.len() {
                output::status(
                    &format!(
                        "Showing {} of {} entries (use --offset to page)",
                        page.entries.len(),
                        page.total
                    ),
                    global.quiet,
                );
            }
            Ok(())
        }

        HistoryCommand::Show { id } => {
            let id = util::parse_uuid("entry", &id)?;
            let entry = find_entry(controller, id)?;
            let out =
                output::render_single(&global.output, &entry, detail, |e| e.id.to_string())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        HistoryCommand::Diff { from, to } => {
            let from = util::parse_uuid("from", &from)?;
            let to = util::parse_uuid("to", &to)?;
            let (older, newer) = store.compare(from, to)?;
            let changes = diff(&comparable(&older), &comparable(&newer));
            if changes.is_empty() {
                output::status("No differences", global.quiet);
                return Ok(());
            }
            let out = output::render_list(
                &global.output,
                &changes,
                |c| ChangeRow::from(c),
                |c| c.path.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        HistoryCommand::Rollback { id } => {
            let id = util::parse_uuid("entry", &id)?;
            let target = find_entry(controller, id)?;
            if !util::confirm(
                &format!(
                    "Roll back {} of {} '{}' and re-apply?",
                    target.action,
                    target.resource_type,
                    resource_label(&target)
                ),
                global.yes,
            )? {
                return Ok(());
            }
            let entry = controller.rollback(id).await?;
            output::print_output(&entry.id.to_string(), global.quiet);
            output::status(
                &format!("Rolled back {} {}", target.resource_type, target.action),
                global.quiet,
            );
            Ok(())
        }
    }
}
