// ── Controller abstraction ──
//
// Single-flight front door for the orchestrator. Every mutation, sync,
// load and rollback goes through one command channel drained by one
// task, so applies never overlap. Sync requests that pile up behind a
// running command are folded into a single synthesis+apply.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::command::{Command, CommandEnvelope, CommandResult};
use crate::control_plane::ControlPlane;
use crate::document::Document;
use crate::error::CoreError;
use crate::model::{Entity, HistoryEntry, ResourceType, UpstreamGroupState};
use crate::store::{Ledger, Repository};
use crate::sync::Synchronizer;

const COMMAND_CHANNEL_SIZE: usize = 64;

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Call
/// [`start()`](Self::start) to spawn the command task; commands sent
/// before that wait in the channel.
pub struct Controller<S, C> {
    inner: Arc<ControllerInner<S, C>>,
}

impl<S, C> Clone for Controller<S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ControllerInner<S, C> {
    sync: Synchronizer<S, C>,
    /// Bumped after every successful apply.
    revision: watch::Sender<u64>,
    command_tx: mpsc::Sender<CommandEnvelope>,
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl<S, C> Controller<S, C>
where
    S: Repository + Ledger + 'static,
    C: ControlPlane + 'static,
{
    pub fn new(store: Arc<S>, plane: C) -> Self {
        let (revision, _) = watch::channel(0);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

        Self {
            inner: Arc::new(ControllerInner {
                sync: Synchronizer::new(store, plane),
                revision,
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Access the underlying store.
    pub fn store(&self) -> &Arc<S> {
        self.inner.sync.store()
    }

    /// Access the orchestrator for read-only work (render, snapshot).
    pub fn synchronizer(&self) -> &Synchronizer<S, C> {
        &self.inner.sync
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn the command processor. Calling it twice is a no-op.
    pub async fn start(&self) {
        if let Some(rx) = self.inner.command_rx.lock().await.take() {
            let ctrl = self.clone();
            self.inner
                .task_handles
                .lock()
                .await
                .push(tokio::spawn(command_processor_task(ctrl, rx)));
            debug!("command processor started");
        }
    }

    /// Stop the command processor and wait for it to exit. Commands still
    /// queued are dropped and their callers see
    /// [`CoreError::ControllerStopped`].
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("controller stopped");
    }

    // ── Command execution ────────────────────────────────────────

    /// Execute a command and await its result.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::ControllerStopped);
        }

        let (tx, rx) = oneshot::channel();

        self.inner
            .command_tx
            .send(CommandEnvelope {
                command: cmd,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::ControllerStopped)?;

        rx.await.map_err(|_| CoreError::ControllerStopped)?
    }

    /// Shorthand for [`Command::Sync`].
    pub async fn sync(&self) -> Result<Document, CoreError> {
        match self.execute(Command::Sync).await? {
            CommandResult::Synced(document) => Ok(*document),
            CommandResult::Entry(_) => Err(CoreError::Internal(
                "sync answered with a history entry".into(),
            )),
        }
    }

    /// Shorthand for [`Command::Rollback`].
    pub async fn rollback(&self, entry_id: Uuid) -> Result<HistoryEntry, CoreError> {
        match self.execute(Command::Rollback { entry_id }).await? {
            CommandResult::Entry(entry) => Ok(*entry),
            CommandResult::Synced(_) => Err(CoreError::Internal(
                "rollback answered with a document".into(),
            )),
        }
    }

    // ── One-shot convenience ─────────────────────────────────────

    /// One-shot: start, run closure, shut down.
    pub async fn oneshot<F, Fut, T>(store: Arc<S>, plane: C, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let controller = Self::new(store, plane);
        controller.start().await;
        let result = f(controller.clone()).await;
        controller.shutdown().await;
        result
    }

    // ── State observation ────────────────────────────────────────

    /// Subscribe to the applied-revision counter.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    fn applied(&self) {
        self.inner.revision.send_modify(|rev| *rev += 1);
    }
}

// ── Background task ──────────────────────────────────────────────

/// Drain the command channel one command at a time. A `Sync` also takes
/// every `Sync` queued directly behind it; the first other command found
/// is held back and run next.
async fn command_processor_task<S, C>(
    controller: Controller<S, C>,
    mut rx: mpsc::Receiver<CommandEnvelope>,
) where
    S: Repository + Ledger + 'static,
    C: ControlPlane + 'static,
{
    let cancel = controller.inner.cancel.clone();
    let mut held: Option<CommandEnvelope> = None;

    loop {
        let envelope = if let Some(envelope) = held.take() {
            envelope
        } else {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                envelope = rx.recv() => {
                    let Some(envelope) = envelope else { break };
                    envelope
                }
            }
        };

        if !matches!(envelope.command, Command::Sync) {
            let result = route_command(&controller, envelope.command).await;
            let _ = envelope.response_tx.send(result);
            continue;
        }

        let mut waiters = vec![envelope.response_tx];
        while let Ok(next) = rx.try_recv() {
            if matches!(next.command, Command::Sync) {
                waiters.push(next.response_tx);
            } else {
                held = Some(next);
                break;
            }
        }
        if waiters.len() > 1 {
            debug!(requests = waiters.len(), "coalescing queued sync requests");
        }

        let result = sync(&controller)
            .await
            .map(|document| CommandResult::Synced(Box::new(document)));
        for tx in waiters {
            let _ = tx.send(result.clone());
        }
    }
}

// ── Command routing ──────────────────────────────────────────────

async fn route_command<S, C>(
    controller: &Controller<S, C>,
    cmd: Command,
) -> Result<CommandResult, CoreError>
where
    S: Repository + Ledger + 'static,
    C: ControlPlane + 'static,
{
    let orchestrator = &controller.inner.sync;

    match cmd {
        Command::Sync => sync(controller)
            .await
            .map(|document| CommandResult::Synced(Box::new(document))),

        Command::Load { document } => {
            let entry = orchestrator.load_document(&document).await?;
            controller.applied();
            Ok(CommandResult::Entry(Box::new(entry)))
        }

        Command::Rollback { entry_id } => {
            let entry = orchestrator.rollback(entry_id).await?;
            controller.applied();
            info!(%entry_id, "rollback complete");
            Ok(CommandResult::Entry(Box::new(entry)))
        }

        // ── Entity upserts ───────────────────────────────────────
        Command::UpsertSite(site) => upsert(controller, Entity::Site(site)).await,
        Command::UpsertRoute(route) => upsert(controller, Entity::Route(route)).await,
        Command::UpsertRedirect(rule) => upsert(controller, Entity::Redirect(rule)).await,
        Command::UpsertUpstream(upstream) => {
            upsert(controller, Entity::Upstream(upstream)).await
        }
        Command::UpsertUpstreamGroup { group, members } => {
            upsert(
                controller,
                Entity::UpstreamGroup(UpstreamGroupState { group, members }),
            )
            .await
        }
        Command::UpsertTlsConfig(tls) => upsert(controller, Entity::TlsConfig(tls)).await,
        Command::UpsertDnsProvider(provider) => {
            upsert(controller, Entity::DnsProvider(provider)).await
        }
        Command::UpsertCertificate(cert) => {
            upsert(controller, Entity::Certificate(cert)).await
        }
        Command::UpdateSettings(settings) => {
            upsert(controller, Entity::Settings(settings)).await
        }

        // ── Entity deletes ───────────────────────────────────────
        Command::DeleteSite { id } => delete(controller, ResourceType::Site, id).await,
        Command::DeleteRoute { id } => delete(controller, ResourceType::Route, id).await,
        Command::DeleteRedirect { id } => delete(controller, ResourceType::Redirect, id).await,
        Command::DeleteUpstream { id } => delete(controller, ResourceType::Upstream, id).await,
        Command::DeleteUpstreamGroup { id } => {
            delete(controller, ResourceType::UpstreamGroup, id).await
        }
        Command::DeleteTlsConfig { id } => delete(controller, ResourceType::TlsConfig, id).await,
        Command::DeleteDnsProvider { id } => {
            delete(controller, ResourceType::DnsProvider, id).await
        }
        Command::DeleteCertificate { id } => {
            delete(controller, ResourceType::Certificate, id).await
        }
        Command::ResetSettings => delete(controller, ResourceType::Settings, Uuid::nil()).await,
    }
}

// ── Helpers ──────────────────────────────────────────────────────

async fn sync<S, C>(controller: &Controller<S, C>) -> Result<Document, CoreError>
where
    S: Repository + Ledger + 'static,
    C: ControlPlane + 'static,
{
    let document = controller.inner.sync.sync().await?;
    controller.applied();
    Ok(document)
}

/// Record the mutation, then re-sync. The mutation stays even when the
/// sync fails; the failure is in the ledger and returned to the caller.
async fn upsert<S, C>(controller: &Controller<S, C>, entity: Entity) -> Result<CommandResult, CoreError>
where
    S: Repository + Ledger + 'static,
    C: ControlPlane + 'static,
{
    let entry = controller.inner.sync.upsert(entity)?;
    debug!(action = %entry.action, resource_type = %entry.resource_type, "entity stored");
    sync(controller).await?;
    Ok(CommandResult::Entry(Box::new(entry)))
}

async fn delete<S, C>(
    controller: &Controller<S, C>,
    resource_type: ResourceType,
    id: Uuid,
) -> Result<CommandResult, CoreError>
where
    S: Repository + Ledger + 'static,
    C: ControlPlane + 'static,
{
    let entry = controller.inner.sync.delete(resource_type, id)?;
    debug!(%resource_type, %id, "entity deleted");
    sync(controller).await?;
    Ok(CommandResult::Entry(Box::new(entry)))
}
