// caddyctl-core: Entity model, configuration synthesis, sync orchestration
// and the history/rollback ledger, between caddyctl-api and the CLI.

pub mod command;
pub mod config;
pub mod control_plane;
pub mod controller;
pub mod diff;
pub mod document;
pub mod error;
pub mod model;
pub mod store;
pub mod sync;
pub mod synth;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandResult};
pub use config::ControlPlaneConfig;
pub use control_plane::ControlPlane;
pub use controller::Controller;
pub use document::Document;
pub use error::{CoreError, SynthesisError};
pub use store::{HistoryFilter, HistoryPage, Ledger, MemoryStore, Repository, StateFile};
pub use sync::Synchronizer;
pub use synth::{Snapshot, synthesize};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    // Entities
    CustomCertificate, DnsProvider, Entity, GlobalSettings, RedirectRule, Route, Site, TlsConfig,
    Upstream, UpstreamGroup, UpstreamGroupState,
    // Supporting types
    CascadedState, HandlerKind, HistoryAction, HistoryEntry, ResourceType,
};
