//! CLI-side configuration: layers the global flags over the profile from
//! `caddyctl-config` and opens the state file.
//!
//! Core never sees these types -- it receives a pre-built
//! `ControlPlaneConfig` and a store.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use caddyctl_api::AdminClient;
use caddyctl_config::{Config, Profile};
use caddyctl_core::{ControlPlaneConfig, MemoryStore};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use caddyctl_config::{config_path, load_config, save_config};

/// Everything a command needs to reach its state and its admin endpoint.
#[derive(Debug, Clone)]
pub struct Context {
    pub profile: String,
    pub state_path: PathBuf,
    pub control_plane: ControlPlaneConfig,
}

impl Context {
    pub fn client(&self) -> Result<AdminClient, CliError> {
        Ok(self.control_plane.client()?)
    }

    pub fn open_store(&self) -> Result<Arc<MemoryStore>, CliError> {
        debug!(path = %self.state_path.display(), "opening state file");
        Ok(Arc::new(MemoryStore::open(&self.state_path)?))
    }

    pub fn save_store(&self, store: &MemoryStore) -> Result<(), CliError> {
        store.save(&self.state_path)?;
        Ok(())
    }
}

/// Resolve the active profile and apply flag overrides.
///
/// Precedence: flag (or its env var) > profile > `[defaults]`.
pub fn resolve(global: &GlobalOpts) -> Result<Context, CliError> {
    let cfg = load_config()?;
    let (name, profile) = cfg
        .profile(global.profile.as_deref())
        .map_err(|e| with_available(e.into(), &cfg))?;

    let profile = Profile {
        admin_url: global
            .admin_url
            .clone()
            .unwrap_or_else(|| profile.admin_url.clone()),
        insecure: Some(global.insecure || profile.insecure.unwrap_or(false)),
        timeout: global.timeout.or(profile.timeout),
        ..profile
    };

    let control_plane = caddyctl_config::profile_to_control_plane_config(&profile, &cfg.defaults)?;

    let state_path = global
        .state
        .clone()
        .unwrap_or_else(|| profile.state_path(&cfg.defaults));

    debug!(
        profile = %name,
        admin_url = %control_plane.url,
        state = %state_path.display(),
        "resolved configuration"
    );

    Ok(Context {
        profile: name,
        state_path,
        control_plane,
    })
}

fn with_available(err: CliError, cfg: &Config) -> CliError {
    match err {
        CliError::ProfileNotFound { name, .. } => CliError::ProfileNotFound {
            name,
            available: if cfg.profiles.is_empty() {
                "(none)".into()
            } else {
                cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
            },
        },
        other => other,
    }
}
