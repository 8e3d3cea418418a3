// ── State file ──
//
// One JSON document holding every entity table plus the history ledger.
// Writes go to a sibling temp file first and are renamed into place.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CoreError;
use crate::model::{
    CustomCertificate, DnsProvider, GlobalSettings, HistoryEntry, RedirectRule, Route, Site,
    TlsConfig, Upstream, UpstreamGroupState,
};

/// Serialized form of a [`MemoryStore`](super::MemoryStore).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateFile {
    pub version: u32,
    pub sites: Vec<Site>,
    pub routes: Vec<Route>,
    pub redirects: Vec<RedirectRule>,
    pub upstreams: Vec<Upstream>,
    pub upstream_groups: Vec<UpstreamGroupState>,
    pub certificates: Vec<CustomCertificate>,
    pub tls_configs: Vec<TlsConfig>,
    pub dns_providers: Vec<DnsProvider>,
    pub settings: Option<GlobalSettings>,
    pub history: Vec<HistoryEntry>,
}

impl StateFile {
    pub const CURRENT_VERSION: u32 = 1;

    /// Read and decode `path`. A missing file is an empty state.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "state file not found, starting empty");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(CoreError::store(format!(
                    "cannot read {}: {e}",
                    path.display()
                )));
            }
        };

        let state: Self = serde_json::from_str(&contents).map_err(|e| {
            CoreError::store(format!("cannot parse {}: {e}", path.display()))
        })?;
        if state.version > Self::CURRENT_VERSION {
            return Err(CoreError::store(format!(
                "{} has version {}, newer than supported version {}",
                path.display(),
                state.version,
                Self::CURRENT_VERSION
            )));
        }
        Ok(state)
    }

    /// Encode and write to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                CoreError::store(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| CoreError::store(format!("cannot encode state: {e}")))?;

        let tmp = temp_path(path);
        fs::write(&tmp, contents)
            .map_err(|e| CoreError::store(format!("cannot write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, path)
            .map_err(|e| CoreError::store(format!("cannot replace {}: {e}", path.display())))?;

        debug!(path = %path.display(), "state file saved");
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
