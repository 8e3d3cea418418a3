// ── Control-plane seam ──
//
// The orchestrator only needs full-document load. Keeping it behind a
// trait lets tests substitute a recording fake for the admin client.

use std::future::Future;

use caddyctl_api::{AdminClient, ApiResponse};

/// Anything that can replace the running configuration wholesale.
pub trait ControlPlane: Send + Sync {
    /// Replace the running configuration with `document`.
    ///
    /// `Ok` for any HTTP answer (check [`ApiResponse::is_ok`]); `Err` only
    /// when the remote could not be reached.
    fn load(
        &self,
        document: &serde_json::Value,
    ) -> impl Future<Output = Result<ApiResponse, caddyctl_api::Error>> + Send;

    /// Where the control plane lives, for error messages.
    fn endpoint(&self) -> String;
}

impl ControlPlane for AdminClient {
    fn load(
        &self,
        document: &serde_json::Value,
    ) -> impl Future<Output = Result<ApiResponse, caddyctl_api::Error>> + Send {
        AdminClient::load(self, document)
    }

    fn endpoint(&self) -> String {
        self.base_url().to_owned()
    }
}
