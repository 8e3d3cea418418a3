// ── Core error types ──
//
// User-facing errors from caddyctl-core. Consumers never see reqwest
// errors directly: the `From<caddyctl_api::Error>` impl translates
// transport-layer failures into domain variants. Every variant carries
// owned strings so a single sync outcome can be fanned out to all the
// callers whose requests were coalesced into it.

use thiserror::Error;

/// A fatal synthesis failure. Nothing is applied when this is returned.
#[derive(Debug, Clone, Error)]
pub enum SynthesisError {
    /// A route's handler config could not be decoded into the fields its
    /// handler kind requires.
    #[error("site {site}: route {route}: invalid handler config: {message}")]
    HandlerConfig {
        site: String,
        route: String,
        message: String,
    },
}

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Synthesis ────────────────────────────────────────────────────
    #[error("Configuration synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),

    // ── Control plane ────────────────────────────────────────────────
    #[error("Cannot reach control plane at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    /// `timeout_secs` is unknown when the HTTP client was supplied by the
    /// caller.
    #[error("Control plane request timed out{}", after_secs(.timeout_secs))]
    Timeout { timeout_secs: Option<u64> },

    /// The control plane answered a write with a non-200 status.
    #[error("Control plane rejected the request (HTTP {status}): {body}")]
    Apply { status: u16, body: String },

    #[error("Control plane API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Entity not found: {entity_type} with id {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    /// A stored snapshot cannot be restored or reapplied.
    #[error("Invalid snapshot: {message}")]
    InvalidSnapshot { message: String },

    #[error("Store error: {message}")]
    Store { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Lifecycle / internal ─────────────────────────────────────────
    #[error("Controller is not running")]
    ControllerStopped,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn not_found(entity_type: impl Into<String>, identifier: impl ToString) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            identifier: identifier.to_string(),
        }
    }

    pub(crate) fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// The message recorded in the ledger for a failed apply.
    ///
    /// A rejected document records the remote body verbatim.
    pub fn ledger_message(&self) -> String {
        match self {
            Self::Apply { body, .. } => body.clone(),
            other => other.to_string(),
        }
    }
}

#[allow(clippy::ref_option)]
fn after_secs(timeout_secs: &Option<u64>) -> String {
    timeout_secs.map_or_else(String::new, |secs| format!(" after {secs}s"))
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<caddyctl_api::Error> for CoreError {
    fn from(err: caddyctl_api::Error) -> Self {
        match err {
            caddyctl_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: None }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            caddyctl_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            caddyctl_api::Error::Timeout { timeout_secs } => CoreError::Timeout {
                timeout_secs: Some(timeout_secs),
            },
            caddyctl_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            caddyctl_api::Error::Api { status: 404, body } => CoreError::NotFound {
                entity_type: "config path".into(),
                identifier: body,
            },
            caddyctl_api::Error::Api { status, body } => CoreError::Apply { status, body },
            caddyctl_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            caddyctl_api::Error::Serialization(e) => {
                CoreError::Internal(format!("Serialization error: {e}"))
            }
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::InvalidSnapshot {
            message: err.to_string(),
        }
    }
}
