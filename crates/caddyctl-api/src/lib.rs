// caddyctl-api: Async Rust client for the Caddy admin API.
//
// Stateless beyond a base URL and a fixed request timeout. Every raw
// operation returns an `ApiResponse` (status + body) on any HTTP answer and
// an `Error` only when the remote could not be reached, so callers can tell
// "rejected" apart from "unreachable".

pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use client::AdminClient;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
pub use types::{ApiResponse, ConfigFormat, UpstreamStatus};

pub use reqwest::StatusCode;
