// Hand-written async client for the Caddy admin API.
//
// Base URL: the admin listener, e.g. http://localhost:2019
// Canonical config format: JSON; other syntaxes go through /adapt.

use std::time::Duration;

use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::{ApiResponse, ConfigFormat, UpstreamStatus};

const JSON: &str = "application/json";

/// Async client for the Caddy admin API.
///
/// Stateless beyond the base URL and the transport timeout. Raw operations
/// return `Ok(ApiResponse)` for every HTTP answer, so a rejected config
/// (non-200 with a body) is distinguishable from an unreachable admin
/// endpoint (`Err`). Nothing is retried at this layer.
pub struct AdminClient {
    http: reqwest::Client,
    base: String,
    timeout: Option<Duration>,
}

impl AdminClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build a client for the admin listener at `base_url`.
    pub fn new(base_url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        let mut client = Self::with_client(base_url, http)?;
        client.timeout = Some(transport.timeout);
        Ok(client)
    }

    /// Wrap an existing `reqwest::Client` (caller manages timeouts and TLS).
    pub fn with_client(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        // Reject garbage up front instead of on the first request.
        Url::parse(base_url)?;
        Ok(Self {
            http,
            base: base_url.trim_end_matches('/').to_owned(),
            timeout: None,
        })
    }

    /// The admin API base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base
    }

    // ── URL builders ─────────────────────────────────────────────────

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(Url::parse(&format!("{}{path}", self.base))?)
    }

    /// `/config/<path>`, tolerant of a leading slash on `path`.
    fn config_path(path: &str) -> String {
        format!("/config/{}", path.trim_start_matches('/'))
    }

    /// `/id/<id>[/<path>]`
    fn id_path(id: &str, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            format!("/id/{id}")
        } else {
            format!("/id/{id}/{path}")
        }
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<ApiResponse, Error> {
        let resp = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = resp.status();
        let body = resp.bytes().await.map_err(|e| self.transport_error(e))?;
        debug!(status = status.as_u16(), bytes = body.len(), "admin API response");
        Ok(ApiResponse { status, body })
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        match self.timeout {
            Some(timeout) if err.is_timeout() => Error::Timeout {
                timeout_secs: timeout.as_secs(),
            },
            _ => Error::Transport(err),
        }
    }

    async fn request(&self, method: Method, path: &str) -> Result<ApiResponse, Error> {
        let url = self.url(path)?;
        debug!("{method} {url}");
        self.send(self.http.request(method, url)).await
    }

    async fn request_json<B: Serialize + ?Sized + Sync>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, Error> {
        let url = self.url(path)?;
        let payload = serde_json::to_vec(body)?;
        debug!("{method} {url} ({} bytes)", payload.len());
        self.send(
            self.http
                .request(method, url)
                .header(CONTENT_TYPE, JSON)
                .body(payload),
        )
        .await
    }

    async fn request_text(
        &self,
        path: &str,
        text: &str,
        content_type: &str,
    ) -> Result<ApiResponse, Error> {
        let url = self.url(path)?;
        debug!("POST {url} content_type={content_type}");
        self.send(
            self.http
                .post(url)
                .header(CONTENT_TYPE, content_type)
                .body(text.to_owned()),
        )
        .await
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── Full-document load ───────────────────────────────────────────

    /// Replace the whole running configuration.
    ///
    /// `POST /load`
    pub async fn load<B: Serialize + ?Sized + Sync>(&self, config: &B) -> Result<ApiResponse, Error> {
        self.request_json(Method::POST, "/load", config).await
    }

    /// Replace the running configuration from an alternate syntax.
    ///
    /// `POST /load` with the format's Content-Type (e.g. `text/caddyfile`).
    pub async fn load_adapted(&self, text: &str, format: ConfigFormat) -> Result<ApiResponse, Error> {
        self.request_text("/load", text, format.content_type()).await
    }

    // ── Config traversal ─────────────────────────────────────────────

    /// `GET /config/<path>`
    pub async fn get_config(&self, path: &str) -> Result<ApiResponse, Error> {
        self.request(Method::GET, &Self::config_path(path)).await
    }

    /// Set or append at `path`.
    ///
    /// `POST /config/<path>`
    pub async fn set_config<B: Serialize + ?Sized + Sync>(
        &self,
        path: &str,
        value: &B,
    ) -> Result<ApiResponse, Error> {
        self.request_json(Method::POST, &Self::config_path(path), value)
            .await
    }

    /// Create (or insert into an array) at `path`.
    ///
    /// `PUT /config/<path>`
    pub async fn create_config<B: Serialize + ?Sized + Sync>(
        &self,
        path: &str,
        value: &B,
    ) -> Result<ApiResponse, Error> {
        self.request_json(Method::PUT, &Self::config_path(path), value)
            .await
    }

    /// Replace an existing value at `path`.
    ///
    /// `PATCH /config/<path>`
    pub async fn patch_config<B: Serialize + ?Sized + Sync>(
        &self,
        path: &str,
        value: &B,
    ) -> Result<ApiResponse, Error> {
        self.request_json(Method::PATCH, &Self::config_path(path), value)
            .await
    }

    /// `DELETE /config/<path>`
    pub async fn delete_config(&self, path: &str) -> Result<ApiResponse, Error> {
        self.request(Method::DELETE, &Self::config_path(path)).await
    }

    /// The complete running configuration, parsed.
    ///
    /// Returns `Value::Null` when the server has no config loaded.
    pub async fn get_full_config(&self) -> Result<serde_json::Value, Error> {
        let resp = self.get_config("").await?.error_for_status()?;
        if resp.body.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        resp.json()
    }

    // ── @id shortcuts ────────────────────────────────────────────────

    /// `GET /id/<id>[/path]`
    pub async fn get_by_id(&self, id: &str, path: &str) -> Result<ApiResponse, Error> {
        self.request(Method::GET, &Self::id_path(id, path)).await
    }

    /// `POST /id/<id>[/path]`
    pub async fn set_by_id<B: Serialize + ?Sized + Sync>(
        &self,
        id: &str,
        path: &str,
        value: &B,
    ) -> Result<ApiResponse, Error> {
        self.request_json(Method::POST, &Self::id_path(id, path), value)
            .await
    }

    // ── Runtime state ────────────────────────────────────────────────

    /// Live health snapshot of every reverse-proxy upstream.
    ///
    /// `GET /reverse_proxy/upstreams`
    pub async fn upstreams(&self) -> Result<Vec<UpstreamStatus>, Error> {
        let resp = self
            .request(Method::GET, "/reverse_proxy/upstreams")
            .await?
            .error_for_status()?;
        if resp.body.is_empty() {
            return Ok(Vec::new());
        }
        resp.json()
    }

    /// Adapt an alternate syntax to canonical JSON without applying it.
    ///
    /// `POST /adapt`
    pub async fn adapt(&self, text: &str, format: ConfigFormat) -> Result<ApiResponse, Error> {
        self.request_text("/adapt", text, format.content_type())
            .await
    }

    /// Gracefully stop the server process.
    ///
    /// `POST /stop`
    pub async fn stop(&self) -> Result<ApiResponse, Error> {
        self.request(Method::POST, "/stop").await
    }

    // ── PKI ──────────────────────────────────────────────────────────

    /// `GET /pki/ca/<id>`
    pub async fn pki_ca(&self, id: &str) -> Result<ApiResponse, Error> {
        self.request(Method::GET, &format!("/pki/ca/{id}")).await
    }

    /// `GET /pki/ca/<id>/certificates`
    pub async fn pki_ca_certificates(&self, id: &str) -> Result<ApiResponse, Error> {
        self.request(Method::GET, &format!("/pki/ca/{id}/certificates"))
            .await
    }

    // ── Liveness ─────────────────────────────────────────────────────

    /// Liveness probe: any HTTP answer to `GET /config/` means alive.
    pub async fn health(&self) -> Result<(), Error> {
        self.get_config("").await.map(|_| ())
    }
}
