// Wire types shared by the admin client and its callers.

use std::borrow::Cow;

use bytes::Bytes;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Raw answer from the admin API: status code plus the unparsed body.
///
/// Any HTTP answer, including 4xx/5xx, is an `ApiResponse`. Only 200 counts
/// as success; everything else carries the remote's error body verbatim.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// `true` when the admin API accepted the request (HTTP 200).
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK
    }

    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Turn a non-200 answer into [`Error::Api`] with the body attached.
    pub fn error_for_status(self) -> Result<Self, Error> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(Error::Api {
                status: self.status.as_u16(),
                body: self.text().into_owned(),
            })
        }
    }

    /// Parse the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_slice(&self.body).map_err(|e| {
            let body = self.text().into_owned();
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    }
}

/// Live status of one reverse-proxy upstream, from `GET /reverse_proxy/upstreams`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamStatus {
    pub address: String,
    #[serde(default)]
    pub num_requests: u64,
    #[serde(default)]
    pub fails: u64,
}

/// Alternate config syntaxes the admin API can adapt to canonical JSON.
///
/// The admin API picks the adapter from the request's Content-Type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigFormat {
    #[default]
    Caddyfile,
    Json5,
    Yaml,
    Nginx,
}

impl ConfigFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Caddyfile => "text/caddyfile",
            Self::Json5 => "application/json5",
            Self::Yaml => "application/yaml",
            Self::Nginx => "text/nginx",
        }
    }
}
