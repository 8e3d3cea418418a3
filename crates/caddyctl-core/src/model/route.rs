// ── Route and redirect rule domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use super::site::default_true;

/// The closed set of route behaviours.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HandlerKind {
    StaticResponse,
    FileServer,
    ReverseProxy,
    Redirect,
}

/// One path/method-matched handler within a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub id: Uuid,
    pub site_id: Uuid,
    #[serde(default)]
    pub name: String,
    /// Path pattern, e.g. `/api/*`. Empty means no path restriction.
    #[serde(default)]
    pub path_matcher: String,
    /// HTTP methods to match. Empty means any method.
    #[serde(default, deserialize_with = "super::lenient_string_list")]
    pub methods: Vec<String>,
    #[serde(rename = "handler_type")]
    pub handler: HandlerKind,
    /// Kind-specific JSON object, kept as stored text. Decoded during
    /// synthesis.
    #[serde(default)]
    pub handler_config: String,
    /// Routes render in ascending order within a site.
    #[serde(default)]
    pub order: i32,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Route {
    pub fn new(
        site_id: Uuid,
        handler: HandlerKind,
        path_matcher: impl Into<String>,
        handler_config: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            site_id,
            name: String::new(),
            path_matcher: path_matcher.into(),
            methods: Vec::new(),
            handler,
            handler_config: handler_config.to_string(),
            order: 0,
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

/// A per-site redirect, rendered ahead of every route of its site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectRule {
    pub id: Uuid,
    pub site_id: Uuid,
    /// Path to match.
    pub source: String,
    /// Value of the `Location` header.
    pub destination: String,
    /// Redirect status. 0 is unset and renders as an explicit 302, never as
    /// an omitted `status_code`.
    #[serde(default)]
    pub code: u16,
    /// Higher priority renders first.
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl RedirectRule {
    pub fn new(
        site_id: Uuid,
        source: impl Into<String>,
        destination: impl Into<String>,
        code: u16,
        priority: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            site_id,
            source: source.into(),
            destination: destination.into(),
            code,
            priority,
            enabled: true,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn handler_kind_names_are_snake_case() {
        assert_eq!(HandlerKind::ReverseProxy.to_string(), "reverse_proxy");
        assert_eq!(
            HandlerKind::from_str("file_server").unwrap(),
            HandlerKind::FileServer
        );
        assert_eq!(
            serde_json::to_value(HandlerKind::StaticResponse).unwrap(),
            "static_response"
        );
        assert!(HandlerKind::from_str("php_fastcgi").is_err());
    }

    #[test]
    fn methods_accept_encoded_string() {
        let mut value = serde_json::to_value(Route::new(
            Uuid::nil(),
            HandlerKind::StaticResponse,
            "/",
            serde_json::json!({}),
        ))
        .unwrap();
        value["methods"] = serde_json::json!("[\"GET\",\"HEAD\"]");

        let route: Route = serde_json::from_value(value).unwrap();
        assert_eq!(route.methods, vec!["GET", "HEAD"]);
    }
}
