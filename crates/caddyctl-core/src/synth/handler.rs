// ── Handler builder ──
//
// Two steps per route: decode the stored config text into the variant
// struct for the route's kind, then render that into a document handler.
// Text that is not a JSON object is fatal for the route. Inside a valid
// object, fields of the wrong type are ignored and the field is treated
// as absent.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::document::{
    Browse, FileServer, Handler, LoadBalancing, ProxyUpstream, ReverseProxy, SelectionPolicy,
    StaticResponse,
};
use crate::model::{HandlerKind, Upstream, UpstreamGroup};

pub(crate) const DEFAULT_REDIRECT_STATUS: u16 = 302;

/// Decoded handler config, one variant per handler kind.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerSpec {
    StaticResponse(StaticResponseSpec),
    FileServer(FileServerSpec),
    ReverseProxy(ReverseProxySpec),
    Redirect(RedirectSpec),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticResponseSpec {
    pub body: Option<String>,
    pub status_code: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileServerSpec {
    pub root: Option<String>,
    pub browse: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReverseProxySpec {
    pub upstreams: UpstreamSource,
    pub transport: Option<Map<String, Value>>,
}

/// Where a reverse proxy gets its upstreams from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamSource {
    /// A named group, expanded to its enabled members. Takes precedence
    /// over an inline list when both are present.
    Group(String),
    /// Literal dial addresses.
    Inline(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectSpec {
    pub location: Option<String>,
    pub status_code: Option<u16>,
}

impl HandlerSpec {
    /// Decode stored handler config text for `kind`.
    ///
    /// Blank text decodes as an empty object.
    pub fn decode(kind: HandlerKind, raw: &str) -> Result<Self, serde_json::Error> {
        let config = parse_object(raw)?;
        let cfg = Fields(&config);

        Ok(match kind {
            HandlerKind::StaticResponse => Self::StaticResponse(StaticResponseSpec {
                body: cfg.string("body"),
                status_code: cfg.status("status_code"),
            }),
            HandlerKind::FileServer => Self::FileServer(FileServerSpec {
                root: cfg.string("root"),
                browse: cfg.bool("browse").unwrap_or(false),
            }),
            HandlerKind::ReverseProxy => {
                let upstreams = match cfg.string("upstream_group") {
                    Some(group) => UpstreamSource::Group(group),
                    None => UpstreamSource::Inline(cfg.string_list("upstreams")),
                };
                Self::ReverseProxy(ReverseProxySpec {
                    upstreams,
                    transport: cfg.object("transport"),
                })
            }
            HandlerKind::Redirect => Self::Redirect(RedirectSpec {
                location: cfg.string("location"),
                status_code: cfg.status("status_code"),
            }),
        })
    }

    /// Render into a document handler.
    ///
    /// `groups` and `members` are keyed by group name. An unknown group
    /// yields a proxy with no upstreams.
    pub fn build(
        &self,
        groups: &BTreeMap<String, UpstreamGroup>,
        members: &BTreeMap<String, Vec<Upstream>>,
    ) -> Handler {
        match self {
            Self::StaticResponse(spec) => Handler::StaticResponse(StaticResponse {
                status_code: spec.status_code,
                headers: BTreeMap::new(),
                body: spec.body.clone(),
            }),
            Self::FileServer(spec) => Handler::FileServer(FileServer {
                root: spec.root.clone(),
                browse: spec.browse.then_some(Browse {}),
            }),
            Self::ReverseProxy(spec) => {
                let mut proxy = ReverseProxy {
                    transport: spec.transport.clone(),
                    ..ReverseProxy::default()
                };
                match &spec.upstreams {
                    UpstreamSource::Group(name) => {
                        if let Some(group) = groups.get(name) {
                            proxy.upstreams = members
                                .get(name)
                                .into_iter()
                                .flatten()
                                .filter(|u| u.enabled)
                                .map(|u| ProxyUpstream {
                                    dial: u.address.clone(),
                                    max_requests: (u.max_requests > 0).then_some(u.max_requests),
                                })
                                .collect();
                            if !group.load_balancing.is_empty() {
                                proxy.load_balancing = Some(LoadBalancing {
                                    selection_policy: SelectionPolicy {
                                        policy: group.load_balancing.clone(),
                                    },
                                });
                            }
                        } else {
                            debug!(group = %name, "reverse proxy references unknown upstream group");
                        }
                    }
                    UpstreamSource::Inline(addresses) => {
                        proxy.upstreams = addresses
                            .iter()
                            .map(|dial| ProxyUpstream {
                                dial: dial.clone(),
                                max_requests: None,
                            })
                            .collect();
                    }
                }
                Handler::ReverseProxy(proxy)
            }
            Self::Redirect(spec) => {
                let status = spec.status_code.unwrap_or(DEFAULT_REDIRECT_STATUS);
                Handler::StaticResponse(redirect_response(spec.location.as_deref(), status))
            }
        }
    }
}

/// A static response that sets `Location`. Shared by redirect routes and
/// redirect rules.
pub(crate) fn redirect_response(location: Option<&str>, status: u16) -> StaticResponse {
    let mut headers = BTreeMap::new();
    if let Some(location) = location {
        headers.insert("Location".to_owned(), vec![location.to_owned()]);
    }
    StaticResponse {
        status_code: Some(status),
        headers,
        body: None,
    }
}

fn parse_object(raw: &str) -> Result<Map<String, Value>, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(<serde_json::Error as serde::de::Error>::custom(format!(
            "expected a JSON object, found {}",
            kind_name(&other)
        ))),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Typed accessors over a config object.
struct Fields<'a>(&'a Map<String, Value>);

impl Fields<'_> {
    fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    fn ignored(key: &str, value: &Value) {
        debug!(field = key, value = %value, "ignoring handler config field of unexpected type");
    }

    fn string(&self, key: &str) -> Option<String> {
        let value = self.get(key)?;
        let found = value.as_str().map(str::to_owned);
        if found.is_none() {
            Self::ignored(key, value);
        }
        found
    }

    fn bool(&self, key: &str) -> Option<bool> {
        let value = self.get(key)?;
        let found = value.as_bool();
        if found.is_none() {
            Self::ignored(key, value);
        }
        found
    }

    /// Integral status code; accepts `301` and `301.0`. Zero means unset.
    #[allow(
        clippy::as_conversions,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn status(&self, key: &str) -> Option<u16> {
        let value = self.get(key)?;
        let found = value
            .as_u64()
            .or_else(|| {
                value
                    .as_f64()
                    .filter(|f| f.fract() == 0.0 && (0.0..=f64::from(u16::MAX)).contains(f))
                    .map(|f| f as u64)
            })
            .and_then(|n| u16::try_from(n).ok());
        if found.is_none() {
            Self::ignored(key, value);
        }
        found.filter(|&code| code != 0)
    }

    /// Array of strings; non-string items are skipped.
    fn string_list(&self, key: &str) -> Vec<String> {
        let Some(value) = self.get(key) else {
            return Vec::new();
        };
        let Some(items) = value.as_array() else {
            Self::ignored(key, value);
            return Vec::new();
        };
        items
            .iter()
            .filter_map(|item| {
                let s = item.as_str();
                if s.is_none() {
                    Self::ignored(key, item);
                }
                s.map(str::to_owned)
            })
            .collect()
    }

    fn object(&self, key: &str) -> Option<Map<String, Value>> {
        let value = self.get(key)?;
        let found = value.as_object().cloned();
        if found.is_none() {
            Self::ignored(key, value);
        }
        found
    }
}
