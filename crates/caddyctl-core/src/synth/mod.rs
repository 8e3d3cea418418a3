// ── Configuration synthesis ──
//
// Pure translation from an entity snapshot to a control-plane document.
// No I/O and no clock: the same snapshot always yields the same document.

mod handler;
mod tls;

use std::cmp::Reverse;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::{
    AdminConfig, Apps, AutomaticHttps, Document, Handler, HttpApp, LogConfig, Logging, Matcher,
    Route as DocRoute, Server,
};
use crate::error::SynthesisError;
use crate::model::{
    CustomCertificate, DnsProvider, GlobalSettings, HandlerKind, RedirectRule, Route, Site,
    TlsConfig, Upstream, UpstreamGroup,
};

use handler::DEFAULT_REDIRECT_STATUS;

pub use handler::{
    FileServerSpec, HandlerSpec, RedirectSpec, ReverseProxySpec, StaticResponseSpec,
    UpstreamSource,
};

const WILDCARD_PATH: &str = "/*";

/// Everything the engine reads, already fetched from the repository.
///
/// Routes, redirects and TLS configs are keyed by site id; upstream groups
/// and their members by group name; DNS providers by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub sites: Vec<Site>,
    pub routes: BTreeMap<Uuid, Vec<Route>>,
    pub redirects: BTreeMap<Uuid, Vec<RedirectRule>>,
    pub upstream_groups: BTreeMap<String, UpstreamGroup>,
    pub group_upstreams: BTreeMap<String, Vec<Upstream>>,
    pub certificates: Vec<CustomCertificate>,
    pub settings: GlobalSettings,
    pub tls_configs: BTreeMap<Uuid, TlsConfig>,
    pub dns_providers: BTreeMap<Uuid, DnsProvider>,
}

/// Build the full document for `snapshot`.
///
/// Disabled sites, routes, redirect rules and upstreams contribute
/// nothing. A handler config that is not a JSON object aborts the whole
/// build.
pub fn synthesize(snapshot: &Snapshot) -> Result<Document, SynthesisError> {
    let sites: Vec<&Site> = snapshot.sites.iter().filter(|s| s.enabled).collect();

    let mut http = HttpApp::default();
    apply_http_settings(&mut http, &snapshot.settings);

    // Later sites with the same server name replace earlier ones.
    for site in &sites {
        let server = build_server(site, snapshot)?;
        http.servers.insert(site.server_name(), server);
    }

    let tls = tls::build_tls_app(
        &sites,
        &snapshot.certificates,
        &snapshot.tls_configs,
        &snapshot.dns_providers,
    );

    Ok(Document {
        admin: snapshot
            .settings
            .admin_listen
            .as_ref()
            .filter(|l| !l.is_empty())
            .map(|listen| AdminConfig {
                listen: listen.clone(),
            }),
        logging: logging(&snapshot.settings),
        apps: Apps { tls, http },
    })
}

/// Build the server block for one site: redirects first, then routes.
pub fn build_server(site: &Site, snapshot: &Snapshot) -> Result<Server, SynthesisError> {
    let mut routes = Vec::new();

    let mut redirects: Vec<&RedirectRule> = snapshot
        .redirects
        .get(&site.id)
        .into_iter()
        .flatten()
        .filter(|r| r.enabled)
        .collect();
    sort_redirects(&mut redirects);
    routes.extend(redirects.into_iter().map(|rule| redirect_route(site, rule)));

    let mut site_routes: Vec<&Route> = snapshot
        .routes
        .get(&site.id)
        .into_iter()
        .flatten()
        .filter(|r| r.enabled)
        .collect();
    sort_routes(&mut site_routes);
    for route in site_routes {
        routes.push(handler_route(site, route, snapshot)?);
    }

    Ok(Server {
        listen: vec![format!(":{}", site.listen_port)],
        automatic_https: (!site.auto_https).then_some(AutomaticHttps { disable: true }),
        routes,
    })
}

/// Priority descending; on a tie the newest rule wins.
pub(crate) fn sort_redirects(rules: &mut [&RedirectRule]) {
    rules.sort_by_key(|r| (Reverse(r.priority), Reverse(r.created_at), r.id));
}

/// Order ascending; ties by creation time, then id.
pub(crate) fn sort_routes(routes: &mut [&Route]) {
    routes.sort_by_key(|r| (r.order, r.created_at, r.id));
}

fn redirect_route(site: &Site, rule: &RedirectRule) -> DocRoute {
    // Code 0 is unset and renders as an explicit 302.
    let status = if rule.code == 0 {
        DEFAULT_REDIRECT_STATUS
    } else {
        rule.code
    };
    let matcher = Matcher {
        host: site.hosts.clone(),
        path: vec![rule.source.clone()],
        method: Vec::new(),
    };

    DocRoute {
        id: format!("redirect_{}", rule.id),
        matchers: vec![matcher],
        handle: vec![Handler::StaticResponse(handler::redirect_response(
            Some(&rule.destination),
            status,
        ))],
        terminal: true,
    }
}

fn handler_route(site: &Site, route: &Route, snapshot: &Snapshot) -> Result<DocRoute, SynthesisError> {
    let spec = HandlerSpec::decode(route.handler, &route.handler_config).map_err(|e| {
        SynthesisError::HandlerConfig {
            site: site.name.clone(),
            route: route_label(route),
            message: e.to_string(),
        }
    })?;
    let handler = spec.build(&snapshot.upstream_groups, &snapshot.group_upstreams);

    let matcher = Matcher {
        host: site.hosts.clone(),
        path: path_match(route),
        method: route.methods.clone(),
    };

    Ok(DocRoute {
        id: format!("route_{}", route.id),
        matchers: if matcher.is_empty() {
            Vec::new()
        } else {
            vec![matcher]
        },
        handle: vec![handler],
        terminal: true,
    })
}

/// A file server with no path restriction must still match every path.
fn path_match(route: &Route) -> Vec<String> {
    let path = route.path_matcher.as_str();
    match (route.handler, path) {
        (HandlerKind::FileServer, "" | "/") => vec![WILDCARD_PATH.to_owned()],
        (_, "") => Vec::new(),
        _ => vec![path.to_owned()],
    }
}

fn route_label(route: &Route) -> String {
    if route.name.is_empty() {
        route.id.to_string()
    } else {
        format!("{} ({})", route.name, route.id)
    }
}

fn apply_http_settings(http: &mut HttpApp, settings: &GlobalSettings) {
    http.http_port = settings.http_port.filter(|p| *p != 0);
    http.https_port = settings.https_port.filter(|p| *p != 0);
    http.grace_period = settings
        .grace_period
        .filter(|g| *g > 0)
        .map(|g| format!("{g}s"));
}

fn logging(settings: &GlobalSettings) -> Option<Logging> {
    let level = settings.log_level.as_ref().filter(|l| !l.is_empty())?;
    Some(Logging {
        logs: BTreeMap::from([(
            "default".to_owned(),
            LogConfig {
                level: level.clone(),
            },
        )]),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn route_ids(server: &Server) -> Vec<String> {
        server.routes.iter().map(|r| r.id.clone()).collect()
    }

    fn single_site(site: Site) -> Snapshot {
        Snapshot {
            sites: vec![site],
            ..Snapshot::default()
        }
    }

    #[test]
    fn redirects_render_before_routes_in_their_own_order() {
        let site = Site::new("example.com", vec!["example.com".into()]);
        let r1 = RedirectRule::new(site.id, "/old", "/new", 301, 10);
        let r2 = RedirectRule::new(site.id, "/legacy", "/", 302, 5);
        let a = Route::new(site.id, HandlerKind::StaticResponse, "/a", json!({})).with_order(1);
        let b = Route::new(site.id, HandlerKind::StaticResponse, "/b", json!({})).with_order(0);

        let mut snapshot = single_site(site.clone());
        snapshot
            .redirects
            .insert(site.id, vec![r2.clone(), r1.clone()]);
        snapshot.routes.insert(site.id, vec![a.clone(), b.clone()]);

        let doc = synthesize(&snapshot).unwrap();
        assert_eq!(
            route_ids(doc.server("example_com").unwrap()),
            vec![
                format!("redirect_{}", r1.id),
                format!("redirect_{}", r2.id),
                format!("route_{}", b.id),
                format!("route_{}", a.id),
            ]
        );
    }

    #[test]
    fn redirect_priority_tie_prefers_newest() {
        let site = Site::new("s", Vec::new());
        let mut older = RedirectRule::new(site.id, "/x", "/old", 301, 1);
        older.created_at = Utc::now() - Duration::hours(1);
        let newer = RedirectRule::new(site.id, "/x", "/new", 301, 1);

        let mut snapshot = single_site(site.clone());
        snapshot
            .redirects
            .insert(site.id, vec![older.clone(), newer.clone()]);

        let doc = synthesize(&snapshot).unwrap();
        assert_eq!(
            route_ids(doc.server("s").unwrap()),
            vec![format!("redirect_{}", newer.id), format!("redirect_{}", older.id)]
        );
    }

    #[test]
    fn redirect_rule_with_code_zero_renders_302() {
        let site = Site::new("s", vec!["a.com".into(), "b.com".into()]);
        let rule = RedirectRule::new(site.id, "/old", "https://a.com/new", 0, 0);
        let mut snapshot = single_site(site.clone());
        snapshot.redirects.insert(site.id, vec![rule.clone()]);

        let doc = synthesize(&snapshot).unwrap();
        let route = serde_json::to_value(&doc.server("s").unwrap().routes[0]).unwrap();
        assert_eq!(
            route,
            json!({
                "@id": format!("redirect_{}", rule.id),
                "match": [{ "host": ["a.com", "b.com"], "path": ["/old"] }],
                "handle": [{
                    "handler": "static_response",
                    "status_code": 302,
                    "headers": { "Location": ["https://a.com/new"] }
                }],
                "terminal": true
            })
        );
    }

    #[test]
    fn disabled_entities_contribute_nothing() {
        let site = Site::new("on", vec!["on.com".into()]);
        let mut off_site = Site::new("off", vec!["off.com".into()]);
        off_site.enabled = false;

        let mut off_route = Route::new(site.id, HandlerKind::StaticResponse, "/x", json!({}));
        off_route.enabled = false;
        let mut off_rule = RedirectRule::new(site.id, "/y", "/z", 301, 0);
        off_rule.enabled = false;

        let snapshot = Snapshot {
            sites: vec![site.clone(), off_site.clone()],
            routes: BTreeMap::from([
                (site.id, vec![off_route]),
                (
                    off_site.id,
                    vec![Route::new(off_site.id, HandlerKind::StaticResponse, "/", json!({}))],
                ),
            ]),
            redirects: BTreeMap::from([(site.id, vec![off_rule])]),
            ..Snapshot::default()
        };

        let doc = synthesize(&snapshot).unwrap();
        assert_eq!(doc.apps.http.servers.len(), 1);
        assert!(doc.server("on").unwrap().routes.is_empty());
        assert!(doc.server("off").is_none());
    }

    #[test]
    fn file_server_without_path_matches_everything() {
        let site = Site::new("files", Vec::new());
        let root = Route::new(site.id, HandlerKind::FileServer, "/", json!({})).with_order(2);
        let empty = Route::new(site.id, HandlerKind::FileServer, "", json!({})).with_order(1);
        let statik = Route::new(site.id, HandlerKind::FileServer, "/static", json!({}));
        let plain = Route::new(site.id, HandlerKind::StaticResponse, "", json!({})).with_order(3);

        let mut snapshot = single_site(site.clone());
        snapshot
            .routes
            .insert(site.id, vec![root, empty, statik, plain]);

        let doc = synthesize(&snapshot).unwrap();
        let paths: Vec<Vec<String>> = doc
            .server("files")
            .unwrap()
            .routes
            .iter()
            .map(|r| r.matchers.first().map(|m| m.path.clone()).unwrap_or_default())
            .collect();

        assert_eq!(
            paths,
            vec![
                vec!["/static".to_owned()],
                vec!["/*".to_owned()],
                vec!["/*".to_owned()],
                Vec::new(),
            ]
        );
    }

    #[test]
    fn methods_and_hosts_are_matched() {
        let site = Site::new("api", vec!["api.com".into()]);
        let mut route = Route::new(site.id, HandlerKind::StaticResponse, "/v1/*", json!({"body": "ok"}));
        route.methods = vec!["GET".into(), "POST".into()];

        let mut snapshot = single_site(site.clone());
        snapshot.routes.insert(site.id, vec![route]);

        let doc = synthesize(&snapshot).unwrap();
        assert_eq!(
            serde_json::to_value(&doc.server("api").unwrap().routes[0].matchers).unwrap(),
            json!([{ "host": ["api.com"], "path": ["/v1/*"], "method": ["GET", "POST"] }])
        );
    }

    #[test]
    fn group_expansion_renders_only_enabled_upstreams() {
        let site = Site::new("proxy", Vec::new());
        let group = UpstreamGroup::new("backend", "");
        let u1 = Upstream::new("u1", "10.0.0.1:80");
        let mut u2 = Upstream::new("u2", "10.0.0.2:80");
        u2.enabled = false;

        let mut snapshot = single_site(site.clone());
        snapshot.routes.insert(
            site.id,
            vec![Route::new(
                site.id,
                HandlerKind::ReverseProxy,
                "/",
                json!({ "upstream_group": "backend" }),
            )],
        );
        snapshot.upstream_groups.insert("backend".into(), group);
        snapshot
            .group_upstreams
            .insert("backend".into(), vec![u1, u2]);

        let doc = synthesize(&snapshot).unwrap();
        let handle = serde_json::to_value(&doc.server("proxy").unwrap().routes[0].handle).unwrap();
        assert_eq!(
            handle,
            json!([{ "handler": "reverse_proxy", "upstreams": [{ "dial": "10.0.0.1:80" }] }])
        );
    }

    #[test]
    fn auto_https_off_is_explicit() {
        let mut site = Site::new("plain", Vec::new());
        site.auto_https = false;
        site.listen_port = 8080;

        let doc = synthesize(&single_site(site)).unwrap();
        assert_eq!(
            serde_json::to_value(doc.server("plain").unwrap()).unwrap(),
            json!({ "listen": [":8080"], "automatic_https": { "disable": true }, "routes": [] })
        );

        let on = synthesize(&single_site(Site::new("tls", Vec::new()))).unwrap();
        assert!(on.server("tls").unwrap().automatic_https.is_none());
    }

    #[test]
    fn settings_render_at_document_root() {
        let snapshot = Snapshot {
            settings: GlobalSettings {
                http_port: Some(8080),
                https_port: Some(0),
                grace_period: Some(10),
                log_level: Some("info".into()),
                admin_listen: Some("localhost:2019".into()),
            },
            ..Snapshot::default()
        };

        assert_eq!(
            synthesize(&snapshot).unwrap().to_value().unwrap(),
            json!({
                "admin": { "listen": "localhost:2019" },
                "logging": { "logs": { "default": { "level": "info" } } },
                "apps": { "http": { "http_port": 8080, "grace_period": "10s", "servers": {} } }
            })
        );
    }

    #[test]
    fn malformed_handler_config_aborts_synthesis() {
        let site = Site::new("ok", Vec::new());
        let bad_site = Site::new("bad", Vec::new());
        let mut bad = Route::new(bad_site.id, HandlerKind::StaticResponse, "/", json!({}));
        bad.handler_config = "{oops".into();
        bad.name = "broken".into();

        let snapshot = Snapshot {
            sites: vec![site.clone(), bad_site.clone()],
            routes: BTreeMap::from([(bad_site.id, vec![bad.clone()])]),
            ..Snapshot::default()
        };

        let err = synthesize(&snapshot).unwrap_err();
        let SynthesisError::HandlerConfig { site, route, .. } = err;
        assert_eq!(site, "bad");
        assert_eq!(route, format!("broken ({})", bad.id));
    }

    #[test]
    fn tls_automation_skip_still_succeeds() {
        let site = Site::new("wild", vec!["*.example.com".into()]);
        let mut tls = TlsConfig::new(site.id);
        tls.wildcard_cert = true;

        let mut snapshot = single_site(site.clone());
        snapshot.tls_configs.insert(site.id, tls);

        let doc = synthesize(&snapshot).unwrap();
        assert!(doc.apps.tls.is_none());
        assert!(doc.server("wild").is_some());
    }

    #[test]
    fn synthesis_is_deterministic() {
        let a = Site::new("a.example.com", vec!["a.example.com".into()]);
        let b = Site::new("b.example.com", vec!["b.example.com".into()]);
        let provider = DnsProvider::new("cf", "cloudflare", r#"{"zeta": 1, "alpha": 2}"#);

        let snapshot = Snapshot {
            sites: vec![b.clone(), a.clone()],
            routes: BTreeMap::from([(
                a.id,
                vec![
                    Route::new(a.id, HandlerKind::ReverseProxy, "/api/*", json!({
                        "upstreams": ["x:1"],
                        "transport": { "z": 1, "a": 2 }
                    })),
                    Route::new(a.id, HandlerKind::FileServer, "", json!({ "root": "/srv" })),
                ],
            )]),
            certificates: vec![CustomCertificate::new("c", "CERT", "KEY")],
            tls_configs: BTreeMap::from([(b.id, TlsConfig::wildcard(b.id, provider.id))]),
            dns_providers: BTreeMap::from([(provider.id, provider)]),
            ..Snapshot::default()
        };

        let first = serde_json::to_vec(&synthesize(&snapshot).unwrap()).unwrap();
        let second = serde_json::to_vec(&synthesize(&snapshot).unwrap()).unwrap();
        assert_eq!(first, second);
    }
}
