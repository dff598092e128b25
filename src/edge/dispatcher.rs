//! Request-time dispatcher.
//!
//! # Responsibilities
//! - Reject direct access to the edge's own domain
//! - Load the route table and select the most specific entry
//! - Load the winner's metadata and apply its rewrite
//! - Point the request at the destination of the entry's kind
//!
//! # Design Decisions
//! - Any store error is logged, counted and treated as "no route"
//! - The table is re-read on every request; there is no cache to go stale

use arc_swap::ArcSwap;
use axum::http::StatusCode;
use regex::Regex;
use std::sync::Arc;

use crate::edge::origin::{BucketOrigin, Origin, UrlOrigin};
use crate::edge::request::EdgeRequest;
use crate::edge::site::{self, SiteTarget};
use crate::edge::EdgeSettings;
use crate::observability::metrics;
use crate::routing::entry::RouteEntry;
use crate::routing::matcher::select_route;
use crate::routing::metadata::{Rewrite, RouteMetadata};
use crate::routing::table::RouteTable;
use crate::store::chunked::read_chunked;
use crate::store::{metadata_key, KvStore};

/// Result of dispatching one request.
#[derive(Debug)]
pub enum EdgeOutcome {
    /// Forward the (possibly rewritten) request. A request without an
    /// origin goes to the default origin.
    Forward {
        request: EdgeRequest,
        route: Option<RouteEntry>,
    },
    /// Answer directly without forwarding.
    Reject { status: StatusCode, message: &'static str },
}

/// Matches requests against one router's table and rewrites their destination.
#[derive(Debug)]
pub struct Dispatcher {
    store: Arc<dyn KvStore>,
    router_namespace: String,
    settings: ArcSwap<EdgeSettings>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn KvStore>, router_namespace: impl Into<String>, settings: EdgeSettings) -> Self {
        Self {
            store,
            router_namespace: router_namespace.into(),
            settings: ArcSwap::from_pointee(settings),
        }
    }

    pub fn router_namespace(&self) -> &str {
        &self.router_namespace
    }

    pub fn settings(&self) -> Arc<EdgeSettings> {
        self.settings.load_full()
    }

    /// Swap settings; in-flight requests keep the settings they started with.
    pub fn update_settings(&self, settings: EdgeSettings) {
        if *self.settings.load_full() != settings {
            tracing::info!("Edge settings updated");
        }
        self.settings.store(Arc::new(settings));
    }

    /// Dispatch one request.
    pub async fn dispatch(&self, mut request: EdgeRequest) -> EdgeOutcome {
        let settings = self.settings.load_full();

        if let Some(suffix) = settings.edge.blocked_host_suffix.as_deref() {
            if !suffix.is_empty() && request.host.ends_with(&suffix.to_ascii_lowercase()) {
                tracing::debug!(host = %request.host, "Rejecting request to blocked host");
                return EdgeOutcome::Reject {
                    status: StatusCode::FORBIDDEN,
                    message: "Direct access to this host is not allowed",
                };
            }
        }

        let Some((entry, metadata)) = self.resolve(&request).await else {
            metrics::record_route_miss();
            tracing::debug!(host = %request.host, uri = %request.uri, "No route matched");
            return EdgeOutcome::Forward { request, route: None };
        };

        if let Some(rewrite) = metadata.rewrite() {
            request.uri = apply_rewrite(&request.uri, rewrite);
        }

        match &metadata {
            RouteMetadata::Url(url) => {
                let forwarded_host = request.host_header().to_string();
                request.set_header("x-forwarded-host", &forwarded_host);
                request.origin = Some(Origin::Url(UrlOrigin::new(
                    &url.host,
                    url.origin.as_ref(),
                    &settings.origin_defaults,
                )));
            }
            RouteMetadata::Bucket(bucket) => {
                request.strip_cookies();
                let key = format!("{}{}", bucket.s3.dir, request.uri);
                // Listed prefixes are served as is; elsewhere directories resolve to their index
                let direct = bucket.s3.routes.is_empty()
                    || bucket.s3.routes.iter().any(|route| request.uri.starts_with(route.as_str()));
                request.uri = if direct { key } else { site::with_index_suffix(key) };
                request.origin = Some(Origin::Bucket(BucketOrigin::new(&bucket.s3.domain)));
            }
            RouteMetadata::Site(site_meta) => {
                let target =
                    site::route_site(self.store.as_ref(), &entry.namespace, &mut request, site_meta, &settings)
                        .await;
                if target == SiteTarget::PassThrough {
                    tracing::debug!(namespace = %entry.namespace, uri = %request.uri, "Site has no target for request");
                }
            }
        }

        tracing::debug!(
            namespace = %entry.namespace,
            kind = %entry.kind,
            uri = %request.uri,
            origin = request.origin.as_ref().map(Origin::domain).unwrap_or("-"),
            "Request dispatched"
        );
        EdgeOutcome::Forward {
            request,
            route: Some(entry),
        }
    }

    /// Winning entry and its metadata, or `None` on no match or store trouble.
    async fn resolve(&self, request: &EdgeRequest) -> Option<(RouteEntry, RouteMetadata)> {
        let store = self.store.as_ref();

        let table = match RouteTable::load(store, &self.router_namespace).await {
            Ok(table) => table,
            Err(e) => {
                tracing::warn!(error = %e, "Route table unavailable, passing request through");
                metrics::record_store_error("routes");
                return None;
            }
        };

        let entry = select_route(table.entries(), &request.host, &request.uri)?.clone();

        let raw = match read_chunked(store, &metadata_key(&entry.namespace)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::warn!(namespace = %entry.namespace, "Route has no metadata, passing request through");
                return None;
            }
            Err(e) => {
                tracing::warn!(namespace = %entry.namespace, error = %e, "Route metadata unavailable, passing request through");
                metrics::record_store_error("metadata");
                return None;
            }
        };

        match RouteMetadata::decode(entry.kind, &raw) {
            Ok(metadata) => Some((entry, metadata)),
            Err(e) => {
                tracing::warn!(namespace = %entry.namespace, error = %e, "Malformed route metadata, passing request through");
                None
            }
        }
    }
}

/// Replace the first match of the rewrite regex in `uri`.
///
/// `$1`..`$99` and `$&` refer to capture groups and the whole match; `$$`
/// is a literal dollar. An invalid regex leaves the URI unchanged.
pub fn apply_rewrite(uri: &str, rewrite: &Rewrite) -> String {
    match Regex::new(&rewrite.regex) {
        Ok(re) => re.replace(uri, expand_template(&rewrite.to).as_str()).into_owned(),
        Err(e) => {
            tracing::warn!(regex = %rewrite.regex, error = %e, "Ignoring invalid rewrite regex");
            uri.to_string()
        }
    }
}

/// Translate a `$1` / `$&` replacement into regex crate syntax.
fn expand_template(to: &str) -> String {
    let mut out = String::with_capacity(to.len() + 8);
    let mut chars = to.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('&') => {
                chars.next();
                out.push_str("${0}");
            }
            Some(d) if d.is_ascii_digit() => {
                let mut group = String::new();
                while let Some(d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                    group.push(*d);
                    chars.next();
                    if group.len() == 2 {
                        break;
                    }
                }
                out.push_str(&format!("${{{group}}}"));
            }
            Some('$') => {
                chars.next();
                out.push_str("$$");
            }
            _ => out.push_str("$$"),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, EdgeConfig, RouterConfig};
    use crate::routing::declaration::{Destination, RouteDeclaration};
    use crate::routing::registrar::Registrar;
    use crate::store::{MemoryStore, StoreError, StoreResult};
    use async_trait::async_trait;

    #[derive(Debug)]
    struct UnavailableStore;

    #[async_trait]
    impl KvStore for UnavailableStore {
        async fn get(&self, _key: &str) -> StoreResult<Option<String>> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn put(&self, _key: &str, _value: String) -> StoreResult<()> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn delete(&self, _key: &str) -> StoreResult<()> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        fn max_value_bytes(&self) -> usize {
            1024
        }
    }

    fn setup() -> (Registrar, Dispatcher) {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new(512, 1024));
        let registrar = Registrar::new(store.clone(), AppConfig::default(), RouterConfig::default());
        let dispatcher = Dispatcher::new(store, registrar.namespace(), EdgeSettings::default());
        (registrar, dispatcher)
    }

    fn forwarded(outcome: EdgeOutcome) -> (EdgeRequest, Option<RouteEntry>) {
        match outcome {
            EdgeOutcome::Forward { request, route } => (request, route),
            EdgeOutcome::Reject { status, .. } => panic!("unexpected rejection: {status}"),
        }
    }

    #[tokio::test]
    async fn test_url_route_end_to_end() {
        let (registrar, dispatcher) = setup();
        registrar
            .register(
                "Api",
                &RouteDeclaration::new("dev.example.com/api", Destination::Url { url: "https://backend.internal".into() }),
            )
            .await
            .unwrap();

        let (request, route) = forwarded(dispatcher.dispatch(EdgeRequest::get("dev.example.com", "/api/orders")).await);
        assert_eq!(route.unwrap().namespace, registrar.component_namespace("Api"));
        assert_eq!(request.uri, "/api/orders");
        assert_eq!(request.header("x-forwarded-host"), Some("dev.example.com"));
        assert_eq!(
            request.origin.unwrap().target_url(&request.uri, None),
            "https://backend.internal/api/orders"
        );
    }

    #[tokio::test]
    async fn test_no_match_passes_through() {
        let (registrar, dispatcher) = setup();
        registrar
            .register("Api", &RouteDeclaration::new("dev.example.com/api", Destination::Url { url: "https://b.internal".into() }))
            .await
            .unwrap();

        let (request, route) = forwarded(dispatcher.dispatch(EdgeRequest::get("dev.example.com", "/apiextra")).await);
        assert!(route.is_none());
        assert!(request.origin.is_none());
        assert_eq!(request.uri, "/apiextra");
        assert!(request.header("x-forwarded-host").is_none());
    }

    #[tokio::test]
    async fn test_store_failure_passes_through() {
        let dispatcher = Dispatcher::new(Arc::new(UnavailableStore), "router", EdgeSettings::default());
        let (request, route) = forwarded(dispatcher.dispatch(EdgeRequest::get("dev.example.com", "/api")).await);
        assert!(route.is_none());
        assert!(request.origin.is_none());
        assert_eq!(request.uri, "/api");
    }

    #[tokio::test]
    async fn test_missing_metadata_passes_through() {
        let (registrar, dispatcher) = setup();
        let entry = registrar
            .register("Api", &RouteDeclaration::new("/api", Destination::Url { url: "https://b.internal".into() }))
            .await
            .unwrap();
        registrar.store().delete(&metadata_key(&entry.namespace)).await.unwrap();

        let (request, route) = forwarded(dispatcher.dispatch(EdgeRequest::get("h", "/api")).await);
        assert!(route.is_none());
        assert!(request.origin.is_none());
    }

    #[tokio::test]
    async fn test_bucket_route_strips_cookies() {
        let (registrar, dispatcher) = setup();
        registrar
            .register(
                "Media",
                &RouteDeclaration::new(
                    "/media",
                    Destination::Bucket {
                        domain: "media.s3.amazonaws.com".into(),
                        dir: Some("/public".into()),
                        routes: Vec::new(),
                    },
                ),
            )
            .await
            .unwrap();

        let mut request = EdgeRequest::get("example.com", "/media/cat.png");
        request.set_header("cookie", "session=secret");
        let (request, _) = forwarded(dispatcher.dispatch(request).await);

        assert!(request.cookie("session").is_none());
        assert_eq!(request.uri, "/public/media/cat.png");
        assert!(matches!(request.origin, Some(Origin::Bucket(ref b)) if b.domain == "media.s3.amazonaws.com"));
    }

    #[tokio::test]
    async fn test_bucket_routes_skip_index_suffix() {
        let (registrar, dispatcher) = setup();
        registrar
            .register(
                "Docs",
                &RouteDeclaration::new(
                    "/",
                    Destination::Bucket {
                        domain: "docs.s3.amazonaws.com".into(),
                        dir: None,
                        routes: vec!["/raw".into()],
                    },
                ),
            )
            .await
            .unwrap();

        let (request, _) = forwarded(dispatcher.dispatch(EdgeRequest::get("h", "/guide")).await);
        assert_eq!(request.uri, "/guide/index.html");
        let (request, _) = forwarded(dispatcher.dispatch(EdgeRequest::get("h", "/guide/")).await);
        assert_eq!(request.uri, "/guide/index.html");
        let (request, _) = forwarded(dispatcher.dispatch(EdgeRequest::get("h", "/raw/data")).await);
        assert_eq!(request.uri, "/raw/data");
        let (request, _) = forwarded(dispatcher.dispatch(EdgeRequest::get("h", "/logo.png")).await);
        assert_eq!(request.uri, "/logo.png");
    }

    #[tokio::test]
    async fn test_rewrite_applied_before_dispatch() {
        let (registrar, dispatcher) = setup();
        registrar
            .register(
                "Api",
                &RouteDeclaration::new("/api", Destination::Url { url: "https://b.internal".into() })
                    .with_rewrite("^/api/(.*)$", "/v2/$1"),
            )
            .await
            .unwrap();

        let (request, _) = forwarded(dispatcher.dispatch(EdgeRequest::get("h", "/api/users")).await);
        assert_eq!(request.uri, "/v2/users");

        // No regex match leaves the URI alone
        let (request, _) = forwarded(dispatcher.dispatch(EdgeRequest::get("h", "/api")).await);
        assert_eq!(request.uri, "/api");
    }

    #[tokio::test]
    async fn test_blocked_host_rejected() {
        let (_, dispatcher) = setup();
        dispatcher.update_settings(EdgeSettings {
            edge: EdgeConfig {
                blocked_host_suffix: Some(".cloudfront.net".into()),
                ..EdgeConfig::default()
            },
            ..EdgeSettings::default()
        });

        let outcome = dispatcher.dispatch(EdgeRequest::get("d111.CloudFront.net", "/")).await;
        assert!(matches!(outcome, EdgeOutcome::Reject { status, .. } if status == StatusCode::FORBIDDEN));

        let outcome = dispatcher.dispatch(EdgeRequest::get("example.com", "/")).await;
        assert!(matches!(outcome, EdgeOutcome::Forward { .. }));
    }

    #[test]
    fn test_apply_rewrite() {
        let rewrite = |regex: &str, to: &str| Rewrite {
            regex: regex.into(),
            to: to.into(),
        };
        assert_eq!(apply_rewrite("/api/users", &rewrite("^/api", "")), "/users");
        assert_eq!(apply_rewrite("/a/b/a", &rewrite("a", "x")), "/x/b/a");
        assert_eq!(apply_rewrite("/docs/intro", &rewrite("^/docs/(.+)$", "/$1.html")), "/intro.html");
        assert_eq!(apply_rewrite("/old", &rewrite("/old", "/new$&")), "/new/old");
        assert_eq!(apply_rewrite("/price", &rewrite("price", "$$5")), "/$5");
        assert_eq!(apply_rewrite("/unchanged", &rewrite("^/nomatch", "/x")), "/unchanged");
        assert_eq!(apply_rewrite("/unchanged", &rewrite("(", "/x")), "/unchanged");
    }
}
