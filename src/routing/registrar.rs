//! Route registration (deploy-time).
//!
//! # Responsibilities
//! - Translate a declaration into a route entry plus metadata
//! - Write metadata (and site file markers) before publishing the entry
//! - Read-modify-write the router's table
//!
//! # Design Decisions
//! - One async mutex serializes all updates issued through a registrar;
//!   separate registrars sharing a store are still last-write-wins
//! - Inline-mode routers are seeded once and reject dynamic registration

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use url::Url;

use crate::config::{AppConfig, RouterConfig};
use crate::observability::metrics;
use crate::routing::declaration::{Destination, RouteDeclaration, SiteManifest};
use crate::routing::entry::RouteEntry;
use crate::routing::error::{RouteError, RouteResult};
use crate::routing::metadata::{
    BucketMetadata, OriginOverride, OriginProtocol, RouteMetadata, S3Metadata, SiteMetadata,
    UrlMetadata,
};
use crate::routing::namespace;
use crate::routing::pattern::parse_pattern;
use crate::routing::table::RouteTable;
use crate::store::chunked::{delete_chunked, read_chunked, write_chunked};
use crate::store::{asset_index_key, asset_key, metadata_key, KvStore};

/// Value stored under each site file marker key.
const ASSET_MARKER: &str = "1";

/// Control-plane entry point for one router.
#[derive(Debug)]
pub struct Registrar {
    store: Arc<dyn KvStore>,
    app: AppConfig,
    router: RouterConfig,
    namespace: String,
    update_lock: Mutex<()>,
}

impl Registrar {
    pub fn new(store: Arc<dyn KvStore>, app: AppConfig, router: RouterConfig) -> Self {
        let namespace = namespace::derive(&app.name, &app.stage, &router.name);
        Self {
            store,
            app,
            router,
            namespace,
            update_lock: Mutex::new(()),
        }
    }

    /// Namespace of the router's own keys (its route table).
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn is_inline(&self) -> bool {
        self.router.is_inline()
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    /// Namespace a component's route is stored under.
    pub fn component_namespace(&self, component: &str) -> String {
        namespace::derive(&self.app.name, &self.app.stage, component)
    }

    /// Current route table.
    pub async fn routes(&self) -> RouteResult<RouteTable> {
        Ok(RouteTable::load(self.store.as_ref(), &self.namespace).await?)
    }

    /// Register (or re-register) the route owned by `component`.
    pub async fn register(&self, component: &str, declaration: &RouteDeclaration) -> RouteResult<RouteEntry> {
        if self.router.is_inline() {
            return Err(RouteError::InlineRoutesMode {
                router: self.router.name.clone(),
            });
        }
        self.write_route(component, declaration).await
    }

    /// Remove the route owned by `component`. Returns false if none existed.
    pub async fn deregister(&self, component: &str) -> RouteResult<bool> {
        if self.router.is_inline() {
            return Err(RouteError::InlineRoutesMode {
                router: self.router.name.clone(),
            });
        }

        let ns = self.component_namespace(component);
        let _guard = self.update_lock.lock().await;
        let store = self.store.as_ref();

        let mut table = RouteTable::load(store, &self.namespace).await?;
        let removed = table.remove(&ns);
        if removed.is_some() {
            table.save(store, &self.namespace, self.router.chunk_size).await?;
        }

        delete_chunked(store, &metadata_key(&ns)).await?;
        let stale = self.registered_assets(&ns).await?;
        for path in &stale {
            store.delete(&asset_key(&ns, path)).await?;
        }
        delete_chunked(store, &asset_index_key(&ns)).await?;

        metrics::record_registration("deregister");
        tracing::info!(component = %component, namespace = %ns, removed = removed.is_some(), "Route deregistered");
        Ok(removed.is_some())
    }

    /// Write the fixed routes of an inline-mode router. Each pattern is
    /// owned by a component named after the pattern itself.
    pub async fn seed_inline(&self, routes: &BTreeMap<String, String>) -> RouteResult<Vec<RouteEntry>> {
        let mut entries = Vec::with_capacity(routes.len());
        for (pattern, url) in routes {
            let declaration = RouteDeclaration::new(pattern.clone(), Destination::Url { url: url.clone() });
            entries.push(self.write_route(&format!("inline:{pattern}"), &declaration).await?);
        }
        tracing::info!(router = %self.router.name, routes = entries.len(), "Seeded inline routes");
        Ok(entries)
    }

    async fn write_route(&self, component: &str, declaration: &RouteDeclaration) -> RouteResult<RouteEntry> {
        let pattern = parse_pattern(&declaration.pattern)?;
        if let Some(rewrite) = &declaration.rewrite {
            regex::Regex::new(&rewrite.regex).map_err(|source| RouteError::InvalidRewrite {
                regex: rewrite.regex.clone(),
                source,
            })?;
        }
        let metadata = build_metadata(declaration)?;

        let ns = self.component_namespace(component);
        let entry = RouteEntry::new(metadata.kind(), ns.clone(), pattern.host, pattern.path);

        let _guard = self.update_lock.lock().await;
        let store = self.store.as_ref();
        let chunk_size = self.router.chunk_size;

        write_chunked(store, &metadata_key(&ns), &metadata.encode()?, chunk_size).await?;
        match &declaration.destination {
            Destination::Site(manifest) => self.sync_assets(&ns, manifest).await?,
            _ => self.clear_assets(&ns).await?,
        }

        let mut table = RouteTable::load(store, &self.namespace).await?;
        table.upsert(entry.clone());
        table.save(store, &self.namespace, chunk_size).await?;

        metrics::record_registration("register");
        tracing::info!(
            component = %component,
            namespace = %ns,
            kind = %entry.kind,
            host = %entry.host,
            path = %entry.path,
            "Route registered"
        );
        Ok(entry)
    }

    async fn registered_assets(&self, ns: &str) -> RouteResult<Vec<String>> {
        match read_chunked(self.store.as_ref(), &asset_index_key(ns)).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    async fn sync_assets(&self, ns: &str, manifest: &SiteManifest) -> RouteResult<()> {
        let store = self.store.as_ref();
        let current: HashSet<&str> = manifest.files.iter().map(String::as_str).collect();

        for path in &manifest.files {
            store.put(&asset_key(ns, path), ASSET_MARKER.to_string()).await?;
        }
        for path in self.registered_assets(ns).await? {
            if !current.contains(path.as_str()) {
                store.delete(&asset_key(ns, &path)).await?;
            }
        }

        let index = serde_json::to_string(&manifest.files)?;
        write_chunked(store, &asset_index_key(ns), &index, self.router.chunk_size).await?;
        tracing::debug!(namespace = %ns, files = manifest.files.len(), "Site files synced");
        Ok(())
    }

    async fn clear_assets(&self, ns: &str) -> RouteResult<()> {
        let stale = self.registered_assets(ns).await?;
        if stale.is_empty() {
            return Ok(());
        }
        let store = self.store.as_ref();
        for path in &stale {
            store.delete(&asset_key(ns, path)).await?;
        }
        delete_chunked(store, &asset_index_key(ns)).await?;
        Ok(())
    }
}

fn invalid_destination(message: impl Into<String>) -> RouteError {
    RouteError::InvalidDestination(message.into())
}

/// Translate a declaration's destination into stored metadata.
fn build_metadata(declaration: &RouteDeclaration) -> RouteResult<RouteMetadata> {
    let rewrite = declaration.rewrite.clone();
    let origin = declaration.origin.clone();

    match &declaration.destination {
        Destination::Url { url } => {
            let (host, url_origin) = parse_url_destination(url)?;
            Ok(RouteMetadata::Url(UrlMetadata {
                host,
                origin: merge_origin(url_origin, origin),
                rewrite,
            }))
        }
        Destination::Bucket { domain, dir, routes } => Ok(RouteMetadata::Bucket(BucketMetadata {
            s3: build_s3(domain, dir.as_deref(), routes)?,
            origin,
            rewrite,
        })),
        Destination::Site(manifest) => {
            for path in &manifest.files {
                if !path.starts_with('/') {
                    return Err(invalid_destination(format!("site file '{path}' must start with '/'")));
                }
            }
            if let Some(image) = &manifest.image {
                if image.host.trim().is_empty() || !image.route.starts_with('/') {
                    return Err(invalid_destination("site image route needs a host and an absolute route"));
                }
            }
            if manifest.servers.iter().any(|(host, _, _)| host.trim().is_empty()) {
                return Err(invalid_destination("site server host must not be empty"));
            }
            let s3 = &manifest.s3;
            Ok(RouteMetadata::Site(SiteMetadata {
                base: manifest.base.clone().filter(|b| !b.is_empty() && b != "/"),
                custom_404: manifest.custom_404.clone(),
                s3: build_s3(&s3.domain, Some(&s3.dir), &s3.routes)?,
                image: manifest.image.clone(),
                servers: (!manifest.servers.is_empty()).then(|| manifest.servers.clone()),
                origin,
                rewrite,
            }))
        }
    }
}

fn build_s3(domain: &str, dir: Option<&str>, routes: &[String]) -> RouteResult<S3Metadata> {
    let domain = domain.trim();
    if domain.is_empty() || domain.contains('/') {
        return Err(invalid_destination(format!("'{domain}' is not a storage domain")));
    }
    let dir = dir.unwrap_or_default().trim_end_matches('/');
    let dir = if dir.is_empty() || dir.starts_with('/') {
        dir.to_string()
    } else {
        format!("/{dir}")
    };
    Ok(S3Metadata {
        domain: domain.to_string(),
        dir,
        routes: routes.to_vec(),
    })
}

/// Split a URL destination into its host and the origin settings it implies.
fn parse_url_destination(raw: &str) -> RouteResult<(String, OriginOverride)> {
    let url = Url::parse(raw).map_err(|e| invalid_destination(format!("'{raw}' is not a URL: {e}")))?;
    let protocol = match url.scheme() {
        "https" => OriginProtocol::Https,
        "http" => OriginProtocol::Http,
        other => return Err(invalid_destination(format!("unsupported scheme '{other}' in '{raw}'"))),
    };
    let host = url
        .host_str()
        .ok_or_else(|| invalid_destination(format!("'{raw}' has no host")))?;
    if url.path() != "/" && !url.path().is_empty() {
        return Err(invalid_destination(format!("'{raw}' must not carry a path")));
    }

    let implied = OriginOverride {
        protocol: (protocol == OriginProtocol::Http).then_some(protocol),
        port: url.port(),
        ..OriginOverride::default()
    };
    Ok((host.to_string(), implied))
}

/// Explicit overrides win over what the URL implies.
fn merge_origin(implied: OriginOverride, explicit: Option<OriginOverride>) -> Option<OriginOverride> {
    let explicit = explicit.unwrap_or_default();
    let merged = OriginOverride {
        protocol: explicit.protocol.or(implied.protocol),
        port: explicit.port.or(implied.port),
        ..explicit
    };
    (merged != OriginOverride::default()).then_some(merged)
}
