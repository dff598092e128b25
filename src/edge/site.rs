//! Site dispatch: static files, storage sub-routes, custom 404, image
//! optimizer and server instances, tried in that order.

use futures_util::future::join_all;

use crate::edge::origin::{BucketOrigin, Origin, UrlOrigin};
use crate::edge::request::EdgeRequest;
use crate::edge::{cache_key, geo, EdgeSettings};
use crate::observability::metrics;
use crate::routing::metadata::SiteMetadata;
use crate::store::{asset_key, KvStore};

/// Which site step produced the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteTarget {
    File,
    StorageRoute,
    NotFoundPage,
    ImageOptimizer,
    Server,
    PassThrough,
}

/// Dispatch `request` to the part of the site that serves it.
pub async fn route_site(
    store: &dyn KvStore,
    namespace: &str,
    request: &mut EdgeRequest,
    site: &SiteMetadata,
    settings: &EdgeSettings,
) -> SiteTarget {
    let base = site.base.as_deref().unwrap_or_default();
    let baseless = strip_base(&request.uri, base);
    let s3 = &site.s3;

    // Keys are probed decoded but forwarded as received.
    if let Some(postfix) = find_file(store, namespace, &percent_decode(&baseless)).await {
        request.uri = format!("{}{}{}", s3.dir, baseless, postfix);
        set_bucket_origin(request, &s3.domain);
        return SiteTarget::File;
    }

    if s3.routes.iter().any(|route| baseless.starts_with(route.as_str())) {
        request.uri = with_index_suffix(format!("{}{}", s3.dir, baseless));
        set_bucket_origin(request, &s3.domain);
        return SiteTarget::StorageRoute;
    }

    if let Some(custom_404) = &site.custom_404 {
        request.uri = format!("{}{}", s3.dir, custom_404);
        set_bucket_origin(request, &s3.domain);
        return SiteTarget::NotFoundPage;
    }

    if let Some(image) = &site.image {
        if baseless.starts_with(image.route.as_str()) {
            request.origin = Some(Origin::Url(UrlOrigin::new(&image.host, None, &settings.origin_defaults)));
            return SiteTarget::ImageOptimizer;
        }
    }

    if let Some(servers) = site.servers.as_deref().filter(|s| !s.is_empty()) {
        let forwarded_host = request.host_header().to_string();
        request.set_header("x-forwarded-host", &forwarded_host);
        geo::apply_geo_headers(request, &settings.edge.geo_header_prefix);
        cache_key::apply(request, &settings.edge.cache_key_header);

        let headers = &request.headers;
        let server = geo::nearest_server(servers, || geo::viewer_location(headers)).map(|s| s.0.clone());
        if let Some(server) = server {
            tracing::debug!(server = %server, "Selected site server");
            request.origin = Some(Origin::Url(UrlOrigin::new(
                server,
                site.origin.as_ref(),
                &settings.origin_defaults,
            )));
            return SiteTarget::Server;
        }
    }

    SiteTarget::PassThrough
}

fn set_bucket_origin(request: &mut EdgeRequest, domain: &str) {
    request.strip_cookies();
    request.origin = Some(Origin::Bucket(BucketOrigin::new(domain)));
}

fn strip_base(uri: &str, base: &str) -> String {
    if base.is_empty() {
        return uri.to_string();
    }
    match uri.strip_prefix(base) {
        Some("") => "/".to_string(),
        Some(rest) if rest.starts_with('/') => rest.to_string(),
        _ => uri.to_string(),
    }
}

/// Probe the site's file markers for `uri` and return the winning postfix.
/// All candidates are read concurrently; the first in probe order that
/// exists wins.
async fn find_file(store: &dyn KvStore, namespace: &str, uri: &str) -> Option<&'static str> {
    let postfixes: &[&'static str] = if uri.ends_with('/') {
        &["index.html"]
    } else {
        &["", ".html", "/index.html"]
    };

    let probes = postfixes.iter().map(|postfix| {
        let key = asset_key(namespace, &format!("{uri}{postfix}"));
        async move { store.get(&key).await }
    });
    let results = join_all(probes).await;

    postfixes
        .iter()
        .zip(results)
        .find_map(|(postfix, result)| match result {
            Ok(Some(_)) => Some(*postfix),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(uri = %uri, postfix = %postfix, error = %e, "Site file probe failed");
                metrics::record_store_error("site_file");
                None
            }
        })
}

/// Point directory-like URIs at their index document.
pub(crate) fn with_index_suffix(uri: String) -> String {
    if uri.ends_with('/') {
        return format!("{uri}index.html");
    }
    let last = uri.rsplit('/').next().unwrap_or_default();
    if last.contains('.') {
        uri
    } else {
        format!("{uri}/index.html")
    }
}

/// Decode `%XX` escapes. Input that does not decode to UTF-8 is returned as is.
fn percent_decode(input: &str) -> String {
    percent_encoding::percent_decode_str(input)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| input.to_string())
}
